//! Budget-bounded content chunking.
//!
//! Splits document text into [`ContentChunk`]s that a fixed-context
//! generator can consume one at a time. Two strategies are offered:
//!
//! - [`chunk_content`] (default): accumulates whole sentences up to the
//!   character budget. When a chunk closes, the last
//!   [`ChunkOptions::overlap_sentences`] sentences are carried into the next
//!   chunk so it keeps some trailing context.
//! - [`chunk_by_paragraphs`]: accumulates whole lines/paragraphs, with no
//!   overlap.
//!
//! # Algorithm (sentence strategy)
//!
//! 1. Convert `max_tokens` to `max_chars` using the 4 chars/token ratio.
//! 2. If the whole content fits, return it as a single chunk, untouched.
//! 3. Otherwise split into sentences and append them to a buffer.
//! 4. When appending the next sentence would pass `max_chars` and the
//!    buffer is non-empty, flush the trimmed buffer as a chunk. Reseed the
//!    buffer with the overlap window if context is preserved and the
//!    flushed chunk held more than one sentence; otherwise start empty.
//! 5. Flush the remainder, then backfill `total_chunks` on every chunk.
//!
//! A single sentence longer than `max_chars` is never split: it becomes an
//! over-budget chunk of its own. Treat the budget as a soft ceiling.
//!
//! # Example
//!
//! ```rust
//! use doclens_core::chunk::{chunk_content, ChunkOptions};
//!
//! let chunks = chunk_content("Short enough.", &ChunkOptions::default());
//! assert_eq!(chunks.len(), 1);
//! assert_eq!(chunks[0].index, 0);
//! assert_eq!(chunks[0].total_chunks, 1);
//! ```

use serde::{Deserialize, Serialize};

use crate::sentence::split_sentences;
use crate::token::{char_len, estimate_token_count, max_chars_for_tokens, DEFAULT_MAX_TOKENS};

/// Sentences carried from one chunk into the next.
pub const DEFAULT_OVERLAP_SENTENCES: usize = 2;

/// One bounded slice of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentChunk {
    pub content: String,
    /// 0-based position within the batch.
    pub index: usize,
    /// Size of the batch this chunk belongs to.
    pub total_chunks: usize,
    pub estimated_tokens: usize,
}

impl ContentChunk {
    fn new(content: &str, index: usize) -> Self {
        Self {
            content: content.to_string(),
            index,
            total_chunks: 0,
            estimated_tokens: estimate_token_count(content),
        }
    }

    /// Whether this chunk is over `max_tokens` (an oversized sentence).
    pub fn exceeds(&self, max_tokens: usize) -> bool {
        self.estimated_tokens > max_tokens
    }

    /// `true` when the document needed more than one chunk.
    pub fn is_partial(&self) -> bool {
        self.total_chunks > 1
    }
}

/// Which chunker to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkStrategy {
    #[default]
    Sentences,
    Paragraphs,
}

impl std::str::FromStr for ChunkStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sentences" => Ok(Self::Sentences),
            "paragraphs" => Ok(Self::Paragraphs),
            other => Err(format!(
                "unknown chunk strategy '{}': must be sentences or paragraphs",
                other
            )),
        }
    }
}

/// Tuning for [`chunk_content`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkOptions {
    pub max_tokens: usize,
    /// Carry trailing sentences into the next chunk.
    pub preserve_context: bool,
    pub overlap_sentences: usize,
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            preserve_context: true,
            overlap_sentences: DEFAULT_OVERLAP_SENTENCES,
        }
    }
}

impl ChunkOptions {
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_preserve_context(mut self, preserve_context: bool) -> Self {
        self.preserve_context = preserve_context;
        self
    }
}

/// Split content into overlapping, sentence-aligned chunks.
///
/// Content that fits in `max_tokens` comes back as exactly one chunk whose
/// content is the original text, untrimmed. Longer content with no
/// sentences (whitespace only) yields no chunks.
pub fn chunk_content(content: &str, options: &ChunkOptions) -> Vec<ContentChunk> {
    let max_chars = max_chars_for_tokens(options.max_tokens);

    if char_len(content) <= max_chars {
        let mut chunk = ContentChunk::new(content, 0);
        chunk.total_chunks = 1;
        return vec![chunk];
    }

    let mut chunks = Vec::new();
    let mut current_buf = String::new();
    let mut current_chars = 0usize;
    let mut current_sentences: Vec<String> = Vec::new();

    for sentence in split_sentences(content) {
        let sentence_chars = char_len(&sentence);
        let would_be = current_chars + sentence_chars + 1;

        if would_be > max_chars && !current_buf.is_empty() {
            flush(&mut chunks, &current_buf);
            current_buf.clear();
            current_chars = 0;

            if options.preserve_context
                && options.overlap_sentences > 0
                && current_sentences.len() > 1
            {
                let keep = options.overlap_sentences.min(current_sentences.len());
                current_sentences.drain(..current_sentences.len() - keep);
                for carried in &current_sentences {
                    current_buf.push_str(carried);
                    current_buf.push(' ');
                    current_chars += char_len(carried) + 1;
                }
            } else {
                current_sentences.clear();
            }
        }

        current_buf.push_str(&sentence);
        current_buf.push(' ');
        current_chars += sentence_chars + 1;
        current_sentences.push(sentence);
    }

    if !current_buf.trim().is_empty() {
        flush(&mut chunks, &current_buf);
    }

    backfill_total(chunks)
}

/// Split content on line boundaries with no overlap.
///
/// Empty and whitespace-only lines are dropped; the survivors are
/// accumulated (joined by a blank line) until the next one would pass the
/// budget, at which point it starts a fresh buffer. There is no
/// single-chunk short-circuit: whitespace-only input yields no chunks.
pub fn chunk_by_paragraphs(content: &str, max_tokens: usize) -> Vec<ContentChunk> {
    let max_chars = max_chars_for_tokens(max_tokens);

    let mut chunks = Vec::new();
    let mut current_buf = String::new();
    let mut current_chars = 0usize;

    for para in content.lines().map(str::trim).filter(|p| !p.is_empty()) {
        let para_chars = char_len(para);
        let would_be = current_chars + para_chars + 2;

        if would_be > max_chars && !current_buf.is_empty() {
            flush(&mut chunks, &current_buf);
            current_buf.clear();
            current_chars = 0;
        }

        current_buf.push_str(para);
        current_buf.push_str("\n\n");
        current_chars += para_chars + 2;
    }

    if !current_buf.trim().is_empty() {
        flush(&mut chunks, &current_buf);
    }

    backfill_total(chunks)
}

/// Dispatch to the chunker selected by `strategy`.
pub fn chunk_with_strategy(
    content: &str,
    strategy: ChunkStrategy,
    options: &ChunkOptions,
) -> Vec<ContentChunk> {
    match strategy {
        ChunkStrategy::Sentences => chunk_content(content, options),
        ChunkStrategy::Paragraphs => chunk_by_paragraphs(content, options.max_tokens),
    }
}

fn flush(chunks: &mut Vec<ContentChunk>, buf: &str) {
    let index = chunks.len();
    chunks.push(ContentChunk::new(buf.trim(), index));
}

fn backfill_total(chunks: Vec<ContentChunk>) -> Vec<ContentChunk> {
    let total = chunks.len();
    chunks
        .into_iter()
        .map(|c| ContentChunk {
            total_chunks: total,
            ..c
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered_sentences(n: usize) -> Vec<String> {
        (0..n)
            .map(|i| format!("Sentence number {} has some filler words.", i))
            .collect()
    }

    fn opts(max_tokens: usize, preserve_context: bool) -> ChunkOptions {
        ChunkOptions::default()
            .with_max_tokens(max_tokens)
            .with_preserve_context(preserve_context)
    }

    fn assert_batch_consistent(chunks: &[ContentChunk]) {
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.index, i, "index mismatch at position {}", i);
            assert_eq!(c.total_chunks, chunks.len());
        }
    }

    #[test]
    fn test_short_content_single_untrimmed_chunk() {
        let chunks = chunk_content("  Hello, world!  ", &ChunkOptions::default());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "  Hello, world!  ");
        assert_eq!(chunks[0].index, 0);
        assert_eq!(chunks[0].total_chunks, 1);
        assert_eq!(chunks[0].estimated_tokens, 4);
    }

    #[test]
    fn test_empty_content_short_circuits() {
        let chunks = chunk_content("", &ChunkOptions::default());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "");
        assert_eq!(chunks[0].estimated_tokens, 0);
    }

    #[test]
    fn test_long_whitespace_yields_no_chunks() {
        let chunks = chunk_content(&" ".repeat(200), &opts(10, true));
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_indices_and_totals_consistent() {
        let text = numbered_sentences(100).join(" ");
        let chunks = chunk_content(&text, &opts(50, true));
        assert!(chunks.len() > 1);
        assert_batch_consistent(&chunks);
    }

    #[test]
    fn test_overlap_carries_last_two_sentences() {
        let sentences = numbered_sentences(60);
        let text = sentences.join(" ");
        let chunks = chunk_content(&text, &opts(50, true));
        assert!(chunks.len() > 2);

        for pair in chunks.windows(2) {
            let prev = split_sentences(&pair[0].content);
            let next = split_sentences(&pair[1].content);
            assert!(prev.len() > 1);
            assert_eq!(next[..2], prev[prev.len() - 2..]);
        }
    }

    #[test]
    fn test_overlap_reconstructs_sentence_sequence() {
        let sentences = numbered_sentences(60);
        let text = sentences.join(" ");
        let chunks = chunk_content(&text, &opts(50, true));

        let mut rebuilt: Vec<String> = Vec::new();
        for (i, c) in chunks.iter().enumerate() {
            let s = split_sentences(&c.content);
            let skip = if i == 0 { 0 } else { 2 };
            rebuilt.extend(s.into_iter().skip(skip));
        }
        assert_eq!(rebuilt, sentences);
    }

    #[test]
    fn test_no_overlap_partitions_sentences() {
        let sentences = numbered_sentences(60);
        let text = sentences.join(" ");
        let chunks = chunk_content(&text, &opts(50, false));
        assert!(chunks.len() > 1);

        for pair in chunks.windows(2) {
            let prev = split_sentences(&pair[0].content);
            let next = split_sentences(&pair[1].content);
            assert!(next.iter().all(|s| !prev.contains(s)));
        }

        let rebuilt: Vec<String> = chunks
            .iter()
            .flat_map(|c| split_sentences(&c.content))
            .collect();
        assert_eq!(rebuilt, sentences);
    }

    #[test]
    fn test_single_sentence_chunk_does_not_seed_overlap() {
        let a = format!("{}.", "A".repeat(30));
        let b = format!("{}.", "B".repeat(30));
        let c = format!("{}.", "C".repeat(30));
        let text = format!("{} {} {}", a, b, c);
        let chunks = chunk_content(&text, &opts(10, true));

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].content, a);
        assert_eq!(chunks[1].content, b);
        assert_eq!(chunks[2].content, c);
    }

    #[test]
    fn test_oversized_sentence_gets_own_chunk() {
        let huge = format!("{}.", "word ".repeat(100).trim_end());
        let text = format!("Small start. {} Small end.", huge);
        let chunks = chunk_content(&text, &opts(20, false));

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[1].content, huge);
        assert!(chunks[1].exceeds(20));
        assert!(!chunks[0].exceeds(20));
    }

    #[test]
    fn test_configurable_overlap_width() {
        let sentences = numbered_sentences(40);
        let text = sentences.join(" ");
        let options = ChunkOptions {
            max_tokens: 50,
            preserve_context: true,
            overlap_sentences: 1,
        };
        let chunks = chunk_content(&text, &options);
        for pair in chunks.windows(2) {
            let prev = split_sentences(&pair[0].content);
            let next = split_sentences(&pair[1].content);
            assert_eq!(next[0], prev[prev.len() - 1]);
            assert_ne!(next[1], prev[prev.len() - 1]);
        }
    }

    #[test]
    fn test_long_document_default_budget() {
        let text = (0..300)
            .map(|i| format!("This is sentence {} of a rather long document body.", i))
            .collect::<Vec<_>>()
            .join(" ");
        assert!(char_len(&text) > 15_000);

        let chunks = chunk_content(&text, &ChunkOptions::default());
        assert!(chunks.len() >= 2);
        assert_batch_consistent(&chunks);
        for c in &chunks {
            assert!(c.estimated_tokens <= DEFAULT_MAX_TOKENS);
            assert!(c.is_partial());
        }
    }

    #[test]
    fn test_multibyte_budget_in_chars() {
        let text = (0..40)
            .map(|i| format!("Überprüfung {} läuft schön.", i))
            .collect::<Vec<_>>()
            .join(" ");
        let chunks = chunk_content(&text, &opts(30, true));
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(char_len(&c.content) <= 120);
        }
    }

    #[test]
    fn test_deterministic() {
        let text = numbered_sentences(50).join(" ");
        let c1 = chunk_content(&text, &opts(40, true));
        let c2 = chunk_content(&text, &opts(40, true));
        assert_eq!(c1, c2);
    }

    #[test]
    fn test_paragraphs_one_per_chunk_when_each_exceeds_half() {
        let paras = [
            "a".repeat(5000),
            "b".repeat(5000),
            "c".repeat(5000),
        ];
        let text = paras.join("\n");
        let chunks = chunk_by_paragraphs(&text, 1000);

        assert_eq!(chunks.len(), 3);
        assert_batch_consistent(&chunks);
        for (c, p) in chunks.iter().zip(paras.iter()) {
            assert_eq!(&c.content, p);
        }
    }

    #[test]
    fn test_paragraphs_accumulate_and_drop_blank_lines() {
        let text = "First para.\n\n   \nSecond para.\n\nThird para.";
        let chunks = chunk_by_paragraphs(text, 1000);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "First para.\n\nSecond para.\n\nThird para.");
    }

    #[test]
    fn test_paragraphs_no_overlap() {
        let text = (0..30)
            .map(|i| format!("Paragraph {} with a handful of words in it.", i))
            .collect::<Vec<_>>()
            .join("\n");
        let chunks = chunk_by_paragraphs(&text, 30);
        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            for line in pair[1].content.lines().filter(|l| !l.is_empty()) {
                assert!(!pair[0].content.contains(line));
            }
        }
    }

    #[test]
    fn test_paragraphs_whitespace_only() {
        assert!(chunk_by_paragraphs(" \n\n \t\n", 10).is_empty());
        assert!(chunk_by_paragraphs("", 10).is_empty());
    }

    #[test]
    fn test_strategy_dispatch_and_parse() {
        let text = "One line.\nTwo line.";
        let by_para = chunk_with_strategy(text, ChunkStrategy::Paragraphs, &ChunkOptions::default());
        assert_eq!(by_para[0].content, "One line.\n\nTwo line.");
        let by_sentence = chunk_with_strategy(text, ChunkStrategy::Sentences, &ChunkOptions::default());
        assert_eq!(by_sentence[0].content, text);

        assert_eq!("paragraphs".parse::<ChunkStrategy>(), Ok(ChunkStrategy::Paragraphs));
        assert!("words".parse::<ChunkStrategy>().is_err());
    }

    #[test]
    fn test_chunk_json_uses_camel_case_keys() {
        let chunks = chunk_content("One short chunk.", &ChunkOptions::default());
        let json = serde_json::to_value(&chunks[0]).unwrap();
        assert_eq!(json["totalChunks"], 1);
        assert_eq!(json["estimatedTokens"], 4);
        assert_eq!(json["index"], 0);
        assert!(json.get("total_chunks").is_none());
    }
}
