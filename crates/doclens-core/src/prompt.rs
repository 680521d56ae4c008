//! Per-chunk prompt rendering under a context budget.
//!
//! The generator's context window must hold the instructions, the chunk,
//! and the response. [`PromptBudget`] reserves room for the response and
//! [`build_prompt`] guarantees the rendered prompt's estimated token count
//! never exceeds what is left, truncating the chunk at a sentence boundary
//! when it must.

use crate::chunk::ContentChunk;
use crate::models::AnalysisKind;
use crate::token::{char_len, max_chars_for_tokens, truncate_to_token_budget, CHARS_PER_TOKEN};

pub const DEFAULT_CONTEXT_TOKENS: usize = 4096;
pub const DEFAULT_RESPONSE_RESERVE: usize = 512;

/// Room reserved for the section marker and separators.
const FRAMING_TOKENS: usize = 32;

const SUMMARY_INSTRUCTIONS: &str = "Summarize the document below. Respond with a single JSON object \
with exactly these fields: \"title\" (a short title), \"overview\" (one paragraph), \"keyPoints\" \
(an array of 3 to 5 short strings), \"conclusion\" (one paragraph), and \
\"estimatedReadingTimeMinutes\" (an integer from 1 to 100).";

const QUICK_INSTRUCTIONS: &str = "Classify the document below. Respond with a single JSON object \
with exactly these fields: \"mainTopic\" (a short phrase), \"documentType\" (e.g. article, report, \
manual, letter), \"complexity\" (one of \"basic\", \"intermediate\", \"advanced\"), and \
\"keyTopics\" (an array of up to 5 short strings).";

const ENTITIES_INSTRUCTIONS: &str = "Extract the named entities from the document below. Respond \
with a single JSON object with exactly these fields, each an array of strings: \"people\", \
\"organizations\", \"locations\", \"dates\", and \"keyTerms\". Use empty arrays when nothing applies.";

/// Token budget of one generation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptBudget {
    pub context_tokens: usize,
    /// Tokens kept free for the generated response.
    pub response_reserve: usize,
}

impl Default for PromptBudget {
    fn default() -> Self {
        Self {
            context_tokens: DEFAULT_CONTEXT_TOKENS,
            response_reserve: DEFAULT_RESPONSE_RESERVE,
        }
    }
}

impl PromptBudget {
    pub fn new(context_tokens: usize, response_reserve: usize) -> Self {
        Self {
            context_tokens,
            response_reserve,
        }
    }

    /// Tokens available to the whole prompt.
    pub fn prompt_tokens(&self) -> usize {
        self.context_tokens.saturating_sub(self.response_reserve)
    }

    /// Largest chunk that fits alongside any instruction set.
    pub fn chunk_tokens(&self) -> usize {
        let overhead = [AnalysisKind::Summary, AnalysisKind::Quick, AnalysisKind::Entities]
            .iter()
            .map(|k| char_len(instructions(*k)).div_ceil(CHARS_PER_TOKEN))
            .max()
            .unwrap_or(0)
            + FRAMING_TOKENS;
        self.prompt_tokens().saturating_sub(overhead)
    }
}

/// Instruction text for `kind`.
pub fn instructions(kind: AnalysisKind) -> &'static str {
    match kind {
        AnalysisKind::Summary => SUMMARY_INSTRUCTIONS,
        AnalysisKind::Quick => QUICK_INSTRUCTIONS,
        AnalysisKind::Entities => ENTITIES_INSTRUCTIONS,
    }
}

/// Render the prompt for one chunk, never exceeding `budget.prompt_tokens()`.
pub fn build_prompt(kind: AnalysisKind, chunk: &ContentChunk, budget: &PromptBudget) -> String {
    let header = instructions(kind);
    let section = if chunk.total_chunks > 1 {
        format!(
            "This is section {} of {} of a longer document.\n\n",
            chunk.index + 1,
            chunk.total_chunks
        )
    } else {
        String::new()
    };
    let lead = format!("{}\n\n{}Document:\n", header, section);

    let max_chars = max_chars_for_tokens(budget.prompt_tokens());
    let body_tokens = max_chars.saturating_sub(char_len(&lead)) / CHARS_PER_TOKEN;
    let body = truncate_to_token_budget(&chunk.content, body_tokens);

    format!("{}{}", lead, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::{chunk_content, ChunkOptions};
    use crate::token::estimate_token_count;

    fn chunk(content: &str, index: usize, total: usize) -> ContentChunk {
        let mut c = chunk_content(content, &ChunkOptions::default().with_max_tokens(1_000_000))
            .remove(0);
        c.index = index;
        c.total_chunks = total;
        c
    }

    #[test]
    fn test_single_chunk_has_no_section_marker() {
        let p = build_prompt(AnalysisKind::Summary, &chunk("Body text.", 0, 1), &PromptBudget::default());
        assert!(p.starts_with(SUMMARY_INSTRUCTIONS));
        assert!(!p.contains("section"));
        assert!(p.ends_with("Document:\nBody text."));
    }

    #[test]
    fn test_multi_chunk_marker_is_one_based() {
        let p = build_prompt(AnalysisKind::Entities, &chunk("Body.", 1, 3), &PromptBudget::default());
        assert!(p.contains("This is section 2 of 3"));
        assert!(p.starts_with(ENTITIES_INSTRUCTIONS));
    }

    #[test]
    fn test_oversized_chunk_truncated_to_budget() {
        let content = (0..2000)
            .map(|i| format!("Sentence {} is here.", i))
            .collect::<Vec<_>>()
            .join(" ");
        let budget = PromptBudget::new(1024, 256);
        let p = build_prompt(AnalysisKind::Quick, &chunk(&content, 0, 1), &budget);

        assert!(estimate_token_count(&p) <= budget.prompt_tokens());
        assert!(p.ends_with("is here."));
    }

    #[test]
    fn test_unbroken_chunk_keeps_most_of_budget() {
        let content = format!("see {}", "x".repeat(20_000));
        let budget = PromptBudget::new(1024, 256);
        let p = build_prompt(AnalysisKind::Quick, &chunk(&content, 0, 1), &budget);

        let tokens = estimate_token_count(&p);
        assert!(tokens <= budget.prompt_tokens());
        assert!(tokens >= budget.prompt_tokens() - 1);
        assert!(p.contains("Document:\nsee xxx"));
    }

    #[test]
    fn test_chunk_tokens_leaves_room_for_instructions() {
        let budget = PromptBudget::default();
        assert!(budget.chunk_tokens() < budget.prompt_tokens());
        assert_eq!(budget.prompt_tokens(), 3584);

        let content = "x ".repeat(budget.chunk_tokens() * 2);
        let c = chunk(content.trim_end(), 0, 1);
        for kind in [AnalysisKind::Summary, AnalysisKind::Quick, AnalysisKind::Entities] {
            let p = build_prompt(kind, &c, &budget);
            assert!(p.ends_with(c.content.as_str()), "chunk was truncated for {}", kind);
        }
    }

    #[test]
    fn test_tiny_budget_saturates() {
        let budget = PromptBudget::new(10, 512);
        assert_eq!(budget.prompt_tokens(), 0);
        assert_eq!(budget.chunk_tokens(), 0);
        let p = build_prompt(AnalysisKind::Summary, &chunk("Some body.", 0, 1), &budget);
        assert!(p.ends_with("Document:\n"));
    }
}
