//! `lens estimate` and `lens chunk`: inspect how a document will be split
//! before spending any generation calls on it.
//!
//! Both commands chunk exactly the way `lens analyze` does: the configured
//! ceiling is lowered to what fits in a prompt, and whitespace-only chunks
//! are dropped.

use std::path::Path;

use anyhow::{Context, Result};

use doclens_core::chunk::{ChunkStrategy, ContentChunk};
use doclens_core::token::{
    can_process_in_single_session, char_len, estimate_processing_time, estimate_token_count,
};

use crate::analyze::AnalyzerOptions;
use crate::config::Config;
use crate::extract::load_document;
use crate::progress::format_number;

/// Command-line overrides for the `[chunking]` config section.
#[derive(Debug, Clone, Default)]
pub struct ChunkOverrides {
    pub max_tokens: Option<usize>,
    pub strategy: Option<ChunkStrategy>,
    pub no_overlap: bool,
}

impl ChunkOverrides {
    fn apply(&self, config: &Config) -> AnalyzerOptions {
        let mut options = AnalyzerOptions::from_config(config);
        if let Some(max_tokens) = self.max_tokens {
            options.chunking = options.chunking.with_max_tokens(max_tokens);
        }
        if self.no_overlap {
            options.chunking = options.chunking.with_preserve_context(false);
        }
        if let Some(strategy) = self.strategy {
            options.strategy = strategy;
        }
        options
    }
}

/// Token statistics for one document.
#[derive(Debug, Clone, PartialEq)]
pub struct Estimate {
    pub characters: usize,
    pub estimated_tokens: usize,
    pub processing_seconds: f64,
    /// Chunk size in tokens after prompt budgeting.
    pub chunk_tokens: usize,
    pub fits_single_session: bool,
    pub chunks: usize,
}

pub fn estimate(text: &str, options: &AnalyzerOptions) -> Estimate {
    let chunk_tokens = options.effective_chunk_tokens();
    Estimate {
        characters: char_len(text),
        estimated_tokens: estimate_token_count(text),
        processing_seconds: estimate_processing_time(text).as_secs_f64(),
        chunk_tokens,
        fits_single_session: can_process_in_single_session(text, chunk_tokens),
        chunks: options.chunk(text).len(),
    }
}

/// CLI entry point for `lens estimate <file>`.
pub fn run_estimate(config: &Config, path: &Path, max_tokens: Option<usize>) -> Result<()> {
    let doc = load_document(path).with_context(|| format!("Failed to load {}", path.display()))?;
    let overrides = ChunkOverrides {
        max_tokens,
        ..Default::default()
    };
    let est = estimate(&doc.text, &overrides.apply(config));

    println!("document:        {}", doc.name);
    println!("content_type:    {}", doc.content_type);
    println!("characters:      {}", format_number(est.characters as u64));
    println!("tokens:          {}", format_number(est.estimated_tokens as u64));
    println!("processing_time: {:.1}s", est.processing_seconds);
    println!(
        "single_session:  {} (max {} tokens)",
        if est.fits_single_session { "yes" } else { "no" },
        format_number(est.chunk_tokens as u64)
    );
    println!("chunks:          {}", est.chunks);

    Ok(())
}

/// CLI entry point for `lens chunk <file>`.
pub fn run_chunk(config: &Config, path: &Path, overrides: &ChunkOverrides, json: bool) -> Result<()> {
    let doc = load_document(path).with_context(|| format!("Failed to load {}", path.display()))?;
    let options = overrides.apply(config);
    let chunks = options.chunk(&doc.text);

    if json {
        println!("{}", serde_json::to_string_pretty(&chunks)?);
        return Ok(());
    }

    for chunk in &chunks {
        print_chunk(chunk);
    }
    println!(
        "{} chunks ({} strategy, max {} tokens)",
        chunks.len(),
        strategy_name(options.strategy),
        format_number(options.effective_chunk_tokens() as u64)
    );

    Ok(())
}

fn print_chunk(chunk: &ContentChunk) {
    println!(
        "--- chunk {}/{} ({} tokens) ---",
        chunk.index + 1,
        chunk.total_chunks,
        format_number(chunk.estimated_tokens as u64)
    );
    println!("{}", chunk.content);
    println!();
}

fn strategy_name(strategy: ChunkStrategy) -> &'static str {
    match strategy {
        ChunkStrategy::Sentences => "sentences",
        ChunkStrategy::Paragraphs => "paragraphs",
    }
}
