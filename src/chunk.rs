//! Sentence- and paragraph-aware chunker, re-exported from `doclens-core`.
//!
//! # Example
//!
//! ```rust
//! use doclens::chunk::{chunk_content, ChunkOptions};
//!
//! let options = ChunkOptions::default().with_max_tokens(10);
//! let text = "First sentence here. Second sentence here. Third sentence here.";
//! let chunks = chunk_content(text, &options);
//! assert!(chunks.len() > 1);
//! assert!(chunks.iter().all(|c| c.total_chunks == chunks.len()));
//! ```

pub use doclens_core::chunk::*;
