//! # doclens core
//!
//! Pure, synchronous logic for preparing arbitrary-length document text for
//! a fixed-context generative model, plus the two ports the application
//! plugs its backends into.
//!
//! This crate contains no tokio, sqlx, filesystem I/O, or HTTP. Every
//! chunking and combination function is total: it returns a value for any
//! input, including empty or degenerate text.
//!
//! ## Flow
//!
//! ```text
//! text ──▶ chunk::chunk_content ──▶ [ContentChunk; N]
//!                                      │  prompt::build_prompt
//!                                      ▼
//!                          generation::Generator (port)
//!                                      │  N summaries
//!                                      ▼
//!                        combine::combine_summaries ──▶ store::AnalysisStore (port)
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`token`] | Character-ratio token estimation and budget truncation |
//! | [`sentence`] | Punctuation-based sentence splitting |
//! | [`chunk`] | Sentence-overlap and paragraph chunkers |
//! | [`combine`] | Folding per-chunk results into one |
//! | [`models`] | Analysis payloads and the cache record |
//! | [`prompt`] | Per-chunk prompt rendering under a context budget |
//! | [`generation`] | Generation port trait and typed failures |
//! | [`store`] | Persistence port trait and in-memory backend |

pub mod chunk;
pub mod combine;
pub mod generation;
pub mod models;
pub mod prompt;
pub mod sentence;
pub mod store;
pub mod token;
