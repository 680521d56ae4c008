//! # doclens
//!
//! Budget-aware document analysis with a local cache.
//!
//! doclens splits long documents into chunks that fit a language model's
//! context window, sends each chunk to a generation backend for a summary,
//! a quick classification, or entity extraction, folds the per-chunk results
//! into one, and caches the result in SQLite keyed by content hash.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌────────────┐   ┌────────────┐   ┌──────────┐
//! │  extract  │──▶│   chunk    │──▶│  generate  │──▶│ combine  │
//! │ text/PDF  │   │ sentences  │   │ OpenAI /   │   │ per-kind │
//! └───────────┘   │ paragraphs │   │ Ollama     │   └────┬─────┘
//!                 └────────────┘   └────────────┘        │
//!                                                        ▼
//!                                                  ┌──────────┐
//!                                                  │  SQLite  │
//!                                                  │  cache   │
//!                                                  └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! lens init                          # create the cache database
//! lens estimate report.pdf           # tokens and chunk count
//! lens chunk report.pdf --json       # inspect the chunks
//! lens analyze report.pdf --kind summary
//! lens library ./docs                # what is in a folder, what is cached
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`chunk`] | Chunking (re-exported from `doclens-core`) |
//! | [`extract`] | Text and PDF loading |
//! | [`generation`] | OpenAI / Ollama / disabled generation backends |
//! | [`analyze`] | The analysis orchestrator |
//! | [`sqlite_store`] | SQLite analysis cache |
//! | [`library`] | Directory scanning |
//! | [`progress`] | stderr progress reporting |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod analyze;
pub mod cache_cmd;
pub mod chunk;
pub mod chunk_cmd;
pub mod config;
pub mod db;
pub mod extract;
pub mod generation;
pub mod library;
pub mod migrate;
pub mod progress;
pub mod sqlite_store;
