//! Persistence port for cached analyses.
//!
//! The [`AnalysisStore`] trait keys one [`AnalysisRecord`] per document by
//! the content hash of its text, enabling pluggable backends (SQLite in the
//! app crate, in-memory here).
//!
//! Implementations must be `Send + Sync` to work with async runtimes, and
//! must apply each `save` atomically so concurrent writers never observe a
//! half-updated record.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Analysis, AnalysisRecord};

/// Keyed cache of prior analysis results.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`get`](AnalysisStore::get) | Fetch the record for a content hash |
/// | [`list`](AnalysisStore::list) | All records, most recently updated first |
/// | [`save`](AnalysisStore::save) | Upsert one payload, bumping `updated_at` |
/// | [`delete`](AnalysisStore::delete) | Remove the whole record |
#[async_trait]
pub trait AnalysisStore: Send + Sync {
    async fn get(&self, content_hash: &str) -> Result<Option<AnalysisRecord>>;

    async fn list(&self) -> Result<Vec<AnalysisRecord>>;

    /// Create the record if absent, replace the payload of `analysis`'s
    /// kind, and return the updated record. Other payloads are untouched.
    async fn save(
        &self,
        content_hash: &str,
        source_name: &str,
        analysis: &Analysis,
    ) -> Result<AnalysisRecord>;

    /// Returns `true` if a record was removed.
    async fn delete(&self, content_hash: &str) -> Result<bool>;
}
