//! In-memory [`AnalysisStore`] implementation for tests and embedders that need no database.
//!
//! Uses a `HashMap` behind `std::sync::RwLock` for thread safety.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;

use crate::models::{Analysis, AnalysisRecord};

use super::AnalysisStore;

/// In-memory analysis cache.
#[derive(Default)]
pub struct InMemoryStore {
    records: RwLock<HashMap<String, AnalysisRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("in-memory analysis store lock poisoned")
}

#[async_trait]
impl AnalysisStore for InMemoryStore {
    async fn get(&self, content_hash: &str) -> Result<Option<AnalysisRecord>> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records.get(content_hash).cloned())
    }

    async fn list(&self) -> Result<Vec<AnalysisRecord>> {
        let records = self.records.read().map_err(poisoned)?;
        let mut all: Vec<AnalysisRecord> = records.values().cloned().collect();
        all.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| a.content_hash.cmp(&b.content_hash))
        });
        Ok(all)
    }

    async fn save(
        &self,
        content_hash: &str,
        source_name: &str,
        analysis: &Analysis,
    ) -> Result<AnalysisRecord> {
        let now = Utc::now();
        let mut records = self.records.write().map_err(poisoned)?;
        let record = records
            .entry(content_hash.to_string())
            .or_insert_with(|| AnalysisRecord::new(content_hash, source_name, now));
        record.source_name = source_name.to_string();
        record.apply(analysis.clone(), now);
        Ok(record.clone())
    }

    async fn delete(&self, content_hash: &str) -> Result<bool> {
        let mut records = self.records.write().map_err(poisoned)?;
        Ok(records.remove(content_hash).is_some())
    }
}
