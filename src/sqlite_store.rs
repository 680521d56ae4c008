//! SQLite-backed [`AnalysisStore`] implementation.
//!
//! Each `save` is a single `INSERT … ON CONFLICT DO UPDATE` that touches
//! only the payload column of the saved kind, so concurrent writers for
//! different kinds of the same document never clobber each other.
//! Timestamps are stored as Unix milliseconds.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use doclens_core::models::{Analysis, AnalysisKind, AnalysisRecord};
use doclens_core::store::AnalysisStore;

use crate::config::Config;
use crate::{db, migrate};

const SELECT_COLUMNS: &str = "SELECT content_hash, source_name, summary_json, quick_json, \
     entities_json, created_at, updated_at FROM analyses";

/// SQLite implementation of the [`AnalysisStore`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to the configured database and ensure the schema exists.
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = db::connect(config).await?;
        migrate::apply(&pool).await?;
        Ok(Self::new(pool))
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

fn payload_column(kind: AnalysisKind) -> &'static str {
    match kind {
        AnalysisKind::Summary => "summary_json",
        AnalysisKind::Quick => "quick_json",
        AnalysisKind::Entities => "entities_json",
    }
}

fn payload_json(analysis: &Analysis) -> Result<String> {
    let json = match analysis {
        Analysis::Summary(s) => serde_json::to_string(s)?,
        Analysis::Quick(q) => serde_json::to_string(q)?,
        Analysis::Entities(e) => serde_json::to_string(e)?,
    };
    Ok(json)
}

fn decode_column<T: DeserializeOwned>(row: &SqliteRow, column: &str) -> Result<Option<T>> {
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|json| {
        serde_json::from_str(&json).with_context(|| format!("Corrupt cached {} payload", column))
    })
    .transpose()
}

fn decode_timestamp(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>> {
    let ms: i64 = row.try_get(column)?;
    DateTime::from_timestamp_millis(ms)
        .with_context(|| format!("Out-of-range cached {} timestamp: {}", column, ms))
}

fn row_to_record(row: &SqliteRow) -> Result<AnalysisRecord> {
    Ok(AnalysisRecord {
        content_hash: row.try_get("content_hash")?,
        source_name: row.try_get("source_name")?,
        summary: decode_column(row, "summary_json")?,
        quick_analysis: decode_column(row, "quick_json")?,
        entities: decode_column(row, "entities_json")?,
        created_at: decode_timestamp(row, "created_at")?,
        updated_at: decode_timestamp(row, "updated_at")?,
    })
}

#[async_trait]
impl AnalysisStore for SqliteStore {
    async fn get(&self, content_hash: &str) -> Result<Option<AnalysisRecord>> {
        let row = sqlx::query(&format!("{} WHERE content_hash = ?", SELECT_COLUMNS))
            .bind(content_hash)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_record).transpose()
    }

    async fn list(&self) -> Result<Vec<AnalysisRecord>> {
        let rows = sqlx::query(&format!(
            "{} ORDER BY updated_at DESC, content_hash ASC",
            SELECT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_record).collect()
    }

    async fn save(
        &self,
        content_hash: &str,
        source_name: &str,
        analysis: &Analysis,
    ) -> Result<AnalysisRecord> {
        let column = payload_column(analysis.kind());
        let now = Utc::now().timestamp_millis();

        sqlx::query(&format!(
            r#"
            INSERT INTO analyses (content_hash, source_name, {col}, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(content_hash) DO UPDATE SET
                source_name = excluded.source_name,
                {col} = excluded.{col},
                updated_at = excluded.updated_at
            "#,
            col = column
        ))
        .bind(content_hash)
        .bind(source_name)
        .bind(payload_json(analysis)?)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get(content_hash)
            .await?
            .with_context(|| format!("analysis {} vanished after save", content_hash))
    }

    async fn delete(&self, content_hash: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM analyses WHERE content_hash = ?")
            .bind(content_hash)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doclens_core::models::{DocumentSummary, EntityExtraction};
    use tempfile::TempDir;

    async fn open_temp() -> (TempDir, SqliteStore) {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::minimal();
        config.db.path = tmp.path().join("data/lens.sqlite");
        let store = SqliteStore::open(&config).await.unwrap();
        (tmp, store)
    }

    fn summary(title: &str) -> Analysis {
        Analysis::Summary(DocumentSummary {
            title: title.to_string(),
            overview: "overview".to_string(),
            key_points: vec!["one".to_string(), "two".to_string()],
            conclusion: "done".to_string(),
            estimated_reading_time_minutes: 3,
        })
    }

    #[tokio::test]
    async fn test_save_get_roundtrip() {
        let (_tmp, store) = open_temp().await;
        let saved = store.save("abc", "a.txt", &summary("A")).await.unwrap();
        assert_eq!(saved.summary.as_ref().unwrap().title, "A");
        assert!(saved.entities.is_none());

        let got = store.get("abc").await.unwrap().unwrap();
        assert_eq!(got, saved);
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_other_kind_keeps_existing_payload() {
        let (_tmp, store) = open_temp().await;
        let first = store.save("abc", "a.txt", &summary("A")).await.unwrap();
        let entities = EntityExtraction {
            people: vec!["Ada".to_string()],
            ..Default::default()
        };
        let second = store
            .save("abc", "a.txt", &Analysis::Entities(entities.clone()))
            .await
            .unwrap();

        assert_eq!(second.summary, first.summary);
        assert_eq!(second.entities, Some(entities));
        assert_eq!(second.created_at, first.created_at);
        assert!(second.updated_at >= first.updated_at);
    }

    #[tokio::test]
    async fn test_out_of_range_timestamp_is_an_error() {
        let (_tmp, store) = open_temp().await;
        store.save("abc", "a.txt", &summary("A")).await.unwrap();
        sqlx::query("UPDATE analyses SET updated_at = ? WHERE content_hash = 'abc'")
            .bind(i64::MAX)
            .execute(&store.pool)
            .await
            .unwrap();

        let err = store.get("abc").await.unwrap_err();
        assert!(err.to_string().contains("Out-of-range cached updated_at"));
        assert!(store.list().await.is_err());
    }

    #[tokio::test]
    async fn test_delete_and_list() {
        let (_tmp, store) = open_temp().await;
        store.save("one", "1.txt", &summary("1")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store.save("two", "2.txt", &summary("2")).await.unwrap();

        let hashes: Vec<String> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.content_hash)
            .collect();
        assert_eq!(hashes, vec!["two", "one"]);

        assert!(store.delete("one").await.unwrap());
        assert!(!store.delete("one").await.unwrap());
        assert_eq!(store.list().await.unwrap().len(), 1);
        store.close().await;
    }
}
