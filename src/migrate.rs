use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

/// Create the cache schema on an open pool. Idempotent.
pub async fn apply(pool: &SqlitePool) -> Result<()> {
    // One row per document, keyed by the SHA-256 of its text. Each payload
    // column holds the JSON of one analysis kind, or NULL.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS analyses (
            content_hash TEXT PRIMARY KEY,
            source_name TEXT NOT NULL,
            summary_json TEXT,
            quick_json TEXT,
            entities_json TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_analyses_updated_at ON analyses(updated_at DESC)")
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply(&pool).await?;
    pool.close().await;
    Ok(())
}
