//! `lens cache`: inspect and prune the analysis cache.
//!
//! Records are addressed by content hash. Any unique prefix of a hash is
//! accepted, the way short commit ids are.

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};

use doclens_core::models::AnalysisRecord;
use doclens_core::store::AnalysisStore;

use crate::analyze::render_analysis;
use crate::config::Config;
use crate::sqlite_store::SqliteStore;

/// Find the single record whose hash starts with `prefix`.
pub async fn resolve_record(store: &dyn AnalysisStore, prefix: &str) -> Result<AnalysisRecord> {
    if prefix.is_empty() {
        bail!("hash prefix must not be empty");
    }
    if let Some(record) = store.get(prefix).await? {
        return Ok(record);
    }

    let mut matches: Vec<AnalysisRecord> = store
        .list()
        .await?
        .into_iter()
        .filter(|r| r.content_hash.starts_with(prefix))
        .collect();

    match matches.len() {
        0 => bail!("No cached analysis matches '{}'", prefix),
        1 => Ok(matches.remove(0)),
        n => bail!("'{}' is ambiguous: {} cached analyses match", prefix, n),
    }
}

/// CLI entry point for `lens cache list`.
pub async fn run_list(config: &Config, json: bool) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let records = store.list().await?;
    store.close().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No cached analyses.");
        return Ok(());
    }

    println!("{:<12} {:<32} {:<24} UPDATED", "HASH", "SOURCE", "KINDS");
    for r in &records {
        let kinds: Vec<&str> = r.kinds().iter().map(|k| k.as_str()).collect();
        println!(
            "{:<12} {:<32} {:<24} {}",
            short_hash(&r.content_hash),
            r.source_name,
            kinds.join(","),
            format_ts(r.updated_at)
        );
    }

    Ok(())
}

/// CLI entry point for `lens cache show <hash>`.
pub async fn run_show(config: &Config, prefix: &str, json: bool) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let record = resolve_record(&store, prefix).await;
    store.close().await;
    let record = record?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    println!("--- Record ---");
    println!("hash:        {}", record.content_hash);
    println!("source:      {}", record.source_name);
    println!("created_at:  {}", format_ts(record.created_at));
    println!("updated_at:  {}", format_ts(record.updated_at));
    for kind in record.kinds() {
        if let Some(analysis) = record.get(kind) {
            println!();
            println!("--- {} ---", kind);
            println!("{}", render_analysis(&analysis));
        }
    }

    Ok(())
}

/// CLI entry point for `lens cache delete <hash>`.
pub async fn run_delete(config: &Config, prefix: &str) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let result = async {
        let record = resolve_record(&store, prefix).await?;
        store.delete(&record.content_hash).await?;
        Ok::<_, anyhow::Error>(record)
    }
    .await;
    store.close().await;

    let record = result?;
    println!(
        "Deleted cached analyses of {} ({})",
        record.source_name,
        short_hash(&record.content_hash)
    );
    Ok(())
}

fn short_hash(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}

fn format_ts(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}
