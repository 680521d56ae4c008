//! Document library: find analysable files under a directory and report
//! their size, chunk count, and cache status.

use anyhow::{bail, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

use doclens_core::models::content_hash;
use doclens_core::store::AnalysisStore;
use doclens_core::token::estimate_token_count;

use crate::analyze::AnalyzerOptions;
use crate::config::{Config, LibraryConfig};
use crate::extract::load_document;
use crate::progress::format_number;
use crate::sqlite_store::SqliteStore;

/// One row of `lens library` output.
#[derive(Debug, Clone)]
pub struct LibraryEntry {
    pub relative_path: String,
    pub estimated_tokens: usize,
    pub chunks: usize,
    pub cached: Vec<String>,
}

/// Walk `root` and return matching document paths, sorted.
pub fn scan_library(root: &Path, library: &LibraryConfig) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        bail!("Library root is not a directory: {}", root.display());
    }

    let include_set = build_globset(&library.include_globs)?;

    let mut default_excludes = vec![
        "**/.git/**".to_string(),
        "**/target/**".to_string(),
        "**/node_modules/**".to_string(),
    ];
    default_excludes.extend(library.exclude_globs.clone());
    let exclude_set = build_globset(&default_excludes)?;

    let mut paths = Vec::new();

    let walker = WalkDir::new(root).follow_links(library.follow_symlinks);
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().to_string();

        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            continue;
        }

        paths.push(path.to_path_buf());
    }

    paths.sort();
    Ok(paths)
}

/// Load every document under `root` and look up its cache record.
pub async fn library_entries(
    config: &Config,
    root: &Path,
    store: &dyn AnalysisStore,
) -> Result<Vec<LibraryEntry>> {
    let options = AnalyzerOptions::from_config(config);
    let mut entries = Vec::new();

    for path in scan_library(root, &config.library)? {
        let doc = match load_document(&path) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable document");
                continue;
            }
        };

        let cached = store
            .get(&content_hash(&doc.text))
            .await?
            .map(|r| r.kinds().iter().map(|k| k.to_string()).collect())
            .unwrap_or_default();

        entries.push(LibraryEntry {
            relative_path: path
                .strip_prefix(root)
                .unwrap_or(&path)
                .to_string_lossy()
                .to_string(),
            estimated_tokens: estimate_token_count(&doc.text),
            chunks: options.chunk(&doc.text).len(),
            cached,
        });
    }

    Ok(entries)
}

/// CLI entry point for `lens library <dir>`.
pub async fn run_library(config: &Config, root: &Path) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let entries = library_entries(config, root, &store).await?;
    store.close().await;

    if entries.is_empty() {
        println!("No documents found under {}", root.display());
        return Ok(());
    }

    println!("{:<40} {:>10} {:>7}  CACHED", "DOCUMENT", "TOKENS", "CHUNKS");
    for e in &entries {
        let cached = if e.cached.is_empty() {
            "-".to_string()
        } else {
            e.cached.join(",")
        };
        println!(
            "{:<40} {:>10} {:>7}  {}",
            e.relative_path,
            format_number(e.estimated_tokens as u64),
            e.chunks,
            cached
        );
    }
    println!("{} documents", entries.len());

    Ok(())
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
