//! Analysis orchestration.
//!
//! Drives one document through the pipeline: cache lookup → chunking →
//! per-chunk generation → combination → cache write. All collaborators
//! (generator, store, progress reporter) are injected; nothing here is a
//! process-wide singleton.
//!
//! # Concurrency
//!
//! - At most one analysis per content hash is in flight on an [`Analyzer`].
//!   A second concurrent call fails fast with
//!   [`GenerationError::ConcurrentRequestInProgress`]. Dropping the
//!   `analyze` future cancels it and releases the slot.
//! - Chunks are generated with up to `concurrency` requests in flight.
//!   Combination waits for every chunk; any chunk failure fails the call
//!   and nothing is written to the store.

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, info};

use doclens_core::chunk::{chunk_with_strategy, ChunkOptions, ChunkStrategy, ContentChunk};
use doclens_core::combine::{combine_entities, combine_summaries};
use doclens_core::generation::{GenerationError, Generator, SummarySink};
use doclens_core::models::{
    content_hash, Analysis, AnalysisKind, AnalysisRecord, PartialDocumentSummary,
};
use doclens_core::prompt::{build_prompt, PromptBudget};
use doclens_core::store::AnalysisStore;

use crate::config::Config;
use crate::extract::load_document;
use crate::generation::create_generator;
use crate::progress::{AnalysisProgressEvent, NoProgress, ProgressMode, ProgressReporter};
use crate::sqlite_store::SqliteStore;

/// Tunables for an [`Analyzer`].
#[derive(Debug, Clone)]
pub struct AnalyzerOptions {
    pub chunking: ChunkOptions,
    pub strategy: ChunkStrategy,
    pub budget: PromptBudget,
    pub concurrency: usize,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            chunking: ChunkOptions::default(),
            strategy: ChunkStrategy::default(),
            budget: PromptBudget::default(),
            concurrency: 1,
        }
    }
}

impl AnalyzerOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            chunking: config.chunking.options(),
            strategy: config.chunking.strategy,
            budget: config.generation.budget(),
            concurrency: config.generation.concurrency,
        }
    }

    /// Chunk size actually used: the configured ceiling, lowered to what
    /// fits in a prompt next to the instructions.
    pub fn effective_chunk_tokens(&self) -> usize {
        self.chunking
            .max_tokens
            .min(self.budget.chunk_tokens())
            .max(1)
    }

    /// Split `text` into the chunks an analysis will send to the generator.
    ///
    /// Whitespace-only chunks are dropped.
    pub fn chunk(&self, text: &str) -> Vec<ContentChunk> {
        let options = self
            .chunking
            .clone()
            .with_max_tokens(self.effective_chunk_tokens());
        chunk_with_strategy(text, self.strategy, &options)
            .into_iter()
            .filter(|c| !c.content.trim().is_empty())
            .collect()
    }
}

/// Receives partial summaries tagged with the 0-based index of the chunk
/// they belong to.
///
/// With `concurrency > 1`, partials of different chunks arrive interleaved;
/// the index is the only ordering key.
pub trait SectionSummarySink: Send + Sync {
    fn partial(&self, index: usize, partial: &PartialDocumentSummary);
}

impl<F> SectionSummarySink for F
where
    F: Fn(usize, &PartialDocumentSummary) + Send + Sync,
{
    fn partial(&self, index: usize, partial: &PartialDocumentSummary) {
        self(index, partial)
    }
}

/// Adapts a [`SectionSummarySink`] to one chunk's generation.
struct ChunkSink<'a> {
    index: usize,
    inner: Option<&'a dyn SectionSummarySink>,
}

impl SummarySink for ChunkSink<'_> {
    fn partial(&self, partial: &PartialDocumentSummary) {
        if let Some(inner) = self.inner {
            inner.partial(self.index, partial);
        }
    }
}

/// Result of [`Analyzer::analyze`].
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    /// The cache record after this analysis (all kinds cached so far).
    pub record: AnalysisRecord,
    /// The analysis of the requested kind.
    pub analysis: Analysis,
    /// Number of chunks the document was split into (0 on a cache hit).
    pub chunks: usize,
    pub from_cache: bool,
}

/// Runs analyses of documents against a generator, caching results.
pub struct Analyzer {
    generator: Arc<dyn Generator>,
    store: Arc<dyn AnalysisStore>,
    options: AnalyzerOptions,
    progress: Box<dyn ProgressReporter>,
    summary_sink: Option<Arc<dyn SectionSummarySink>>,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl Analyzer {
    pub fn new(
        generator: Arc<dyn Generator>,
        store: Arc<dyn AnalysisStore>,
        options: AnalyzerOptions,
    ) -> Self {
        Self {
            generator,
            store,
            options,
            progress: Box::new(NoProgress),
            summary_sink: None,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn with_progress(mut self, progress: Box<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// Receive partial summaries, tagged with their chunk index, while
    /// per-chunk summaries are generated.
    pub fn with_summary_sink(mut self, sink: Arc<dyn SectionSummarySink>) -> Self {
        self.summary_sink = Some(sink);
        self
    }

    pub fn options(&self) -> &AnalyzerOptions {
        &self.options
    }

    /// Split `text` the way [`analyze`](Analyzer::analyze) will.
    pub fn chunk(&self, text: &str) -> Vec<ContentChunk> {
        self.options.chunk(text)
    }

    /// Analyze `text`, returning a cached result unless `force` is set.
    ///
    /// # Errors
    ///
    /// Generation failures surface as [`GenerationError`] inside the
    /// returned `anyhow::Error` (use `downcast_ref`). Store failures are
    /// returned with context.
    pub async fn analyze(
        &self,
        source_name: &str,
        text: &str,
        kind: AnalysisKind,
        force: bool,
    ) -> Result<AnalysisOutcome> {
        let hash = content_hash(text);

        if !force {
            if let Some(record) = self.store.get(&hash).await? {
                if let Some(analysis) = record.get(kind) {
                    debug!(document = source_name, %kind, "analysis cache hit");
                    self.progress.report(AnalysisProgressEvent::Cached {
                        document: source_name.to_string(),
                        kind,
                    });
                    return Ok(AnalysisOutcome {
                        record,
                        analysis,
                        chunks: 0,
                        from_cache: true,
                    });
                }
            }
        }

        let _guard = InFlightGuard::acquire(&self.in_flight, &hash)?;

        let chunks = self.chunk(text);
        self.progress.report(AnalysisProgressEvent::Chunked {
            document: source_name.to_string(),
            chunks: chunks.len(),
        });
        info!(
            document = source_name,
            %kind,
            chunks = chunks.len(),
            generator = self.generator.name(),
            "analyzing document"
        );

        let analysis = match kind {
            AnalysisKind::Summary => {
                let results = self.generate_all(source_name, kind, &chunks).await?;
                self.report_combining(source_name, results.len());
                let summaries: Vec<_> = results
                    .into_iter()
                    .filter_map(|a| match a {
                        Analysis::Summary(s) => Some(s),
                        _ => None,
                    })
                    .collect();
                Analysis::Summary(combine_summaries(&summaries))
            }
            AnalysisKind::Entities => {
                let results = self.generate_all(source_name, kind, &chunks).await?;
                self.report_combining(source_name, results.len());
                let extractions: Vec<_> = results
                    .into_iter()
                    .filter_map(|a| match a {
                        Analysis::Entities(e) => Some(e),
                        _ => None,
                    })
                    .collect();
                Analysis::Entities(combine_entities(&extractions))
            }
            AnalysisKind::Quick => {
                if chunks.is_empty() {
                    bail!("'{}' has no text to analyze", source_name);
                }
                let mut results = self.generate_all(source_name, kind, &chunks[..1]).await?;
                match results.pop() {
                    Some(analysis) => analysis,
                    None => bail!("generator returned no quick analysis"),
                }
            }
        };

        let record = self
            .store
            .save(&hash, source_name, &analysis)
            .await
            .with_context(|| format!("Failed to cache {} analysis of '{}'", kind, source_name))?;
        debug!(document = source_name, %kind, hash = %hash, "analysis cached");

        Ok(AnalysisOutcome {
            record,
            analysis,
            chunks: chunks.len(),
            from_cache: false,
        })
    }

    async fn generate_all(
        &self,
        document: &str,
        kind: AnalysisKind,
        chunks: &[ContentChunk],
    ) -> Result<Vec<Analysis>, GenerationError> {
        let total = chunks.len();
        let done = AtomicUsize::new(0);
        let section_sink = self.summary_sink.as_deref();

        stream::iter(chunks.iter().map(|chunk| {
            let done = &done;
            async move {
                let prompt = build_prompt(kind, chunk, &self.options.budget);
                let analysis = match kind {
                    AnalysisKind::Summary => {
                        let sink = ChunkSink {
                            index: chunk.index,
                            inner: section_sink,
                        };
                        Analysis::Summary(self.generator.stream_summary(&prompt, &sink).await?)
                    }
                    _ => self.generator.generate(&prompt, kind).await?,
                };
                if analysis.kind() != kind {
                    return Err(GenerationError::DecodingFailure(format!(
                        "expected {} output, got {}",
                        kind,
                        analysis.kind()
                    )));
                }

                let n = done.fetch_add(1, Ordering::SeqCst) + 1;
                self.progress.report(AnalysisProgressEvent::Generating {
                    document: document.to_string(),
                    n,
                    total,
                });
                Ok(analysis)
            }
        }))
        .buffered(self.options.concurrency.max(1))
        .try_collect()
        .await
    }

    fn report_combining(&self, document: &str, sections: usize) {
        if sections > 1 {
            self.progress.report(AnalysisProgressEvent::Combining {
                document: document.to_string(),
                sections,
            });
        }
    }
}

/// Holds a content hash in the in-flight set until dropped.
struct InFlightGuard {
    set: Arc<Mutex<HashSet<String>>>,
    key: String,
}

impl InFlightGuard {
    fn acquire(set: &Arc<Mutex<HashSet<String>>>, key: &str) -> Result<Self, GenerationError> {
        let mut held = match set.lock() {
            Ok(held) => held,
            Err(poisoned) => poisoned.into_inner(),
        };
        if !held.insert(key.to_string()) {
            return Err(GenerationError::ConcurrentRequestInProgress);
        }
        Ok(Self {
            set: Arc::clone(set),
            key: key.to_string(),
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut held = match self.set.lock() {
            Ok(held) => held,
            Err(poisoned) => poisoned.into_inner(),
        };
        held.remove(&self.key);
    }
}

/// CLI entry point for `lens analyze <file>`.
pub async fn run_analyze(
    config: &Config,
    path: &Path,
    kind: AnalysisKind,
    force: bool,
    json: bool,
    progress: ProgressMode,
) -> Result<()> {
    let doc = load_document(path).with_context(|| format!("Failed to load {}", path.display()))?;
    if !config.generation.is_enabled() {
        debug!("generation is disabled; only cached analyses can be returned");
    }
    let generator = create_generator(&config.generation)?;
    let store = Arc::new(SqliteStore::open(config).await?);

    let analyzer = Analyzer::new(generator, store, AnalyzerOptions::from_config(config))
        .with_progress(progress.reporter());
    let outcome = analyzer.analyze(&doc.name, &doc.text, kind, force).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome.analysis)?);
    } else {
        if outcome.from_cache {
            println!("(cached {} for {})", kind, doc.name);
        } else {
            println!("({} from {} chunks of {})", kind, outcome.chunks, doc.name);
        }
        println!("{}", render_analysis(&outcome.analysis));
    }

    Ok(())
}

/// Plain-text rendering of an analysis for terminal output.
pub fn render_analysis(analysis: &Analysis) -> String {
    let mut out = String::new();
    match analysis {
        Analysis::Summary(s) => {
            out.push_str(&format!("# {}\n\n{}\n\n", s.title, s.overview));
            for point in &s.key_points {
                out.push_str(&format!("- {}\n", point));
            }
            out.push_str(&format!(
                "\n{}\n\nReading time: {} min\n",
                s.conclusion, s.estimated_reading_time_minutes
            ));
        }
        Analysis::Quick(q) => {
            out.push_str(&format!("topic:      {}\n", q.main_topic));
            out.push_str(&format!("type:       {}\n", q.document_type));
            out.push_str(&format!("complexity: {:?}\n", q.complexity).to_lowercase());
            out.push_str(&format!("topics:     {}\n", q.key_topics.join(", ")));
        }
        Analysis::Entities(e) => {
            for (label, items) in [
                ("people", &e.people),
                ("organizations", &e.organizations),
                ("locations", &e.locations),
                ("dates", &e.dates),
                ("key terms", &e.key_terms),
            ] {
                if !items.is_empty() {
                    out.push_str(&format!("{:<14}{}\n", format!("{}:", label), items.join(", ")));
                }
            }
            if e.is_empty() {
                out.push_str("(no entities found)\n");
            }
        }
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use doclens_core::models::{Complexity, DocumentSummary, EntityExtraction, QuickAnalysis};

    #[test]
    fn effective_chunk_tokens_respects_prompt_budget() {
        let mut options = AnalyzerOptions::default();
        assert!(options.budget.chunk_tokens() > 3000);
        assert_eq!(options.effective_chunk_tokens(), 3000);

        options.budget = PromptBudget::new(2048, 512);
        assert_eq!(options.effective_chunk_tokens(), options.budget.chunk_tokens());
        assert!(options.effective_chunk_tokens() < 1536);

        options.budget = PromptBudget::new(600, 590);
        assert_eq!(options.effective_chunk_tokens(), 1);
    }

    #[test]
    fn in_flight_guard_releases_on_drop() {
        let set = Arc::new(Mutex::new(HashSet::new()));
        let guard = InFlightGuard::acquire(&set, "abc").unwrap();
        assert_eq!(
            InFlightGuard::acquire(&set, "abc").err(),
            Some(GenerationError::ConcurrentRequestInProgress)
        );
        assert!(InFlightGuard::acquire(&set, "other").is_ok());
        drop(guard);
        assert!(InFlightGuard::acquire(&set, "abc").is_ok());
    }

    #[test]
    fn render_summary() {
        let out = render_analysis(&Analysis::Summary(DocumentSummary {
            title: "Title".into(),
            overview: "Overview.".into(),
            key_points: vec!["one".into(), "two".into()],
            conclusion: "Done.".into(),
            estimated_reading_time_minutes: 7,
        }));
        assert!(out.starts_with("# Title"));
        assert!(out.contains("- two"));
        assert!(out.ends_with("Reading time: 7 min"));
    }

    #[test]
    fn render_quick_and_entities() {
        let out = render_analysis(&Analysis::Quick(QuickAnalysis {
            main_topic: "Rust".into(),
            document_type: "manual".into(),
            complexity: Complexity::Advanced,
            key_topics: vec!["ownership".into(), "traits".into()],
        }));
        assert!(out.contains("complexity: advanced"));
        assert!(out.contains("ownership, traits"));

        let empty = render_analysis(&Analysis::Entities(EntityExtraction::default()));
        assert_eq!(empty, "(no entities found)");

        let some = render_analysis(&Analysis::Entities(EntityExtraction {
            people: vec!["Ada".into()],
            ..Default::default()
        }));
        assert_eq!(some, "people:       Ada");
    }
}
