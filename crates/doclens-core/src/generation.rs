//! Generation port.
//!
//! The generator is an opaque collaborator: given a prompt and the analysis
//! kind (which doubles as the output schema) it returns a structured
//! result, pushes partial results while streaming, or fails with a typed
//! [`GenerationError`]. Concrete backends (HTTP, disabled) live in the
//! `doclens` app crate; tests plug in their own.

use async_trait::async_trait;

use crate::models::{
    Analysis, AnalysisKind, DocumentSummary, EntityExtraction, PartialDocumentSummary,
    QuickAnalysis,
};

/// Typed generation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error("prompt exceeds the model's context window")]
    ContextWindowExceeded,
    #[error("request was blocked by a content guardrail")]
    GuardrailViolation,
    #[error("rate limited by the generation backend")]
    RateLimited,
    #[error("a generation for this document is already in progress")]
    ConcurrentRequestInProgress,
    #[error("generation backend unavailable: {0}")]
    Unavailable(String),
    #[error("could not decode generated output: {0}")]
    DecodingFailure(String),
    #[error("generation failed: {0}")]
    Other(String),
}

impl GenerationError {
    /// Whether retrying the same request later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GenerationError::RateLimited | GenerationError::Unavailable(_))
    }
}

/// Receives partial summaries while one is being generated.
pub trait SummarySink: Send + Sync {
    fn partial(&self, partial: &PartialDocumentSummary);
}

impl<F> SummarySink for F
where
    F: Fn(&PartialDocumentSummary) + Send + Sync,
{
    fn partial(&self, partial: &PartialDocumentSummary) {
        self(partial)
    }
}

/// Structured text generation backend.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Backend identifier (e.g. `"openai:gpt-4o-mini"`).
    fn name(&self) -> &str;

    /// Context window in tokens, prompt and response together.
    fn context_tokens(&self) -> usize;

    /// Generate one analysis of `kind` from `prompt`.
    async fn generate(&self, prompt: &str, kind: AnalysisKind) -> Result<Analysis, GenerationError>;

    /// Generate a summary, pushing partial results to `sink` as they arrive.
    ///
    /// Backends without incremental output get this default: one
    /// [`generate`](Generator::generate) call and a single, complete partial.
    async fn stream_summary(
        &self,
        prompt: &str,
        sink: &dyn SummarySink,
    ) -> Result<DocumentSummary, GenerationError> {
        match self.generate(prompt, AnalysisKind::Summary).await? {
            Analysis::Summary(summary) => {
                sink.partial(&PartialDocumentSummary::from(&summary));
                Ok(summary)
            }
            other => Err(GenerationError::DecodingFailure(format!(
                "expected a summary, got {}",
                other.kind()
            ))),
        }
    }
}

/// Decode generated JSON text into an [`Analysis`] of `kind`.
///
/// Tolerates a surrounding Markdown code fence and leading/trailing prose
/// around the outermost JSON object. Output is clamped to schema bounds.
pub fn parse_analysis(kind: AnalysisKind, raw: &str) -> Result<Analysis, GenerationError> {
    let json = extract_json_object(raw)
        .ok_or_else(|| GenerationError::DecodingFailure("no JSON object in output".to_string()))?;
    let decode_err = |e: serde_json::Error| GenerationError::DecodingFailure(e.to_string());

    Ok(match kind {
        AnalysisKind::Summary => Analysis::Summary(
            serde_json::from_str::<DocumentSummary>(json)
                .map_err(decode_err)?
                .normalized(),
        ),
        AnalysisKind::Quick => Analysis::Quick(
            serde_json::from_str::<QuickAnalysis>(json)
                .map_err(decode_err)?
                .normalized(),
        ),
        AnalysisKind::Entities => {
            Analysis::Entities(serde_json::from_str::<EntityExtraction>(json).map_err(decode_err)?)
        }
    })
}

fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}
