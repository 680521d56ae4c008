//! Analysis progress reporting.
//!
//! Reports observable progress while a document is chunked and each chunk
//! is sent to the generator, so users see how much is left. Progress is
//! emitted on **stderr** so stdout remains parseable for scripts.

use std::io::Write;

use doclens_core::models::AnalysisKind;

/// A single progress event for one document analysis.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnalysisProgressEvent {
    /// A cached result was returned; no generation happened.
    Cached { document: String, kind: AnalysisKind },
    /// The document was split into `chunks` chunks.
    Chunked { document: String, chunks: usize },
    /// `n` of `total` chunks have been generated.
    Generating {
        document: String,
        n: usize,
        total: usize,
    },
    /// All chunks are in; folding them into one result.
    Combining { document: String, sections: usize },
}

/// Reports analysis progress. Implementations write to stderr (human or JSON).
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: AnalysisProgressEvent);
}

/// Human-friendly progress on stderr: "analyze report.pdf  generating  2 / 5 chunks".
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: AnalysisProgressEvent) {
        let line = match &event {
            AnalysisProgressEvent::Cached { document, kind } => {
                format!("analyze {}  cached {}\n", document, kind)
            }
            AnalysisProgressEvent::Chunked { document, chunks } => {
                format!("analyze {}  {} chunks\n", document, format_number(*chunks as u64))
            }
            AnalysisProgressEvent::Generating { document, n, total } => format!(
                "analyze {}  generating  {} / {} chunks\n",
                document,
                format_number(*n as u64),
                format_number(*total as u64)
            ),
            AnalysisProgressEvent::Combining { document, sections } => {
                format!("analyze {}  combining {} sections\n", document, sections)
            }
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl JsonProgress {
    fn to_json(event: &AnalysisProgressEvent) -> serde_json::Value {
        match event {
            AnalysisProgressEvent::Cached { document, kind } => serde_json::json!({
                "event": "progress",
                "document": document,
                "phase": "cached",
                "kind": kind.as_str()
            }),
            AnalysisProgressEvent::Chunked { document, chunks } => serde_json::json!({
                "event": "progress",
                "document": document,
                "phase": "chunked",
                "chunks": chunks
            }),
            AnalysisProgressEvent::Generating { document, n, total } => serde_json::json!({
                "event": "progress",
                "document": document,
                "phase": "generating",
                "n": n,
                "total": total
            }),
            AnalysisProgressEvent::Combining { document, sections } => serde_json::json!({
                "event": "progress",
                "document": document,
                "phase": "combining",
                "sections": sections
            }),
        }
    }
}

impl ProgressReporter for JsonProgress {
    fn report(&self, event: AnalysisProgressEvent) {
        if let Ok(line) = serde_json::to_string(&Self::to_json(&event)) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: AnalysisProgressEvent) {}
}

pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

impl std::str::FromStr for ProgressMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "off" => Ok(ProgressMode::Off),
            "human" => Ok(ProgressMode::Human),
            "json" => Ok(ProgressMode::Json),
            other => Err(format!("invalid progress mode '{}': use off, human, or json", other)),
        }
    }
}
