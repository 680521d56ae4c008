//! Analysis payloads and the cached analysis record.
//!
//! A document yields one or more chunks; each chunk is analysed by the
//! generator into one of the payloads below; multi-chunk results are folded
//! by [`crate::combine`]. The cache keys a record by [`content_hash`] of the
//! full document text.

use std::ops::RangeInclusive;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Upper bound on summary key points.
pub const SUMMARY_KEY_POINTS_MAX: usize = 5;
/// Lower bound on summary key points requested from the generator.
pub const SUMMARY_KEY_POINTS_MIN: usize = 3;
/// Accepted reading-time range for a single generated summary.
pub const READING_TIME_RANGE: RangeInclusive<u32> = 1..=100;
/// Upper bound on quick-analysis topics.
pub const QUICK_TOPICS_MAX: usize = 5;

/// Structured summary of a document (or of one chunk of it).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub title: String,
    pub overview: String,
    pub key_points: Vec<String>,
    pub conclusion: String,
    pub estimated_reading_time_minutes: u32,
}

impl DocumentSummary {
    /// Clamp generator output into the schema bounds.
    ///
    /// Key points are cut to [`SUMMARY_KEY_POINTS_MAX`] and the reading time
    /// is clamped into [`READING_TIME_RANGE`]. Combined summaries are never
    /// normalized: their reading time is an unbounded sum.
    pub fn normalized(mut self) -> Self {
        self.key_points.truncate(SUMMARY_KEY_POINTS_MAX);
        self.estimated_reading_time_minutes = self
            .estimated_reading_time_minutes
            .clamp(*READING_TIME_RANGE.start(), *READING_TIME_RANGE.end());
        self
    }
}

/// A summary still being generated. Fields fill in progressively.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialDocumentSummary {
    pub title: Option<String>,
    pub overview: Option<String>,
    pub key_points: Option<Vec<String>>,
    pub conclusion: Option<String>,
    pub estimated_reading_time_minutes: Option<u32>,
}

impl PartialDocumentSummary {
    pub fn is_complete(&self) -> bool {
        self.title.is_some()
            && self.overview.is_some()
            && self.key_points.is_some()
            && self.conclusion.is_some()
            && self.estimated_reading_time_minutes.is_some()
    }

    pub fn into_summary(self) -> Option<DocumentSummary> {
        Some(DocumentSummary {
            title: self.title?,
            overview: self.overview?,
            key_points: self.key_points?,
            conclusion: self.conclusion?,
            estimated_reading_time_minutes: self.estimated_reading_time_minutes?,
        })
    }
}

impl From<&DocumentSummary> for PartialDocumentSummary {
    fn from(s: &DocumentSummary) -> Self {
        Self {
            title: Some(s.title.clone()),
            overview: Some(s.overview.clone()),
            key_points: Some(s.key_points.clone()),
            conclusion: Some(s.conclusion.clone()),
            estimated_reading_time_minutes: Some(s.estimated_reading_time_minutes),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Basic,
    Intermediate,
    Advanced,
}

/// Fast first-look classification of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickAnalysis {
    pub main_topic: String,
    pub document_type: String,
    pub complexity: Complexity,
    pub key_topics: Vec<String>,
}

impl QuickAnalysis {
    pub fn normalized(mut self) -> Self {
        self.key_topics.truncate(QUICK_TOPICS_MAX);
        self
    }
}

/// Named entities found in a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EntityExtraction {
    pub people: Vec<String>,
    pub organizations: Vec<String>,
    pub locations: Vec<String>,
    pub dates: Vec<String>,
    pub key_terms: Vec<String>,
}

impl EntityExtraction {
    pub fn is_empty(&self) -> bool {
        self.people.is_empty()
            && self.organizations.is_empty()
            && self.locations.is_empty()
            && self.dates.is_empty()
            && self.key_terms.is_empty()
    }
}

/// Which analysis to run; doubles as the output schema for the generator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisKind {
    #[default]
    Summary,
    Quick,
    Entities,
}

impl AnalysisKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisKind::Summary => "summary",
            AnalysisKind::Quick => "quick",
            AnalysisKind::Entities => "entities",
        }
    }
}

impl std::fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AnalysisKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "summary" => Ok(Self::Summary),
            "quick" => Ok(Self::Quick),
            "entities" => Ok(Self::Entities),
            other => Err(format!(
                "unknown analysis kind '{}': must be summary, quick, or entities",
                other
            )),
        }
    }
}

/// A finished analysis of one kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "result", rename_all = "lowercase")]
pub enum Analysis {
    Summary(DocumentSummary),
    Quick(QuickAnalysis),
    Entities(EntityExtraction),
}

impl Analysis {
    pub fn kind(&self) -> AnalysisKind {
        match self {
            Analysis::Summary(_) => AnalysisKind::Summary,
            Analysis::Quick(_) => AnalysisKind::Quick,
            Analysis::Entities(_) => AnalysisKind::Entities,
        }
    }
}

/// Cached analyses for one document, keyed by content hash.
///
/// Holds at most one payload of each kind. Saving a payload replaces the
/// previous one of the same kind and bumps `updated_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    pub content_hash: String,
    pub source_name: String,
    pub summary: Option<DocumentSummary>,
    pub quick_analysis: Option<QuickAnalysis>,
    pub entities: Option<EntityExtraction>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AnalysisRecord {
    pub fn new(content_hash: &str, source_name: &str, now: DateTime<Utc>) -> Self {
        Self {
            content_hash: content_hash.to_string(),
            source_name: source_name.to_string(),
            summary: None,
            quick_analysis: None,
            entities: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// The cached payload of `kind`, if any.
    pub fn get(&self, kind: AnalysisKind) -> Option<Analysis> {
        match kind {
            AnalysisKind::Summary => self.summary.clone().map(Analysis::Summary),
            AnalysisKind::Quick => self.quick_analysis.clone().map(Analysis::Quick),
            AnalysisKind::Entities => self.entities.clone().map(Analysis::Entities),
        }
    }

    /// Replace the payload of the analysis's kind and bump `updated_at`.
    pub fn apply(&mut self, analysis: Analysis, now: DateTime<Utc>) {
        match analysis {
            Analysis::Summary(s) => self.summary = Some(s),
            Analysis::Quick(q) => self.quick_analysis = Some(q),
            Analysis::Entities(e) => self.entities = Some(e),
        }
        self.updated_at = now;
    }

    pub fn kinds(&self) -> Vec<AnalysisKind> {
        let mut kinds = Vec::new();
        if self.summary.is_some() {
            kinds.push(AnalysisKind::Summary);
        }
        if self.quick_analysis.is_some() {
            kinds.push(AnalysisKind::Quick);
        }
        if self.entities.is_some() {
            kinds.push(AnalysisKind::Entities);
        }
        kinds
    }
}

/// Lowercase hex SHA-256 of `text`, used as the cache key.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(points: usize, minutes: u32) -> DocumentSummary {
        DocumentSummary {
            title: "T".into(),
            overview: "O".into(),
            key_points: (0..points).map(|i| format!("p{}", i)).collect(),
            conclusion: "C".into(),
            estimated_reading_time_minutes: minutes,
        }
    }

    #[test]
    fn test_normalized_clamps() {
        let s = summary(8, 0).normalized();
        assert_eq!(s.key_points.len(), 5);
        assert_eq!(s.estimated_reading_time_minutes, 1);
        assert_eq!(summary(3, 500).normalized().estimated_reading_time_minutes, 100);
    }

    #[test]
    fn test_partial_completion() {
        let mut p = PartialDocumentSummary {
            title: Some("T".into()),
            ..Default::default()
        };
        assert!(!p.is_complete());
        assert!(p.clone().into_summary().is_none());

        p = PartialDocumentSummary::from(&summary(3, 4));
        assert!(p.is_complete());
        assert_eq!(p.into_summary(), Some(summary(3, 4)));
    }

    #[test]
    fn test_summary_json_shape() {
        let json = serde_json::to_value(summary(1, 2)).unwrap();
        assert_eq!(json["keyPoints"][0], "p0");
        assert_eq!(json["estimatedReadingTimeMinutes"], 2);
    }

    #[test]
    fn test_entities_default_on_missing_fields() {
        let e: EntityExtraction = serde_json::from_str(r#"{"people": ["Ada"]}"#).unwrap();
        assert_eq!(e.people, vec!["Ada"]);
        assert!(e.dates.is_empty());
        assert!(!e.is_empty());
    }

    #[test]
    fn test_record_apply_replaces_only_same_kind() {
        let t0 = DateTime::from_timestamp(1_000, 0).unwrap();
        let t1 = DateTime::from_timestamp(2_000, 0).unwrap();
        let mut r = AnalysisRecord::new("h", "doc.txt", t0);
        r.apply(Analysis::Summary(summary(3, 2)), t0);
        r.apply(Analysis::Entities(EntityExtraction::default()), t1);
        r.apply(Analysis::Summary(summary(4, 9)), t1);

        assert_eq!(r.summary.as_ref().unwrap().estimated_reading_time_minutes, 9);
        assert!(r.entities.is_some());
        assert!(r.quick_analysis.is_none());
        assert_eq!(r.created_at, t0);
        assert_eq!(r.updated_at, t1);
        assert_eq!(r.kinds(), vec![AnalysisKind::Summary, AnalysisKind::Entities]);
        assert!(r.get(AnalysisKind::Quick).is_none());
    }

    #[test]
    fn test_content_hash_stable() {
        assert_eq!(
            content_hash(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_ne!(content_hash("a"), content_hash("b"));
    }

    #[test]
    fn test_kind_parse_roundtrip() {
        for kind in [AnalysisKind::Summary, AnalysisKind::Quick, AnalysisKind::Entities] {
            assert_eq!(kind.as_str().parse::<AnalysisKind>(), Ok(kind));
        }
        assert!("other".parse::<AnalysisKind>().is_err());
    }

    #[test]
    fn test_record_uses_camel_case_keys() {
        let mut record = AnalysisRecord::new("abc", "a.txt", Utc::now());
        record.apply(Analysis::Summary(summary(3, 4)), Utc::now());
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["contentHash"], "abc");
        assert_eq!(json["sourceName"], "a.txt");
        assert!(json.get("quickAnalysis").is_some());
        assert!(json.get("createdAt").is_some());
        assert!(json.get("updatedAt").is_some());
        assert_eq!(json["summary"]["estimatedReadingTimeMinutes"], 4);
        assert!(json.get("content_hash").is_none());
    }
}
