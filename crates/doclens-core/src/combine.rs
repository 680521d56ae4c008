//! Folding per-chunk results into a single result.
//!
//! Combination is a barrier: callers hand over every chunk's result at
//! once. There is no partial combination.

use std::collections::HashSet;

use crate::models::{DocumentSummary, EntityExtraction, SUMMARY_KEY_POINTS_MAX};

/// Characters of each section overview kept in a combined overview.
pub const OVERVIEW_PREFIX_CHARS: usize = 100;

const EMPTY_TITLE: &str = "Empty Document";
const EMPTY_OVERVIEW: &str = "No content was available to analyze.";
const EMPTY_CONCLUSION: &str = "No conclusions could be drawn from an empty document.";

/// Reduce per-chunk summaries into one.
///
/// - No summaries: a placeholder with no key points and zero reading time.
/// - One summary: returned unchanged.
/// - Otherwise: the first title; an overview listing each section's
///   overview prefix; the deduplicated union of key points (first-seen
///   order, at most five); a templated conclusion; summed reading time.
///
/// ```rust
/// use doclens_core::combine::combine_summaries;
///
/// let empty = combine_summaries(&[]);
/// assert!(empty.key_points.is_empty());
/// assert_eq!(empty.estimated_reading_time_minutes, 0);
/// ```
pub fn combine_summaries(summaries: &[DocumentSummary]) -> DocumentSummary {
    let (first, rest) = match summaries.split_first() {
        None => return empty_summary(),
        Some((only, [])) => return only.clone(),
        Some(split) => split,
    };
    let sections = rest.len() + 1;

    let overviews = summaries
        .iter()
        .map(|s| s.overview.chars().take(OVERVIEW_PREFIX_CHARS).collect::<String>())
        .collect::<Vec<_>>()
        .join("; ");

    let mut key_points = dedup_first_seen(summaries.iter().flat_map(|s| s.key_points.iter()));
    key_points.truncate(SUMMARY_KEY_POINTS_MAX);

    DocumentSummary {
        title: first.title.clone(),
        overview: format!(
            "This document was analyzed in {} sections. {}",
            sections, overviews
        ),
        key_points,
        conclusion: format!(
            "Combined from {} sections, the key points above capture the main themes of the whole document.",
            sections
        ),
        estimated_reading_time_minutes: summaries
            .iter()
            .map(|s| s.estimated_reading_time_minutes)
            .fold(0u32, u32::saturating_add),
    }
}

/// Merge per-chunk entity extractions field by field.
pub fn combine_entities(extractions: &[EntityExtraction]) -> EntityExtraction {
    EntityExtraction {
        people: dedup_first_seen(extractions.iter().flat_map(|e| e.people.iter())),
        organizations: dedup_first_seen(extractions.iter().flat_map(|e| e.organizations.iter())),
        locations: dedup_first_seen(extractions.iter().flat_map(|e| e.locations.iter())),
        dates: dedup_first_seen(extractions.iter().flat_map(|e| e.dates.iter())),
        key_terms: dedup_first_seen(extractions.iter().flat_map(|e| e.key_terms.iter())),
    }
}

fn empty_summary() -> DocumentSummary {
    DocumentSummary {
        title: EMPTY_TITLE.to_string(),
        overview: EMPTY_OVERVIEW.to_string(),
        key_points: Vec::new(),
        conclusion: EMPTY_CONCLUSION.to_string(),
        estimated_reading_time_minutes: 0,
    }
}

fn dedup_first_seen<'a>(items: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .filter(|item| seen.insert(*item))
        .cloned()
        .collect()
}
