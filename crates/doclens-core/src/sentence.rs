//! Sentence splitting.
//!
//! Sentences are the atomic unit of the overlap chunker: a chunk boundary
//! never falls inside one. A boundary is one or more of `.`, `!`, `?`
//! followed by one or more whitespace characters. The terminating
//! punctuation stays with its sentence.
//!
//! ```rust
//! use doclens_core::sentence::split_sentences;
//!
//! let s = split_sentences("It rained. Did it stop?  Yes!");
//! assert_eq!(s, vec!["It rained.", "Did it stop?", "Yes!"]);
//! ```

use std::sync::LazyLock;

use regex::Regex;

static BOUNDARY: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"[.!?]+\s+").ok());

/// Split `text` into trimmed, non-empty sentences in source order.
///
/// Falls back to [`split_sentences_naive`] if the boundary pattern is
/// unavailable.
pub fn split_sentences(text: &str) -> Vec<String> {
    let Some(boundary) = BOUNDARY.as_ref() else {
        return split_sentences_naive(text);
    };

    let mut sentences = Vec::new();
    let mut start = 0;
    for m in boundary.find_iter(text) {
        push_trimmed(&mut sentences, &text[start..m.end()]);
        start = m.end();
    }
    push_trimmed(&mut sentences, &text[start..]);
    sentences
}

/// Split on the literal `". "`. The separator's period is consumed.
pub fn split_sentences_naive(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    for piece in text.split(". ") {
        push_trimmed(&mut sentences, piece);
    }
    sentences
}

fn push_trimmed(out: &mut Vec<String>, piece: &str) {
    let trimmed = piece.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_and_whitespace() {
        assert!(split_sentences("").is_empty());
        assert!(split_sentences("   \n\t ").is_empty());
    }

    #[test]
    fn test_trailing_remainder_kept() {
        let s = split_sentences("First one. Second without a stop");
        assert_eq!(s, vec!["First one.", "Second without a stop"]);
    }

    #[test]
    fn test_repeated_punctuation_is_one_boundary() {
        let s = split_sentences("Wait... What?! Fine.");
        assert_eq!(s, vec!["Wait...", "What?!", "Fine."]);
    }

    #[test]
    fn test_newlines_count_as_whitespace() {
        let s = split_sentences("Line one.\nLine two.\n\n  Line three.");
        assert_eq!(s, vec!["Line one.", "Line two.", "Line three."]);
    }

    #[test]
    fn test_punctuation_without_whitespace_is_not_a_boundary() {
        let s = split_sentences("Version 3.14 shipped. Visit example.com now.");
        assert_eq!(s, vec!["Version 3.14 shipped.", "Visit example.com now."]);
    }

    #[test]
    fn test_naive_split() {
        let s = split_sentences_naive("One. Two. Three.");
        assert_eq!(s, vec!["One", "Two", "Three."]);
        assert!(split_sentences_naive("  ").is_empty());
    }
}
