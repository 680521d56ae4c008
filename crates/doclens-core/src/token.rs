//! Token budget estimation.
//!
//! No tokenizer is available at this layer, so every budgeting decision
//! uses a fixed characters-per-token ratio. Lengths are counted in Unicode
//! scalar values, never bytes.
//!
//! ```rust
//! use doclens_core::token::estimate_token_count;
//!
//! assert_eq!(estimate_token_count("abcd"), 1);
//! assert_eq!(estimate_token_count("abc"), 0);
//! ```

use std::time::Duration;

/// Approximate characters-per-token ratio (4 chars ≈ 1 token).
pub const CHARS_PER_TOKEN: usize = 4;

/// Advisory generation throughput used for processing-time estimates.
pub const TOKENS_PER_SECOND: f64 = 500.0;

/// Default per-session token ceiling.
pub const DEFAULT_MAX_TOKENS: usize = 3000;

/// Character length of `text`, in Unicode scalar values.
#[inline]
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Estimated token count: `chars / 4`, rounded down.
pub fn estimate_token_count(text: &str) -> usize {
    char_len(text) / CHARS_PER_TOKEN
}

/// Character budget equivalent to `max_tokens`.
pub fn max_chars_for_tokens(max_tokens: usize) -> usize {
    max_tokens.saturating_mul(CHARS_PER_TOKEN)
}

/// Advisory time to generate over `text` at [`TOKENS_PER_SECOND`].
pub fn estimate_processing_time(text: &str) -> Duration {
    Duration::from_secs_f64(estimate_token_count(text) as f64 / TOKENS_PER_SECOND)
}

/// Whether `text` fits in a single session of `max_tokens`.
pub fn can_process_in_single_session(text: &str, max_tokens: usize) -> bool {
    estimate_token_count(text) <= max_tokens
}

/// Truncate `text` to roughly `max_tokens`, preferring a sentence boundary.
///
/// Text that already fits is returned unchanged. Otherwise the text is cut
/// at the character budget and then backed off to the last `.`, `!` or `?`
/// in the second half of the cut; failing that, to the last whitespace in
/// the second half; failing that, the hard cut is kept. The result is
/// trimmed.
pub fn truncate_to_token_budget(text: &str, max_tokens: usize) -> String {
    let max_chars = max_chars_for_tokens(max_tokens);
    if char_len(text) <= max_chars {
        return text.to_string();
    }

    let cut = text
        .char_indices()
        .nth(max_chars)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    let head = &text[..cut];
    let half = head.len() / 2;

    let end = head
        .rfind(&['.', '!', '?'][..])
        .filter(|&pos| pos >= half)
        .map(|pos| pos + 1)
        .or_else(|| head.rfind(char::is_whitespace).filter(|&pos| pos >= half))
        .unwrap_or(cut);

    head[..end].trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_floors() {
        assert_eq!(estimate_token_count(""), 0);
        assert_eq!(estimate_token_count("abc"), 0);
        assert_eq!(estimate_token_count("abcd"), 1);
        assert_eq!(estimate_token_count("abcdefg"), 1);
        assert_eq!(estimate_token_count(&"x".repeat(12_000)), 3000);
    }

    #[test]
    fn test_estimate_counts_chars_not_bytes() {
        // four two-byte characters
        assert_eq!(estimate_token_count("éééé"), 1);
        assert_eq!(estimate_token_count("日本語だ"), 1);
    }

    #[test]
    fn test_single_session_boundary() {
        let text = "x".repeat(400);
        assert!(can_process_in_single_session(&text, 100));
        assert!(!can_process_in_single_session(&text, 99));
    }

    #[test]
    fn test_processing_time() {
        let text = "x".repeat(4000);
        assert_eq!(estimate_processing_time(&text), Duration::from_secs(2));
        assert_eq!(estimate_processing_time(""), Duration::ZERO);
    }

    #[test]
    fn test_truncate_short_text_unchanged() {
        assert_eq!(truncate_to_token_budget("  short.  ", 10), "  short.  ");
    }

    #[test]
    fn test_truncate_prefers_sentence_boundary() {
        let text = "One two three four. Five six seven eight nine ten eleven.";
        // budget of 6 tokens = 24 chars; cut lands inside the second sentence
        let out = truncate_to_token_budget(text, 6);
        assert_eq!(out, "One two three four.");
    }

    #[test]
    fn test_truncate_falls_back_to_whitespace() {
        let text = "alpha beta gamma delta epsilon zeta eta theta";
        let out = truncate_to_token_budget(text, 3);
        assert!(char_len(&out) <= 12);
        assert_eq!(out, "alpha beta");
    }

    #[test]
    fn test_truncate_ignores_whitespace_in_first_half() {
        let text = format!("a {}", "x".repeat(1000));
        let out = truncate_to_token_budget(&text, 100);
        assert_eq!(char_len(&out), 400);
        assert!(out.starts_with("a x"));
    }

    #[test]
    fn test_truncate_leading_whitespace_keeps_text() {
        let text = format!(" {}", "x".repeat(1000));
        let out = truncate_to_token_budget(&text, 100);
        assert_eq!(out, "x".repeat(399));
    }

    #[test]
    fn test_truncate_hard_cut_without_boundaries() {
        let out = truncate_to_token_budget(&"x".repeat(100), 2);
        assert_eq!(out, "x".repeat(8));
    }

    #[test]
    fn test_truncate_multibyte() {
        let text = "ü".repeat(50);
        let out = truncate_to_token_budget(&text, 3);
        assert_eq!(char_len(&out), 12);
    }
}
