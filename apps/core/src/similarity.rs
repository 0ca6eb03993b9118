//! Approximate string matching used by the ranking engine.
//!
//! A [`TextSimilarity`] returns a dissimilarity in `[0.0, 1.0]` where `0.0` is
//! a perfect match and `1.0` means nothing in common. Empty fields always score
//! `1.0` against a non-empty pattern, and so does a pattern with no searchable
//! characters left after normalization.

use crate::model::normalize_for_search;

pub trait TextSimilarity: Send + Sync {
    fn dissimilarity(&self, pattern: &str, text: &str) -> f64;
}

/// Minimum edit distance of the pattern against any substring of the text,
/// divided by the pattern length. Location of the match does not matter, so
/// "reort" against "Q4 Report" costs a single edit.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApproximateSubstring;

impl TextSimilarity for ApproximateSubstring {
    fn dissimilarity(&self, pattern: &str, text: &str) -> f64 {
        let normalized: Vec<char> = normalize_for_search(pattern).chars().collect();
        if normalized.is_empty() {
            return unsearchable_pattern(pattern);
        }
        let pattern = normalized;
        let text: Vec<char> = normalize_for_search(text).chars().collect();
        let errors = best_substring_distance(&pattern, &text);
        (errors as f64 / pattern.len() as f64).min(1.0)
    }
}

/// Whole-field normalized Levenshtein distance. Stricter than
/// [`ApproximateSubstring`]: partial matches against long fields score poorly.
#[derive(Debug, Clone, Copy, Default)]
pub struct WholeFieldLevenshtein;

impl TextSimilarity for WholeFieldLevenshtein {
    fn dissimilarity(&self, pattern: &str, text: &str) -> f64 {
        let normalized = normalize_for_search(pattern);
        if normalized.is_empty() {
            return unsearchable_pattern(pattern);
        }
        let pattern = normalized;
        let text = normalize_for_search(text);
        if text.is_empty() {
            return 1.0;
        }
        (1.0 - strsim::normalized_levenshtein(&pattern, &text)).clamp(0.0, 1.0)
    }
}

// Blank patterns match anything; punctuation-only patterns match nothing.
fn unsearchable_pattern(raw: &str) -> f64 {
    if raw.trim().is_empty() {
        0.0
    } else {
        1.0
    }
}

fn best_substring_distance(pattern: &[char], text: &[char]) -> usize {
    // column[i] = cost of matching pattern[..i] ending at the current text position
    let mut column: Vec<usize> = (0..=pattern.len()).collect();
    let mut best = pattern.len();

    for &text_char in text {
        let mut diagonal = column[0];
        column[0] = 0;
        for (i, &pattern_char) in pattern.iter().enumerate() {
            let above = column[i + 1];
            let substitution = diagonal + usize::from(pattern_char != text_char);
            column[i + 1] = substitution.min(above + 1).min(column[i] + 1);
            diagonal = above;
        }
        best = best.min(column[pattern.len()]);
        if best == 0 {
            break;
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::{ApproximateSubstring, TextSimilarity, WholeFieldLevenshtein};

    #[test]
    fn exact_substring_is_a_perfect_match() {
        let matcher = ApproximateSubstring;
        assert_eq!(matcher.dissimilarity("report", "Quarterly Report"), 0.0);
    }

    #[test]
    fn single_typo_costs_one_edit_over_pattern_length() {
        let matcher = ApproximateSubstring;
        let score = matcher.dissimilarity("reort", "Q4_Report.xlsx");
        assert!((score - 0.2).abs() < 1e-9, "score was {score}");
    }

    #[test]
    fn empty_text_never_matches() {
        let matcher = ApproximateSubstring;
        assert_eq!(matcher.dissimilarity("mail", ""), 1.0);
        assert_eq!(WholeFieldLevenshtein.dissimilarity("mail", ""), 1.0);
    }

    #[test]
    fn unrelated_text_scores_near_one() {
        let matcher = ApproximateSubstring;
        assert!(matcher.dissimilarity("zzzz", "abc") >= 0.75);
    }

    #[test]
    fn punctuation_only_pattern_matches_nothing() {
        assert_eq!(ApproximateSubstring.dissimilarity("!!!", "Alpha 1"), 1.0);
        assert_eq!(WholeFieldLevenshtein.dissimilarity("-", "Alpha 1"), 1.0);
        assert_eq!(ApproximateSubstring.dissimilarity("", "Alpha 1"), 0.0);
    }

    #[test]
    fn whole_field_levenshtein_penalizes_partial_fields() {
        let strict = WholeFieldLevenshtein;
        let loose = ApproximateSubstring;
        let text = "Weekly status update template";
        assert!(strict.dissimilarity("status", text) > loose.dissimilarity("status", text));
        assert_eq!(strict.dissimilarity("Status", "status"), 0.0);
    }
}
