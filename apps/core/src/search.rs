use std::cmp::Ordering;

use crate::model::{normalize_for_search, Candidate, RankedEntry};
use crate::similarity::{ApproximateSubstring, TextSimilarity};

pub const DEFAULT_LIMIT: usize = 10;
pub const DEFAULT_THRESHOLD: f64 = 0.3;
pub const DEFAULT_TIE_EPSILON: f64 = 0.01;

const NAME_WEIGHT: f64 = 0.6;
const TAGS_WEIGHT: f64 = 0.3;
const CATEGORY_WEIGHT: f64 = 0.1;
const MIN_FIELD_SCORE: f64 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankOptions {
    pub limit: usize,
    pub threshold: f64,
    pub tie_epsilon: f64,
}

impl Default for RankOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            threshold: DEFAULT_THRESHOLD,
            tie_epsilon: DEFAULT_TIE_EPSILON,
        }
    }
}

/// Ranks with the default matcher and options.
pub fn rank(candidates: &[Candidate], query: &str) -> Vec<RankedEntry> {
    rank_with(candidates, query, &ApproximateSubstring, RankOptions::default())
}

/// A blank query yields the default view. A query with nothing searchable
/// left after normalization (only punctuation or symbols) yields no entries.
pub fn rank_with(
    candidates: &[Candidate],
    query: &str,
    matcher: &dyn TextSimilarity,
    options: RankOptions,
) -> Vec<RankedEntry> {
    if options.limit == 0 || candidates.is_empty() {
        return Vec::new();
    }

    let query = query.trim();
    if query.is_empty() {
        return default_view(candidates, options.limit);
    }
    if normalize_for_search(query).is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(f64, &Candidate)> = candidates
        .iter()
        .filter_map(|candidate| {
            score_candidate(candidate, query, matcher, options.threshold)
                .map(|score| (score, candidate))
        })
        .collect();

    scored.sort_by(|a, b| {
        a.0.total_cmp(&b.0)
            .then_with(|| compare_recency_then_id(a.1, b.1))
    });
    group_near_ties(&mut scored, options.tie_epsilon);

    scored
        .into_iter()
        .take(options.limit)
        .map(|(score, candidate)| RankedEntry {
            candidate: candidate.clone(),
            score: Some(score),
        })
        .collect()
}

/// The unranked view shown for an empty query: most used first.
pub fn default_view(candidates: &[Candidate], limit: usize) -> Vec<RankedEntry> {
    let mut ordered: Vec<&Candidate> = candidates.iter().collect();
    ordered.sort_by(|a, b| compare_by_usage(a, b));
    ordered
        .into_iter()
        .take(limit)
        .map(|candidate| RankedEntry::unscored(candidate.clone()))
        .collect()
}

/// Global order shared by the empty-query list and the paged grid:
/// usage count desc, last use desc, id asc.
pub fn compare_by_usage(a: &Candidate, b: &Candidate) -> Ordering {
    b.usage_count
        .cmp(&a.usage_count)
        .then_with(|| compare_recency_then_id(a, b))
}

pub fn compare_recency_then_id(a: &Candidate, b: &Candidate) -> Ordering {
    b.recency().cmp(&a.recency()).then_with(|| a.id.cmp(&b.id))
}

fn score_candidate(
    candidate: &Candidate,
    query: &str,
    matcher: &dyn TextSimilarity,
    threshold: f64,
) -> Option<f64> {
    let name = matcher.dissimilarity(query, &candidate.name);
    let tags = candidate
        .tags
        .iter()
        .map(|tag| matcher.dissimilarity(query, tag))
        .min_by(f64::total_cmp)
        .unwrap_or(1.0);
    let category = candidate
        .category
        .as_deref()
        .map(|category| matcher.dissimilarity(query, category))
        .unwrap_or(1.0);

    let mut score = 1.0;
    let mut matched = false;
    for (dissimilarity, weight) in [
        (name, NAME_WEIGHT),
        (tags, TAGS_WEIGHT),
        (category, CATEGORY_WEIGHT),
    ] {
        if dissimilarity <= threshold {
            matched = true;
            score *= dissimilarity.max(MIN_FIELD_SCORE).powf(weight);
        }
    }

    matched.then_some(score)
}

// Scores within `epsilon` of the first entry of a run count as equal and are
// reordered by recency then id. Every pair inside a run is within `epsilon`.
fn group_near_ties(scored: &mut [(f64, &Candidate)], epsilon: f64) {
    let mut start = 0;
    while start < scored.len() {
        let anchor = scored[start].0;
        let mut end = start + 1;
        while end < scored.len() && scored[end].0 - anchor <= epsilon {
            end += 1;
        }
        scored[start..end].sort_by(|a, b| compare_recency_then_id(a.1, b.1));
        start = end;
    }
}
