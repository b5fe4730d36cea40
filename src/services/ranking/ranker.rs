//! Exclusion filtering, ordering and truncation of scored candidates.

use std::cmp::Ordering;
use std::collections::HashSet;

/// Fallback when the caller omits `limit` or supplies a non-positive one.
pub const DEFAULT_LIMIT: usize = 10;

/// A candidate post with its predicted like probability.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPost {
    pub post_id: i64,
    pub score: f32,
}

/// Drop already-liked posts, order by probability descending and truncate.
///
/// The sort is stable: ties keep their original candidate order, so identical
/// inputs always produce identical output. NaN scores sink to the end.
pub fn rank(mut scored: Vec<ScoredPost>, excluded: &HashSet<i64>, limit: usize) -> Vec<ScoredPost> {
    scored.retain(|candidate| !excluded.contains(&candidate.post_id));
    scored.sort_by(|a, b| match (a.score.is_nan(), b.score.is_nan()) {
        (false, false) => b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal),
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
    });
    scored.truncate(limit);
    scored
}

/// Normalize a caller-supplied limit: absent or non-positive values fall back
/// to [`DEFAULT_LIMIT`].
pub fn effective_limit(limit: Option<i64>) -> usize {
    match limit {
        Some(n) if n > 0 => n as usize,
        _ => DEFAULT_LIMIT,
    }
}
