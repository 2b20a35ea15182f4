//! Global popularity ranking for cold start.

use crate::recommend::candidate::{RankedRecommendationList, RecommendationCandidate, RecommendationSource};
use crate::recommend::matrix::UserItemMatrix;

/// Rationale attached to popularity candidates.
pub const POPULARITY_RATIONALE: &str = "popular across all customers";

/// Ranks items by their total aggregated quantity.
#[derive(Debug, Clone, Copy, Default)]
pub struct PopularityFallback;

impl PopularityFallback {
    /// Create the fallback.
    pub fn new() -> Self {
        Self
    }

    /// Top `k` items of the matrix.
    pub fn recommend(&self, matrix: &UserItemMatrix, k: usize) -> RankedRecommendationList {
        let candidates = matrix
            .item_totals()
            .into_iter()
            .map(|(item, total)| {
                RecommendationCandidate::new(item, total, POPULARITY_RATIONALE, RecommendationSource::Popularity)
            })
            .collect();
        RankedRecommendationList::from_candidates(candidates, k)
    }
}
