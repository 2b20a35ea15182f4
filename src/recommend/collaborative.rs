//! User-based collaborative filtering.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::recommend::candidate::{RankedRecommendationList, RecommendationCandidate, RecommendationSource};
use crate::recommend::matrix::UserItemMatrix;
use crate::recommend::popularity::PopularityFallback;
use crate::simd;

/// Rationale attached to collaborative candidates.
pub const COLLABORATIVE_RATIONALE: &str = "customers with similar purchases also bought this";

/// Scores unseen items from the purchases of the most similar users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollaborativeRecommender {
    matrix: UserItemMatrix,
    neighbors: usize,
}

impl CollaborativeRecommender {
    /// Create a recommender over `matrix` using `neighbors` similar users.
    pub fn new(matrix: UserItemMatrix, neighbors: usize) -> Self {
        Self { matrix, neighbors }
    }

    /// Interaction matrix.
    pub fn matrix(&self) -> &UserItemMatrix {
        &self.matrix
    }

    /// Cosine similarity of two users' rows; `None` if either is unknown.
    pub fn user_similarity(&self, a: &str, b: &str) -> Option<f64> {
        let row_a = self.matrix.dense_row(a)?;
        let row_b = self.matrix.dense_row(b)?;
        Some(simd::cosine(&row_a, &row_b))
    }

    /// The most similar other users, best first, ties by user id.
    ///
    /// # Errors
    /// `UnknownEntity` when the user has no row.
    pub fn nearest_users(&self, user_id: &str) -> Result<Vec<(String, f64)>> {
        let target = self.matrix.dense_row(user_id).ok_or_else(|| EngineError::UnknownEntity {
            kind: "user",
            id: user_id.to_string(),
        })?;

        let mut scored: Vec<(String, f64)> = self
            .matrix
            .users()
            .filter(|u| *u != user_id)
            .filter_map(|u| {
                let row = self.matrix.dense_row(u)?;
                Some((u.to_string(), simd::cosine(&target, &row)))
            })
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        scored.truncate(self.neighbors);
        Ok(scored)
    }

    /// Collaborative ranking without fallback.
    ///
    /// Every item the user has not bought is scored as the similarity
    /// weighted mean quantity over neighbors who bought it; items no
    /// neighbor bought are skipped.
    ///
    /// # Errors
    /// `UnknownEntity` when the user is unknown or has an all-zero row.
    pub fn try_recommend(&self, user_id: &str, k: usize) -> Result<RankedRecommendationList> {
        let unknown = || EngineError::UnknownEntity {
            kind: "user",
            id: user_id.to_string(),
        };
        let row = self.matrix.user_row(user_id).ok_or_else(unknown)?;
        if row.values().all(|q| *q == 0.0) {
            return Err(unknown());
        }

        let neighbors = self.nearest_users(user_id)?;
        let candidates = self
            .matrix
            .items()
            .filter(|item| row.get(*item).copied().unwrap_or(0.0) == 0.0)
            .filter_map(|item| {
                let (weighted, similarity_sum) = neighbors
                    .iter()
                    .map(|(u, sim)| (sim, self.matrix.get(u, item)))
                    .filter(|(_, q)| *q > 0.0)
                    .fold((0.0, 0.0), |(w, s), (sim, q)| (w + sim * q, s + sim));
                (similarity_sum > 0.0).then(|| {
                    RecommendationCandidate::new(
                        item,
                        weighted / similarity_sum,
                        COLLABORATIVE_RATIONALE,
                        RecommendationSource::Collaborative,
                    )
                })
            })
            .collect();

        Ok(RankedRecommendationList::from_candidates(candidates, k))
    }

    /// Collaborative ranking; unknown users get the popularity ranking.
    pub fn recommend(&self, user_id: &str, k: usize) -> RankedRecommendationList {
        match self.try_recommend(user_id, k) {
            Ok(list) => list,
            Err(err) => {
                debug!(user_id, error = %err, "falling back to popularity");
                PopularityFallback::new().recommend(&self.matrix, k)
            }
        }
    }
}
