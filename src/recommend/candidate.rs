//! Recommendation candidates and ranked lists.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Recommender that proposed a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationSource {
    /// Similar customers bought it.
    Collaborative,
    /// Its text resembles the current product.
    Content,
    /// It sells well overall.
    Popularity,
}

/// A scored product proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationCandidate {
    /// Recommended product.
    pub product_id: String,
    /// Ranking score; higher is better.
    pub score: f64,
    /// Human readable reason.
    pub rationale: String,
    /// Recommenders that contributed, without duplicates.
    pub sources: Vec<RecommendationSource>,
}

impl RecommendationCandidate {
    /// Create a candidate from a single source.
    pub fn new(
        product_id: impl Into<String>,
        score: f64,
        rationale: impl Into<String>,
        source: RecommendationSource,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            score,
            rationale: rationale.into(),
            sources: vec![source],
        }
    }
}

fn by_rank(a: &RecommendationCandidate, b: &RecommendationCandidate) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.product_id.cmp(&b.product_id))
}

/// Candidates sorted by score, highest first, ties by product id.
///
/// Each product appears once; construction drops non-finite scores and
/// keeps at most `k` entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankedRecommendationList {
    items: Vec<RecommendationCandidate>,
}

impl RankedRecommendationList {
    /// Rank, deduplicate and truncate.
    ///
    /// For a repeated product the highest-ranked entry is kept.
    pub fn from_candidates(candidates: Vec<RecommendationCandidate>, k: usize) -> Self {
        let mut items: Vec<RecommendationCandidate> =
            candidates.into_iter().filter(|c| c.score.is_finite()).collect();
        items.sort_by(by_rank);

        let mut seen = BTreeSet::new();
        items.retain(|c| seen.insert(c.product_id.clone()));
        items.truncate(k);
        Self { items }
    }

    /// Ranked candidates.
    pub fn items(&self) -> &[RecommendationCandidate] {
        &self.items
    }

    /// Number of candidates.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when nothing was recommended.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Product ids in rank order.
    pub fn product_ids(&self) -> Vec<&str> {
        self.items.iter().map(|c| c.product_id.as_str()).collect()
    }

    /// Iterate in rank order.
    pub fn iter(&self) -> std::slice::Iter<'_, RecommendationCandidate> {
        self.items.iter()
    }

    /// Consume the list.
    pub fn into_vec(self) -> Vec<RecommendationCandidate> {
        self.items
    }
}

impl IntoIterator for RankedRecommendationList {
    type Item = RecommendationCandidate;
    type IntoIter = std::vec::IntoIter<RecommendationCandidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
