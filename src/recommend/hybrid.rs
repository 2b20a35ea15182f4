//! Weighted blend of collaborative and content rankings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::recommend::candidate::{RankedRecommendationList, RecommendationCandidate, RecommendationSource};

/// Blend weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HybridWeights {
    /// Weight of collaborative scores.
    pub collaborative: f64,
    /// Weight of content scores.
    pub content: f64,
}

impl Default for HybridWeights {
    fn default() -> Self {
        Self {
            collaborative: 0.7,
            content: 0.3,
        }
    }
}

/// Merges two rankings into one.
#[derive(Debug, Clone, Copy, Default)]
pub struct HybridBlender {
    weights: HybridWeights,
}

impl HybridBlender {
    /// Create a blender with the given weights.
    pub fn new(weights: HybridWeights) -> Self {
        Self { weights }
    }

    /// Weights in use.
    pub fn weights(&self) -> &HybridWeights {
        &self.weights
    }

    /// Sum weighted scores per product and keep the top `k`.
    ///
    /// Collaborative candidates are scaled by the collaborative weight and
    /// content candidates by the content weight; a product in both lists
    /// gets the sum and both rationales joined with `" and "`. Popularity
    /// candidates, which stand in for collaborative ones when the user is
    /// unknown, keep their score unscaled.
    pub fn blend(
        &self,
        collaborative: &RankedRecommendationList,
        content: Option<&RankedRecommendationList>,
        k: usize,
    ) -> RankedRecommendationList {
        let mut merged: BTreeMap<String, RecommendationCandidate> = BTreeMap::new();

        for candidate in collaborative.iter() {
            let weight = if candidate.sources.contains(&RecommendationSource::Popularity) {
                1.0
            } else {
                self.weights.collaborative
            };
            let mut entry = candidate.clone();
            entry.score *= weight;
            merged.insert(entry.product_id.clone(), entry);
        }

        for candidate in content.into_iter().flat_map(RankedRecommendationList::iter) {
            let score = candidate.score * self.weights.content;
            match merged.get_mut(&candidate.product_id) {
                Some(existing) => {
                    existing.score += score;
                    existing.rationale = format!("{} and {}", existing.rationale, candidate.rationale);
                    for source in &candidate.sources {
                        if !existing.sources.contains(source) {
                            existing.sources.push(*source);
                        }
                    }
                }
                None => {
                    let mut entry = candidate.clone();
                    entry.score = score;
                    merged.insert(entry.product_id.clone(), entry);
                }
            }
        }

        RankedRecommendationList::from_candidates(merged.into_values().collect(), k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn list(source: RecommendationSource, pairs: &[(&str, f64)]) -> RankedRecommendationList {
        RankedRecommendationList::from_candidates(
            pairs
                .iter()
                .map(|(id, s)| RecommendationCandidate::new(*id, *s, format!("{source:?}"), source))
                .collect(),
            10,
        )
    }

    #[test]
    fn scores_add_for_shared_products() {
        let collab = list(RecommendationSource::Collaborative, &[("A", 1.0), ("B", 0.5)]);
        let content = list(RecommendationSource::Content, &[("A", 0.5), ("C", 0.9)]);
        let blended = HybridBlender::default().blend(&collab, Some(&content), 10);

        let a = blended.iter().find(|c| c.product_id == "A").unwrap();
        assert_relative_eq!(a.score, 0.7 * 1.0 + 0.3 * 0.5, epsilon = 1e-12);
        assert_eq!(a.rationale, "Collaborative and Content");
        assert_eq!(
            a.sources,
            vec![RecommendationSource::Collaborative, RecommendationSource::Content]
        );

        let c = blended.iter().find(|c| c.product_id == "C").unwrap();
        assert_relative_eq!(c.score, 0.3 * 0.9, epsilon = 1e-12);
        assert_eq!(blended.product_ids(), vec!["A", "B", "C"]);
    }

    #[test]
    fn collaborative_only_is_scaled() {
        let collab = list(RecommendationSource::Collaborative, &[("A", 2.0)]);
        let blended = HybridBlender::default().blend(&collab, None, 5);
        assert_relative_eq!(blended.items()[0].score, 1.4, epsilon = 1e-12);
    }

    #[test]
    fn popularity_passes_through() {
        let popular = list(RecommendationSource::Popularity, &[("A", 9.0), ("B", 3.0)]);
        let blended = HybridBlender::default().blend(&popular, None, 5);
        assert_eq!(blended, popular);
    }

    #[test]
    fn popularity_keeps_full_score_next_to_content() {
        let popular = list(RecommendationSource::Popularity, &[("A", 9.0), ("B", 3.0)]);
        let content = list(RecommendationSource::Content, &[("B", 0.5), ("C", 0.8)]);
        let blended = HybridBlender::default().blend(&popular, Some(&content), 5);

        let score = |id: &str| blended.iter().find(|c| c.product_id == id).unwrap().score;
        assert_relative_eq!(score("A"), 9.0, epsilon = 1e-12);
        assert_relative_eq!(score("B"), 3.0 + 0.3 * 0.5, epsilon = 1e-12);
        assert_relative_eq!(score("C"), 0.3 * 0.8, epsilon = 1e-12);
        assert_eq!(blended.product_ids(), vec!["A", "B", "C"]);
    }

    #[test]
    fn truncates_to_k() {
        let collab = list(RecommendationSource::Collaborative, &[("A", 3.0), ("B", 2.0), ("C", 1.0)]);
        assert_eq!(HybridBlender::default().blend(&collab, None, 2).len(), 2);
    }
}
