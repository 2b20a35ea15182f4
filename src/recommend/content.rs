//! Content-based item similarity over catalog text.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::recommend::candidate::{RankedRecommendationList, RecommendationCandidate, RecommendationSource};
use crate::recommend::tfidf::{SparseVector, TfidfVectorizer};

/// Rationale attached to content candidates.
pub const CONTENT_RATIONALE: &str = "similar to the product you are viewing";

/// Catalog metadata of one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Product id.
    pub product_id: String,
    /// Display name.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// Optional category.
    pub category_id: Option<String>,
}

impl CatalogItem {
    /// Create an item without a category.
    pub fn new(product_id: impl Into<String>, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            name: name.into(),
            description: description.into(),
            category_id: None,
        }
    }

    /// Set the category.
    pub fn with_category(mut self, category_id: impl Into<String>) -> Self {
        self.category_id = Some(category_id.into());
        self
    }

    fn text(&self) -> String {
        format!("{} {}", self.name, self.description)
    }
}

/// TF-IDF vector per product over name and description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemFeatureIndex {
    vectorizer: TfidfVectorizer,
    vectors: BTreeMap<String, SparseVector>,
}

impl ItemFeatureIndex {
    /// Index the catalog.
    ///
    /// When a product id repeats, the last entry wins.
    pub fn build(items: &[CatalogItem], max_features: usize) -> Self {
        let mut latest: BTreeMap<&str, &CatalogItem> = BTreeMap::new();
        for item in items {
            if latest.insert(item.product_id.as_str(), item).is_some() {
                warn!(product_id = %item.product_id, "duplicate catalog entry replaced");
            }
        }

        let texts: Vec<String> = latest.values().map(|item| item.text()).collect();
        let vectorizer = TfidfVectorizer::fit(&texts, max_features);
        let vectors = latest
            .keys()
            .zip(&texts)
            .map(|(id, text)| (id.to_string(), vectorizer.transform(text)))
            .collect();

        Self { vectorizer, vectors }
    }

    /// Number of indexed products.
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// True when the catalog was empty.
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Vector of one product.
    pub fn get(&self, product_id: &str) -> Option<&SparseVector> {
        self.vectors.get(product_id)
    }

    /// Learned vocabulary and idf weights.
    pub fn vectorizer(&self) -> &TfidfVectorizer {
        &self.vectorizer
    }
}

/// Nearest products by cosine similarity of their TF-IDF vectors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentRecommender {
    index: ItemFeatureIndex,
}

impl ContentRecommender {
    /// Create a recommender over an index.
    pub fn new(index: ItemFeatureIndex) -> Self {
        Self { index }
    }

    /// Underlying index.
    pub fn index(&self) -> &ItemFeatureIndex {
        &self.index
    }

    /// Cosine similarity of two products; `None` if either is unknown.
    pub fn similarity(&self, a: &str, b: &str) -> Option<f64> {
        Some(self.index.get(a)?.cosine(self.index.get(b)?))
    }

    /// The `k` products most similar to `product_id`, itself excluded.
    ///
    /// An unknown product yields an empty list.
    pub fn similar(&self, product_id: &str, k: usize) -> RankedRecommendationList {
        let Some(target) = self.index.get(product_id) else {
            return RankedRecommendationList::default();
        };
        let candidates = self
            .index
            .vectors
            .iter()
            .filter(|(id, _)| id.as_str() != product_id)
            .map(|(id, vector)| {
                RecommendationCandidate::new(
                    id.clone(),
                    target.cosine(vector),
                    CONTENT_RATIONALE,
                    RecommendationSource::Content,
                )
            })
            .collect();
        RankedRecommendationList::from_candidates(candidates, k)
    }
}
