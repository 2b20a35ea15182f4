//! Hybrid product recommendation.
//!
//! This module provides:
//! - the user x item interaction matrix
//! - user-based collaborative filtering with a popularity fallback
//! - TF-IDF content similarity over catalog text
//! - the weighted blend of both rankings

mod candidate;
mod collaborative;
mod content;
mod hybrid;
mod matrix;
mod popularity;
mod stopwords;
mod tfidf;

pub use candidate::{RankedRecommendationList, RecommendationCandidate, RecommendationSource};
pub use collaborative::{CollaborativeRecommender, COLLABORATIVE_RATIONALE};
pub use content::{CatalogItem, ContentRecommender, ItemFeatureIndex, CONTENT_RATIONALE};
pub use hybrid::{HybridBlender, HybridWeights};
pub use matrix::{Aggregation, InteractionRecord, UserItemMatrix};
pub use popularity::{PopularityFallback, POPULARITY_RATIONALE};
pub use stopwords::{is_stop_word, ENGLISH_STOP_WORDS};
pub use tfidf::{tokenize, SparseVector, TfidfVectorizer};
