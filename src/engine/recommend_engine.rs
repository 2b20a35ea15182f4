//! Recommendation engine over an atomically swapped snapshot.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use tracing::{debug, info};

use crate::config::{EngineConfig, RecommendConfig};
use crate::engine::pool::{BatchOutcome, WorkerPool};
use crate::error::{EngineError, Result};
use crate::recommend::{
    CatalogItem, CollaborativeRecommender, ContentRecommender, HybridBlender, InteractionRecord,
    ItemFeatureIndex, PopularityFallback, RankedRecommendationList, UserItemMatrix,
};

/// Key of the collaborative blob in an exported snapshot.
pub const COLLABORATIVE_STATE_KEY: &str = "collaborative";
/// Key of the content blob in an exported snapshot.
pub const CONTENT_STATE_KEY: &str = "content";

/// One user of a batch recommendation.
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendRequest {
    /// User to recommend for.
    pub user_id: String,
    /// Product being viewed, if any.
    pub current_product_id: Option<String>,
    /// Number of recommendations.
    pub k: usize,
}

impl RecommendRequest {
    /// Request without a current product.
    pub fn new(user_id: impl Into<String>, k: usize) -> Self {
        Self {
            user_id: user_id.into(),
            current_product_id: None,
            k,
        }
    }

    /// Add the product being viewed.
    pub fn with_current_product(mut self, product_id: impl Into<String>) -> Self {
        self.current_product_id = Some(product_id.into());
        self
    }
}

/// Immutable matrix plus index; replaced as a whole on retrain.
#[derive(Debug)]
struct Snapshot {
    collaborative: CollaborativeRecommender,
    content: ContentRecommender,
}

impl Snapshot {
    fn build(config: &RecommendConfig, interactions: &[InteractionRecord], catalog: &[CatalogItem]) -> Self {
        let matrix = UserItemMatrix::from_records(interactions, config.aggregation);
        let index = ItemFeatureIndex::build(catalog, config.max_features);
        Self {
            collaborative: CollaborativeRecommender::new(matrix, config.neighbors),
            content: ContentRecommender::new(index),
        }
    }

    fn recommend(
        &self,
        blender: &HybridBlender,
        user_id: &str,
        current_product_id: Option<&str>,
        k: usize,
    ) -> RankedRecommendationList {
        if k == 0 {
            return RankedRecommendationList::default();
        }
        let collaborative = self.collaborative.recommend(user_id, k);
        let content = current_product_id.map(|id| self.content.similar(id, k));
        blender.blend(&collaborative, content.as_ref(), k)
    }
}

/// Hybrid recommendations for a catalog.
///
/// Readers clone the current snapshot and work without holding the lock;
/// [`retrain`](Self::retrain) builds the replacement first and publishes it
/// with a single pointer swap.
#[derive(Debug)]
pub struct RecommendationEngine {
    config: RecommendConfig,
    workers: usize,
    blender: HybridBlender,
    snapshot: RwLock<Arc<Snapshot>>,
    pool: OnceLock<WorkerPool>,
}

impl RecommendationEngine {
    /// Engine with an empty snapshot.
    ///
    /// # Errors
    /// `Config` when the configuration fails validation.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let empty = Snapshot::build(&config.recommend, &[], &[]);
        Ok(Self {
            blender: HybridBlender::new(config.recommend.weights),
            config: config.recommend,
            workers: config.workers,
            snapshot: RwLock::new(Arc::new(empty)),
            pool: OnceLock::new(),
        })
    }

    /// Engine trained on the given data.
    pub fn build(config: EngineConfig, interactions: &[InteractionRecord], catalog: &[CatalogItem]) -> Result<Self> {
        let engine = Self::new(config)?;
        engine.retrain(interactions, catalog);
        Ok(engine)
    }

    /// Recommendation configuration.
    pub fn config(&self) -> &RecommendConfig {
        &self.config
    }

    fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn publish(&self, snapshot: Snapshot) {
        let snapshot = Arc::new(snapshot);
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = snapshot;
    }

    fn pool(&self) -> Result<&WorkerPool> {
        if let Some(pool) = self.pool.get() {
            return Ok(pool);
        }
        let built = WorkerPool::new(self.workers)?;
        Ok(self.pool.get_or_init(|| built))
    }

    /// Rebuild matrix and index, then swap them in.
    ///
    /// Calls in flight keep the snapshot they started with.
    pub fn retrain(&self, interactions: &[InteractionRecord], catalog: &[CatalogItem]) {
        let snapshot = Snapshot::build(&self.config, interactions, catalog);
        let matrix = snapshot.collaborative.matrix();
        info!(
            users = matrix.n_users(),
            items = matrix.n_items(),
            indexed = snapshot.content.index().len(),
            "recommendation snapshot rebuilt"
        );
        self.publish(snapshot);
    }

    /// Users and products in the current matrix, and catalog items indexed.
    pub fn stats(&self) -> (usize, usize, usize) {
        let snapshot = self.snapshot();
        let matrix = snapshot.collaborative.matrix();
        (matrix.n_users(), matrix.n_items(), snapshot.content.index().len())
    }

    /// Top `k` products for a user, blended with items similar to the
    /// product being viewed. Unknown users get the most popular products.
    pub fn recommend(&self, user_id: &str, current_product_id: Option<&str>, k: usize) -> RankedRecommendationList {
        let list = self.snapshot().recommend(&self.blender, user_id, current_product_id, k);
        debug!(user_id, current_product_id, returned = list.len(), "recommendations served");
        list
    }

    /// Catalog items most similar to a product; empty for unknown ids.
    pub fn similar(&self, product_id: &str, k: usize) -> RankedRecommendationList {
        self.snapshot().content.similar(product_id, k)
    }

    /// Most interacted-with products.
    pub fn popular(&self, k: usize) -> RankedRecommendationList {
        PopularityFallback::new().recommend(self.snapshot().collaborative.matrix(), k)
    }

    /// Recommend for many users on the worker pool against one snapshot.
    pub fn recommend_batch(
        &self,
        requests: Vec<RecommendRequest>,
    ) -> Result<Vec<BatchOutcome<String, RankedRecommendationList>>> {
        let pool = self.pool()?;
        let snapshot = self.snapshot();
        Ok(pool.run(
            requests,
            |r| r.user_id.clone(),
            |r| Ok(snapshot.recommend(&self.blender, &r.user_id, r.current_product_id.as_deref(), r.k)),
        ))
    }

    /// Serialize the current snapshot.
    pub fn export_state(&self) -> Result<BTreeMap<String, Vec<u8>>> {
        let snapshot = self.snapshot();
        let mut state = BTreeMap::new();
        state.insert(
            COLLABORATIVE_STATE_KEY.to_string(),
            serde_json::to_vec(&snapshot.collaborative)?,
        );
        state.insert(CONTENT_STATE_KEY.to_string(), serde_json::to_vec(&snapshot.content)?);
        Ok(state)
    }

    /// Replace the snapshot with an exported one.
    ///
    /// # Errors
    /// `Serialization` for a missing or malformed blob; the current
    /// snapshot is kept in that case.
    pub fn import_state(&self, state: &BTreeMap<String, Vec<u8>>) -> Result<()> {
        let blob = |key: &str| {
            state
                .get(key)
                .ok_or_else(|| EngineError::Serialization(format!("missing '{key}' state")))
        };
        let collaborative: CollaborativeRecommender = serde_json::from_slice(blob(COLLABORATIVE_STATE_KEY)?)?;
        let content: ContentRecommender = serde_json::from_slice(blob(CONTENT_STATE_KEY)?)?;
        self.publish(Snapshot {
            collaborative,
            content,
        });
        Ok(())
    }
}

/// One-shot hybrid recommendation with the default configuration.
pub(crate) fn recommend_once(
    user_id: &str,
    interactions: &[InteractionRecord],
    catalog: &[CatalogItem],
    current_product_id: Option<&str>,
    k: usize,
) -> RankedRecommendationList {
    let config = RecommendConfig::default();
    let blender = HybridBlender::new(config.weights);
    Snapshot::build(&config, interactions, catalog).recommend(&blender, user_id, current_product_id, k)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recommend::{RecommendationSource, POPULARITY_RATIONALE};

    fn interactions() -> Vec<InteractionRecord> {
        vec![
            InteractionRecord::new("alice", "tea", 2.0),
            InteractionRecord::new("alice", "mug", 1.0),
            InteractionRecord::new("bob", "tea", 3.0),
            InteractionRecord::new("bob", "mug", 1.0),
            InteractionRecord::new("bob", "kettle", 1.0),
            InteractionRecord::new("carol", "coffee", 5.0),
            InteractionRecord::new("carol", "grinder", 1.0),
        ]
    }

    fn catalog() -> Vec<CatalogItem> {
        vec![
            CatalogItem::new("tea", "Green tea", "Loose leaf green tea from Japan"),
            CatalogItem::new("mug", "Ceramic mug", "Large ceramic mug for tea or coffee"),
            CatalogItem::new("kettle", "Electric kettle", "Fast kettle to boil water for tea"),
            CatalogItem::new("coffee", "Coffee beans", "Dark roast coffee beans"),
            CatalogItem::new("grinder", "Coffee grinder", "Burr grinder for coffee beans"),
        ]
    }

    fn engine() -> RecommendationEngine {
        let mut config = EngineConfig::default();
        config.workers = 2;
        RecommendationEngine::build(config, &interactions(), &catalog()).unwrap()
    }

    #[test]
    fn known_user_gets_neighbor_items() {
        let list = engine().recommend("alice", None, 3);
        assert_eq!(list.product_ids()[0], "kettle");
        assert!(list.iter().all(|c| c.product_id != "tea" && c.product_id != "mug"));
    }

    #[test]
    fn cold_user_gets_popular_items() {
        let engine = engine();
        let list = engine.recommend("U1", None, 3);
        assert_eq!(list, engine.popular(3));
        assert_eq!(list.items()[0].rationale, POPULARITY_RATIONALE);
    }

    #[test]
    fn current_product_adds_content_candidates() {
        let list = engine().recommend("alice", Some("coffee"), 5);
        let grinder = list.iter().find(|c| c.product_id == "grinder").unwrap();
        assert!(grinder.sources.contains(&RecommendationSource::Content));
    }

    #[test]
    fn zero_k_is_empty() {
        assert!(engine().recommend("alice", Some("tea"), 0).is_empty());
    }

    #[test]
    fn retrain_swaps_snapshot() {
        let engine = engine();
        assert_eq!(engine.stats(), (3, 5, 5));
        engine.retrain(&[InteractionRecord::new("dave", "tea", 1.0)], &[]);
        assert_eq!(engine.stats(), (1, 1, 0));
        assert!(engine.similar("tea", 3).is_empty());
    }

    #[test]
    fn state_round_trip() {
        let source = engine();
        let state = source.export_state().unwrap();
        assert_eq!(state.len(), 2);

        let target = RecommendationEngine::new(EngineConfig::default()).unwrap();
        target.import_state(&state).unwrap();
        assert_eq!(target.recommend("bob", Some("tea"), 4), source.recommend("bob", Some("tea"), 4));

        let mut broken = state.clone();
        broken.remove(CONTENT_STATE_KEY);
        assert!(matches!(target.import_state(&broken), Err(EngineError::Serialization(_))));
        assert_eq!(target.stats(), source.stats());
    }

    #[test]
    fn batch_matches_single_calls() {
        let engine = engine();
        let requests = vec![
            RecommendRequest::new("alice", 2),
            RecommendRequest::new("nobody", 2).with_current_product("mug"),
        ];
        let outcomes = engine.recommend_batch(requests).unwrap();
        assert_eq!(outcomes[0].key, "alice");
        assert_eq!(outcomes[0].result, Ok(engine.recommend("alice", None, 2)));
        assert_eq!(outcomes[1].result, Ok(engine.recommend("nobody", Some("mug"), 2)));
    }

    #[test]
    fn one_shot_matches_engine() {
        let engine = engine();
        let once = recommend_once("bob", &interactions(), &catalog(), Some("coffee"), 3);
        assert_eq!(once, engine.recommend("bob", Some("coffee"), 3));
    }
}
