//! End-to-end recommendation scenarios through the public API.

use std::sync::Arc;
use std::thread;

use anofox_retail::config::EngineConfig;
use anofox_retail::engine::{RecommendRequest, RecommendationEngine};
use anofox_retail::recommend::{
    Aggregation, CatalogItem, InteractionRecord, PopularityFallback, RecommendationSource, UserItemMatrix,
    COLLABORATIVE_RATIONALE, CONTENT_RATIONALE,
};
use approx::assert_relative_eq;

fn interactions() -> Vec<InteractionRecord> {
    vec![
        InteractionRecord::new("u1", "p1", 2.0),
        InteractionRecord::new("u1", "p2", 1.0),
        InteractionRecord::new("u2", "p1", 2.0),
        InteractionRecord::new("u2", "p2", 1.0),
        InteractionRecord::new("u2", "p3", 4.0),
        InteractionRecord::new("u3", "p1", 1.0),
        InteractionRecord::new("u3", "p4", 2.0),
        InteractionRecord::new("u4", "p5", 6.0),
    ]
}

fn catalog() -> Vec<CatalogItem> {
    vec![
        CatalogItem::new("p1", "Running shoes", "Lightweight running shoes for road races"),
        CatalogItem::new("p2", "Running socks", "Breathable socks for running"),
        CatalogItem::new("p3", "Trail shoes", "Grippy trail shoes for mountain running"),
        CatalogItem::new("p4", "Water bottle", "Insulated steel water bottle"),
        CatalogItem::new("p5", "Yoga mat", "Thick yoga mat with carry strap").with_category("fitness"),
    ]
}

fn engine() -> RecommendationEngine {
    RecommendationEngine::build(EngineConfig::default(), &interactions(), &catalog()).unwrap()
}

#[test]
fn unknown_user_equals_popularity() {
    let matrix = UserItemMatrix::from_records(&interactions(), Aggregation::Mean);
    let expected = PopularityFallback::new().recommend(&matrix, 3);

    let list = anofox_retail::recommend("U1", &interactions(), &catalog(), None, 3);
    assert_eq!(list, expected);
    assert_eq!(list.product_ids(), vec!["p5", "p1", "p3"]);
}

#[test]
fn unknown_user_with_current_product_adds_weighted_content() {
    let engine = engine();
    let popular = engine.popular(10);
    let similar = engine.similar("p1", 10);
    let hybrid = engine.recommend("ghost", Some("p1"), 10);

    assert_eq!(hybrid.len(), 5);
    for candidate in hybrid.iter() {
        let total = popular
            .iter()
            .find(|c| c.product_id == candidate.product_id)
            .map_or(0.0, |c| c.score);
        let sim = similar
            .iter()
            .find(|c| c.product_id == candidate.product_id)
            .map_or(0.0, |c| c.score);
        assert_relative_eq!(candidate.score, total + 0.3 * sim, epsilon = 1e-12);
    }

    let p3 = hybrid.iter().find(|c| c.product_id == "p3").unwrap();
    assert!(p3.sources.contains(&RecommendationSource::Popularity));
    assert!(p3.sources.contains(&RecommendationSource::Content));
}

#[test]
fn similar_unknown_is_empty() {
    assert!(engine().similar("missing", 5).is_empty());
}

#[test]
fn similar_excludes_the_product() {
    let list = engine().similar("p1", 10);
    assert_eq!(list.len(), 4);
    assert!(list.iter().all(|c| c.product_id != "p1"));
    assert!(list.iter().all(|c| c.rationale == CONTENT_RATIONALE));
    let top: Vec<&str> = list.product_ids().into_iter().take(2).collect();
    assert!(top.contains(&"p2") && top.contains(&"p3"));
}

#[test]
fn hybrid_score_is_weighted_sum() {
    let engine = engine();
    let collaborative = engine.recommend("u1", None, 10);
    let content = engine.similar("p1", 10);
    let hybrid = engine.recommend("u1", Some("p1"), 10);

    let collab_p3 = collaborative.iter().find(|c| c.product_id == "p3").unwrap().score / 0.7;
    let content_p3 = content.iter().find(|c| c.product_id == "p3").unwrap().score;
    let p3 = hybrid.iter().find(|c| c.product_id == "p3").unwrap();

    assert_relative_eq!(p3.score, 0.7 * collab_p3 + 0.3 * content_p3, epsilon = 1e-12);
    assert_eq!(p3.rationale, format!("{COLLABORATIVE_RATIONALE} and {CONTENT_RATIONALE}"));
    assert!(p3.sources.contains(&RecommendationSource::Collaborative));
    assert!(p3.sources.contains(&RecommendationSource::Content));

    let p2 = hybrid.iter().find(|c| c.product_id == "p2").unwrap();
    let content_p2 = content.iter().find(|c| c.product_id == "p2").unwrap().score;
    assert_relative_eq!(p2.score, 0.3 * content_p2, epsilon = 1e-12);
}

#[test]
fn results_are_sorted_and_bounded() {
    let list = engine().recommend("u3", Some("p4"), 3);
    assert!(list.len() <= 3);
    let scores: Vec<f64> = list.iter().map(|c| c.score).collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
}

#[test]
fn retrain_is_visible_to_later_calls() {
    let engine = Arc::new(engine());
    assert_eq!(engine.popular(1).product_ids(), vec!["p5"]);

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for _ in 0..50 {
                    let list = engine.recommend("u1", Some("p1"), 3);
                    assert!(list.len() <= 3);
                }
            })
        })
        .collect();

    let mut fresh = interactions();
    fresh.push(InteractionRecord::new("u5", "p4", 50.0));
    engine.retrain(&fresh, &catalog());
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(engine.popular(1).product_ids(), vec!["p4"]);
}

#[test]
fn batch_uses_one_snapshot() {
    let engine = engine();
    let requests = vec![
        RecommendRequest::new("u1", 2),
        RecommendRequest::new("ghost", 2),
        RecommendRequest::new("u2", 2).with_current_product("p4"),
    ];
    let outcomes = engine.recommend_batch(requests).unwrap();
    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes[1].key, "ghost");
    assert_eq!(outcomes[1].result, Ok(engine.popular(2)));
    assert_eq!(outcomes[2].result, Ok(engine.recommend("u2", Some("p4"), 2)));
}

#[test]
fn exported_snapshot_serves_same_results() {
    let source = engine();
    let target = RecommendationEngine::new(EngineConfig::default()).unwrap();
    assert!(target.recommend("u1", None, 3).is_empty());

    target.import_state(&source.export_state().unwrap()).unwrap();
    assert_eq!(target.recommend("u1", Some("p1"), 3), source.recommend("u1", Some("p1"), 3));
}
