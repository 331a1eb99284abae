mod common;

use chrono::Duration;
use common::{engine, engine_with, fixed_now, ids, image, interact};
use feed_ranking::config::RankingConfig;
use feed_ranking::models::{RankingSource, Signal};
use feed_ranking::store::StoreOp;
use feed_ranking::{InMemoryStore, RankingError};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration as StdDuration;

const VIEWER: i64 = 1;
const ARTIST: i64 = 2;
const STRANGER: i64 = 3;
const CROWD: i64 = 50;

#[tokio::test]
async fn test_followed_artist_outranks_unfollowed_items() {
    let mut store = InMemoryStore::new();
    store.add_user(VIEWER);
    store.follow(VIEWER, ARTIST);
    store.add_item(image(1, ARTIST, Duration::hours(25), vec![]));
    store.add_item(image(2, STRANGER, Duration::hours(1), vec![]));
    interact(&mut store, CROWD, 2, 5, Duration::hours(1));
    let store = Arc::new(store);

    let feed = engine(&store)
        .recommend_explained(Some(VIEWER), 10, fixed_now())
        .await
        .unwrap();

    let first = &feed.items[0];
    assert_eq!(first.item.id, 1);
    assert!((first.score - (10.0 + 12.0 / 7.0)).abs() < 1e-9);
    assert_eq!(first.breakdown.follow_affinity, 10.0);
    assert_eq!(first.breakdown.tag_affinity, 0.0);
    assert_eq!(first.breakdown.popularity, 0.0);

    let second = &feed.items[1];
    assert_eq!(second.item.id, 2);
    assert!((second.score - 2.5).abs() < 1e-9);
    assert!(first.score > second.score);
}

#[tokio::test]
async fn test_tag_affinity_only_adds_new_candidates() {
    let mut store = InMemoryStore::new();
    store.add_user(VIEWER);
    store.follow(VIEWER, ARTIST);
    // viewer history on tag 100
    store.add_item(image(1, STRANGER, Duration::days(60), vec![100]));
    interact(&mut store, VIEWER, 1, 3, Duration::days(20));
    // followed and tagged: follow affinity only
    store.add_item(image(2, ARTIST, Duration::days(60), vec![100]));
    // tagged only
    store.add_item(image(3, STRANGER, Duration::days(60), vec![100]));
    // untagged, unfollowed
    store.add_item(image(4, STRANGER, Duration::days(60), vec![200]));
    let store = Arc::new(store);

    let feed = engine(&store)
        .recommend_explained(Some(VIEWER), 10, fixed_now())
        .await
        .unwrap();

    let by_id = |id: i64| feed.items.iter().find(|ranked| ranked.item.id == id).unwrap();
    assert_eq!(by_id(2).breakdown.follow_affinity, 10.0);
    assert_eq!(by_id(2).breakdown.tag_affinity, 0.0);
    assert_eq!(by_id(3).breakdown.tag_affinity, 5.0);
    assert_eq!(by_id(1).breakdown.tag_affinity, 5.0);
    // too old for the fallback window and matches no signal
    assert!(feed.items.iter().all(|ranked| ranked.item.id != 4));
    assert_eq!(ids(&feed.clone().into_items()), vec![2, 3, 1]);
}

#[tokio::test]
async fn test_tag_affinity_is_capped_at_limit_after_excluding_follows() {
    let mut store = InMemoryStore::new();
    store.add_user(VIEWER);
    store.follow(VIEWER, ARTIST);
    store.add_item(image(1, STRANGER, Duration::days(90), vec![100]));
    interact(&mut store, VIEWER, 1, 1, Duration::days(60));
    // followed items carry the tag and have the highest ids
    for id in 10..14 {
        store.add_item(image(id, ARTIST, Duration::days(90), vec![100]));
    }
    for id in 2..8 {
        store.add_item(image(id, STRANGER, Duration::days(90), vec![100]));
    }
    let store = Arc::new(store);

    let feed = engine(&store)
        .recommend_explained(Some(VIEWER), 2, fixed_now())
        .await
        .unwrap();

    assert_eq!(feed.stats.follow_candidates, 4);
    assert_eq!(feed.stats.tag_candidates, 2);
    assert_eq!(ids(&feed.into_items()), vec![13, 12]);
}

#[tokio::test]
async fn test_output_is_bounded_by_eligible_items() {
    let mut store = InMemoryStore::new();
    store.add_user(VIEWER);
    for (id, days) in [(1, 1), (2, 3), (3, 10), (4, 15), (5, 20)] {
        store.add_item(image(id, STRANGER, Duration::days(days), vec![]));
    }
    let store = Arc::new(store);

    let feed = engine(&store)
        .recommend_explained(Some(VIEWER), 20, fixed_now())
        .await
        .unwrap();

    assert_eq!(feed.items.len(), 5);
    assert_eq!(feed.stats.ranked_count, 2);
    assert_eq!(feed.stats.fallback_count, 3);
    let unique: HashSet<i64> = feed.items.iter().map(|ranked| ranked.item.id).collect();
    assert_eq!(unique.len(), 5);
    // recency-scored items first, then the pool by recency
    assert_eq!(ids(&feed.into_items()), vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn test_fallback_fills_without_duplicates() {
    let mut store = InMemoryStore::new();
    store.add_user(VIEWER);
    store.follow(VIEWER, ARTIST);
    store.add_item(image(1, ARTIST, Duration::days(100), vec![]));
    for id in 2..=6 {
        store.add_item(image(id, STRANGER, Duration::days(12 + id), vec![]));
    }
    // popular in the pool, also followed
    store.add_item(image(7, ARTIST, Duration::days(10), vec![]));
    interact(&mut store, CROWD, 7, 4, Duration::days(9));
    let store = Arc::new(store);

    let feed = engine(&store)
        .recommend_explained(Some(VIEWER), 4, fixed_now())
        .await
        .unwrap();

    let sources: Vec<RankingSource> = feed.items.iter().map(|ranked| ranked.source).collect();
    assert_eq!(
        sources,
        vec![
            RankingSource::Personalized,
            RankingSource::Personalized,
            RankingSource::Fallback,
            RankingSource::Fallback,
        ]
    );
    assert_eq!(ids(&feed.into_items()), vec![7, 1, 2, 3]);
}

#[tokio::test]
async fn test_anonymous_feed_is_the_pool_prefix() {
    let mut store = InMemoryStore::new();
    for id in 1..=15 {
        store.add_item(image(id, STRANGER, Duration::days(id), vec![]));
    }
    interact(&mut store, CROWD, 9, 3, Duration::days(1));
    interact(&mut store, CROWD, 12, 1, Duration::days(1));
    let store = Arc::new(store);

    let items = engine(&store)
        .recommend_at(None, 10, fixed_now())
        .await
        .unwrap();

    assert_eq!(ids(&items), vec![9, 12, 1, 2, 3, 4, 5, 6, 7, 8]);

    let reads = store.read_counts();
    assert_eq!(reads.social_graph_reads, 0);
    assert_eq!(reads.viewer_interaction_reads, 0);
    assert_eq!(reads.popularity_reads, 0);
    assert_eq!(reads.user_reads, 0);
}

#[tokio::test]
async fn test_limit_above_one_hundred_is_honoured() {
    let mut store = InMemoryStore::new();
    store.add_user(VIEWER);
    for id in 1..=150 {
        store.add_item(image(id, STRANGER, Duration::hours(id), vec![]));
    }
    let store = Arc::new(store);
    let engine = engine(&store);

    let anonymous = engine.recommend_at(None, 120, fixed_now()).await.unwrap();
    assert_eq!(anonymous.len(), 120);
    assert_eq!(ids(&anonymous), (1..=120).collect::<Vec<_>>());

    let personalized = engine
        .recommend_at(Some(VIEWER), 120, fixed_now())
        .await
        .unwrap();
    assert_eq!(personalized.len(), 120);
    let unique: HashSet<i64> = ids(&personalized).into_iter().collect();
    assert_eq!(unique.len(), 120);
}

#[tokio::test]
async fn test_fallback_window_follows_config() {
    let mut store = InMemoryStore::new();
    store.add_item(image(1, STRANGER, Duration::days(1), vec![]));
    store.add_item(image(2, STRANGER, Duration::days(5), vec![]));
    let store = Arc::new(store);
    let config = RankingConfig {
        fallback_window_days: 3,
        ..RankingConfig::default()
    };

    let items = engine_with(&store, config)
        .recommend_at(None, 10, fixed_now())
        .await
        .unwrap();

    assert_eq!(ids(&items), vec![1]);
}

#[tokio::test]
async fn test_unknown_viewer_gets_cold_start_feed() {
    let mut store = InMemoryStore::new();
    store.add_item(image(1, STRANGER, Duration::days(2), vec![]));
    let store = Arc::new(store);

    let feed = engine(&store)
        .recommend_explained(Some(999), 10, fixed_now())
        .await
        .unwrap();

    assert!(feed.stats.cold_start);
    assert_eq!(feed.items.len(), 1);
    assert_eq!(store.read_counts().user_reads, 1);
    assert_eq!(store.read_counts().social_graph_reads, 0);
}

#[tokio::test]
async fn test_slow_collector_contributes_nothing() {
    let mut store = InMemoryStore::new();
    store.add_user(VIEWER);
    store.follow(VIEWER, ARTIST);
    store.add_item(image(1, ARTIST, Duration::days(3), vec![]));
    store.add_item(image(2, STRANGER, Duration::days(1), vec![]));
    store.delay(StoreOp::FollowedIds, StdDuration::from_millis(500));
    let store = Arc::new(store);

    let config = RankingConfig {
        collector_timeout_ms: 20,
        ..RankingConfig::default()
    };
    let feed = engine_with(&store, config)
        .recommend_explained(Some(VIEWER), 10, fixed_now())
        .await
        .unwrap();

    assert_eq!(feed.stats.timed_out, vec![Signal::FollowAffinity]);
    assert_eq!(feed.stats.follow_candidates, 0);
    // recency alone decides the order
    assert_eq!(ids(&feed.into_items()), vec![2, 1]);
}

#[tokio::test]
async fn test_data_source_failure_fails_the_call() {
    let mut store = InMemoryStore::new();
    store.add_user(VIEWER);
    store.add_item(image(1, STRANGER, Duration::days(1), vec![]));
    store.fail_on(StoreOp::InteractionCounts);
    let store = Arc::new(store);

    let result = engine(&store).recommend(Some(VIEWER), 10).await;

    assert!(matches!(result, Err(RankingError::Store(_))));
}

#[tokio::test]
async fn test_custom_weights_change_the_blend() {
    let mut store = InMemoryStore::new();
    store.add_user(VIEWER);
    store.follow(VIEWER, ARTIST);
    store.add_item(image(1, ARTIST, Duration::days(6), vec![]));
    store.add_item(image(2, STRANGER, Duration::hours(2), vec![]));
    interact(&mut store, CROWD, 2, 30, Duration::hours(1));
    let store = Arc::new(store);

    let config = RankingConfig {
        follow_weight: 1.0,
        ..RankingConfig::default()
    };
    let items = engine_with(&store, config)
        .recommend_at(Some(VIEWER), 10, fixed_now())
        .await
        .unwrap();

    // 3.0 popularity + 2.0 recency beats 1.0 follow + 2/7 recency
    assert_eq!(ids(&items), vec![2, 1]);
}
