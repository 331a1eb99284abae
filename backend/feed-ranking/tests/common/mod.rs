#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use feed_ranking::config::RankingConfig;
use feed_ranking::models::{Item, ItemId, NewInteraction, TagId, UserId};
use feed_ranking::{InMemoryStore, RecommendationEngine, Stores};
use std::sync::Arc;

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

pub fn image(id: ItemId, owner_id: UserId, age: Duration, tag_ids: Vec<TagId>) -> Item {
    Item {
        id,
        owner_id,
        image_url: format!("https://cdn.example/images/{}.jpg", id),
        description: Some(format!("image {}", id)),
        created_at: fixed_now() - age,
        tag_ids,
    }
}

/// Record `count` interactions on `item_id` by `user_id`, `age` before now.
pub fn interact(
    store: &mut InMemoryStore,
    user_id: UserId,
    item_id: ItemId,
    count: usize,
    age: Duration,
) {
    for _ in 0..count {
        store.record_interaction(
            NewInteraction::new(user_id, item_id, "like"),
            fixed_now() - age,
        );
    }
}

pub fn engine(store: &Arc<InMemoryStore>) -> RecommendationEngine {
    engine_with(store, RankingConfig::default())
}

pub fn engine_with(store: &Arc<InMemoryStore>, config: RankingConfig) -> RecommendationEngine {
    RecommendationEngine::new(Stores::shared(store.clone()), config).unwrap()
}

pub fn ids(items: &[Item]) -> Vec<ItemId> {
    items.iter().map(|item| item.id).collect()
}
