use crate::error::Result;
use crate::models::{Item, ItemId};
use crate::services::aggregation::ScoreMap;
use crate::store::ItemStore;
use std::cmp::Ordering;
use tracing::debug;

/// Order ids by score descending, ties broken by id descending.
pub fn rank_ids(scores: &ScoreMap, limit: usize) -> Vec<(ItemId, f64)> {
    let mut ranked: Vec<(ItemId, f64)> = scores.iter().collect();
    ranked.sort_by(|a, b| compare_ranked(*a, *b));
    ranked.truncate(limit);
    ranked
}

fn compare_ranked(a: (ItemId, f64), b: (ItemId, f64)) -> Ordering {
    b.1.total_cmp(&a.1).then_with(|| b.0.cmp(&a.0))
}

/// Ranker output: surviving items in rank order with their scores.
#[derive(Debug, Clone, Default)]
pub struct RankedItems {
    pub items: Vec<(Item, f64)>,
    /// Scored ids whose item no longer exists.
    pub stale: Vec<ItemId>,
}

/// Ranking layer: sorts aggregated scores and loads the winning items.
pub struct Ranker;

impl Default for Ranker {
    fn default() -> Self {
        Self::new()
    }
}

impl Ranker {
    pub fn new() -> Self {
        Self
    }

    /// Rank `scores`, keep the top `limit` and materialize only those.
    pub async fn rank(
        &self,
        items: &dyn ItemStore,
        scores: &ScoreMap,
        limit: usize,
    ) -> Result<RankedItems> {
        let ranked = rank_ids(scores, limit);
        if ranked.is_empty() {
            return Ok(RankedItems::default());
        }

        let ids: Vec<ItemId> = ranked.iter().map(|(id, _)| *id).collect();
        let mut loaded = items.items_by_ids(&ids).await?.into_iter().peekable();

        let mut result = RankedItems::default();
        for (id, score) in ranked {
            match loaded.next_if(|item| item.id == id) {
                Some(item) => result.items.push((item, score)),
                None => result.stale.push(id),
            }
        }

        if !result.stale.is_empty() {
            debug!(
                stale = result.stale.len(),
                "Dropped scored items that no longer exist"
            );
        }

        Ok(result)
    }
}
