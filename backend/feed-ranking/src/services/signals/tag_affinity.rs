use super::{SignalCollector, SignalContext};
use crate::error::Result;
use crate::models::Signal;
use crate::services::aggregation::ScoreMap;
use crate::store::{InteractionStore, ItemStore};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Tag affinity: items carrying the tags the viewer interacts with most.
///
/// Runs without seeing follow affinity, so it fetches enough candidates to
/// still have `limit` left once followed items are removed at
/// reconciliation (follow affinity scores at most `limit * multiplier`).
pub struct TagAffinityCollector {
    items: Arc<dyn ItemStore>,
    interactions: Arc<dyn InteractionStore>,
    weight: f64,
    top_tags: usize,
    follow_cap_multiplier: usize,
}

impl TagAffinityCollector {
    pub fn new(
        items: Arc<dyn ItemStore>,
        interactions: Arc<dyn InteractionStore>,
        weight: f64,
        top_tags: usize,
        follow_cap_multiplier: usize,
    ) -> Self {
        Self {
            items,
            interactions,
            weight,
            top_tags,
            follow_cap_multiplier,
        }
    }

    fn fetch_cap(&self, limit: usize) -> usize {
        limit.saturating_add(limit.saturating_mul(self.follow_cap_multiplier))
    }
}

#[async_trait]
impl SignalCollector for TagAffinityCollector {
    async fn collect(&self, ctx: &SignalContext) -> Result<ScoreMap> {
        let tags = self
            .interactions
            .top_tags_by_interaction_count(ctx.viewer_id, self.top_tags)
            .await?;

        if tags.is_empty() {
            debug!(viewer_id = ctx.viewer_id, "Viewer has no tag history");
            return Ok(ScoreMap::new());
        }

        let items = self
            .items
            .items_by_tags(&tags, self.fetch_cap(ctx.limit))
            .await?;

        Ok(items.into_iter().map(|item| (item.id, self.weight)).collect())
    }

    fn signal(&self) -> Signal {
        Signal::TagAffinity
    }
}
