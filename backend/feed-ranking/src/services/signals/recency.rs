use super::{SignalCollector, SignalContext};
use crate::error::Result;
use crate::models::Signal;
use crate::services::aggregation::ScoreMap;
use crate::store::ItemStore;
use crate::utils::{age_in_days, linear_decay};
use async_trait::async_trait;
use chrono::Duration;
use std::sync::Arc;

/// Recency: linear decay over whole days since creation.
pub struct RecencyCollector {
    items: Arc<dyn ItemStore>,
    max: f64,
    window_days: i64,
}

impl RecencyCollector {
    pub fn new(items: Arc<dyn ItemStore>, max: f64, window_days: i64) -> Self {
        Self {
            items,
            max,
            window_days,
        }
    }
}

#[async_trait]
impl SignalCollector for RecencyCollector {
    async fn collect(&self, ctx: &SignalContext) -> Result<ScoreMap> {
        let since = ctx.now - Duration::days(self.window_days);
        let items = self.items.items_created_since(since).await?;

        Ok(items
            .into_iter()
            .map(|item| {
                let age = age_in_days(item.created_at, ctx.now);
                (item.id, linear_decay(age, self.window_days, self.max))
            })
            .collect())
    }

    fn signal(&self) -> Signal {
        Signal::Recency
    }
}
