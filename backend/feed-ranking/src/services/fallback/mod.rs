//! Fallback pool
//!
//! Non-personalized candidates: items created in the trailing window ordered
//! by interaction count, then creation time. Serves anonymous viewers and
//! fills the tail of a personalized feed that came up short.

use crate::error::Result;
use crate::models::{Item, ItemId};
use crate::store::ItemStore;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use tracing::debug;

pub struct FallbackFiller {
    window_days: i64,
}

impl FallbackFiller {
    pub fn new(window_days: i64) -> Self {
        Self { window_days }
    }

    fn since(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(self.window_days)
    }

    /// The pool itself, capped at `limit`.
    pub async fn pool(
        &self,
        items: &dyn ItemStore,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Item>> {
        items
            .popular_recent_items(self.since(now), &HashSet::new(), limit)
            .await
    }

    /// Pool items not in `selected`, enough to bring the feed up to `limit`.
    ///
    /// Returns nothing when `selected` already reaches `limit`.
    pub async fn fill(
        &self,
        items: &dyn ItemStore,
        now: DateTime<Utc>,
        selected: &HashSet<ItemId>,
        limit: usize,
    ) -> Result<Vec<Item>> {
        let shortfall = limit.saturating_sub(selected.len());
        if shortfall == 0 {
            return Ok(Vec::new());
        }

        let filler = items
            .popular_recent_items(self.since(now), selected, shortfall)
            .await?;

        debug!(
            shortfall = shortfall,
            filled = filler.len(),
            "Fallback pool filled shortfall"
        );

        Ok(filler)
    }
}
