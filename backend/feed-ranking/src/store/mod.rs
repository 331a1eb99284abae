//! Read-only views over the data owned by other services.
//!
//! The engine never writes through these traits. `PgStore` backs all four
//! against the shared Postgres schema; `InMemoryStore` backs them in tests
//! and local tooling.

mod memory;
mod postgres;

pub use memory::{InMemoryStore, ReadCounts, StoreOp};
pub use postgres::PgStore;

use crate::error::Result;
use crate::models::{Item, ItemId, TagId, UserId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Items owned by any of `owner_ids`, newest first, at most `cap`.
    async fn items_by_owners(&self, owner_ids: &[UserId], cap: usize) -> Result<Vec<Item>>;

    /// Distinct items carrying any of `tag_ids`, highest id first, at most `cap`.
    async fn items_by_tags(&self, tag_ids: &[TagId], cap: usize) -> Result<Vec<Item>>;

    /// Items created strictly after `since`.
    async fn items_created_since(&self, since: DateTime<Utc>) -> Result<Vec<Item>>;

    async fn item_by_id(&self, id: ItemId) -> Result<Option<Item>>;

    /// Batch lookup preserving the order of `ids`; unknown ids are skipped.
    async fn items_by_ids(&self, ids: &[ItemId]) -> Result<Vec<Item>> {
        let mut items = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(item) = self.item_by_id(*id).await? {
                items.push(item);
            }
        }
        Ok(items)
    }

    /// Items created after `since` that are not in `excluding`, ordered by
    /// all-time interaction count desc, then creation time desc, then id desc.
    /// Items without interactions are included with a count of zero.
    async fn popular_recent_items(
        &self,
        since: DateTime<Utc>,
        excluding: &HashSet<ItemId>,
        cap: usize,
    ) -> Result<Vec<Item>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InteractionStore: Send + Sync {
    /// Interaction count per item over interactions timestamped after `since`.
    async fn interaction_counts_by_item(&self, since: DateTime<Utc>)
        -> Result<HashMap<ItemId, i64>>;

    /// Tags the viewer interacted with most, by interaction count desc.
    async fn top_tags_by_interaction_count(
        &self,
        viewer_id: UserId,
        cap: usize,
    ) -> Result<Vec<TagId>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SocialGraph: Send + Sync {
    async fn followed_ids(&self, viewer_id: UserId) -> Result<Vec<UserId>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn user_exists(&self, viewer_id: UserId) -> Result<bool>;
}

/// Handles to every collaborator the engine reads from.
#[derive(Clone)]
pub struct Stores {
    pub items: Arc<dyn ItemStore>,
    pub interactions: Arc<dyn InteractionStore>,
    pub social: Arc<dyn SocialGraph>,
    pub users: Arc<dyn UserStore>,
}

impl Stores {
    /// Use one backend for all four collaborators.
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: ItemStore + InteractionStore + SocialGraph + UserStore + 'static,
    {
        Self {
            items: store.clone(),
            interactions: store.clone(),
            social: store.clone(),
            users: store,
        }
    }
}
