use super::{InteractionStore, ItemStore, SocialGraph, UserStore};
use crate::error::{RankingError, Result};
use crate::models::{Interaction, Item, ItemId, NewInteraction, TagId, UserId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Collaborator reads, used to inject faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    ItemsByOwners,
    ItemsByTags,
    ItemsCreatedSince,
    ItemById,
    PopularRecentItems,
    InteractionCounts,
    TopTags,
    FollowedIds,
    UserExists,
}

/// Snapshot of how often each collaborator was read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadCounts {
    pub item_reads: usize,
    pub popularity_reads: usize,
    pub viewer_interaction_reads: usize,
    pub social_graph_reads: usize,
    pub user_reads: usize,
}

/// Store over plain collections.
///
/// Populate it with the builder methods, then share it behind an `Arc`.
#[derive(Default)]
pub struct InMemoryStore {
    users: HashSet<UserId>,
    items: BTreeMap<ItemId, Item>,
    interactions: Vec<Interaction>,
    follows: HashMap<UserId, Vec<UserId>>,
    failures: HashSet<StoreOp>,
    delays: HashMap<StoreOp, Duration>,

    item_reads: AtomicUsize,
    popularity_reads: AtomicUsize,
    viewer_interaction_reads: AtomicUsize,
    social_graph_reads: AtomicUsize,
    user_reads: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&mut self, user_id: UserId) {
        self.users.insert(user_id);
    }

    pub fn add_item(&mut self, item: Item) {
        self.items.insert(item.id, item);
    }

    pub fn follow(&mut self, follower_id: UserId, followed_id: UserId) {
        let followed = self.follows.entry(follower_id).or_default();
        if !followed.contains(&followed_id) {
            followed.push(followed_id);
        }
    }

    pub fn record_interaction(
        &mut self,
        new: NewInteraction,
        timestamp: DateTime<Utc>,
    ) -> Interaction {
        let interaction = Interaction {
            id: self.interactions.len() as i64 + 1,
            user_id: new.user_id,
            item_id: new.item_id,
            kind: new.kind,
            weight: new.weight,
            timestamp,
        };
        self.interactions.push(interaction.clone());
        interaction
    }

    /// Make `op` fail with a store error.
    pub fn fail_on(&mut self, op: StoreOp) {
        self.failures.insert(op);
    }

    /// Make `op` sleep before answering.
    pub fn delay(&mut self, op: StoreOp, duration: Duration) {
        self.delays.insert(op, duration);
    }

    pub fn read_counts(&self) -> ReadCounts {
        ReadCounts {
            item_reads: self.item_reads.load(Ordering::Relaxed),
            popularity_reads: self.popularity_reads.load(Ordering::Relaxed),
            viewer_interaction_reads: self.viewer_interaction_reads.load(Ordering::Relaxed),
            social_graph_reads: self.social_graph_reads.load(Ordering::Relaxed),
            user_reads: self.user_reads.load(Ordering::Relaxed),
        }
    }

    async fn enter(&self, op: StoreOp) -> Result<()> {
        let counter = match op {
            StoreOp::InteractionCounts => &self.popularity_reads,
            StoreOp::TopTags => &self.viewer_interaction_reads,
            StoreOp::FollowedIds => &self.social_graph_reads,
            StoreOp::UserExists => &self.user_reads,
            _ => &self.item_reads,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        if let Some(duration) = self.delays.get(&op) {
            tokio::time::sleep(*duration).await;
        }
        if self.failures.contains(&op) {
            return Err(RankingError::Store(format!("{:?} unavailable", op)));
        }
        Ok(())
    }

    fn interaction_count(&self, item_id: ItemId) -> usize {
        self.interactions
            .iter()
            .filter(|i| i.item_id == item_id)
            .count()
    }
}

#[async_trait]
impl ItemStore for InMemoryStore {
    async fn items_by_owners(&self, owner_ids: &[UserId], cap: usize) -> Result<Vec<Item>> {
        self.enter(StoreOp::ItemsByOwners).await?;

        let mut items: Vec<Item> = self
            .items
            .values()
            .filter(|item| owner_ids.contains(&item.owner_id))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        items.truncate(cap);
        Ok(items)
    }

    async fn items_by_tags(&self, tag_ids: &[TagId], cap: usize) -> Result<Vec<Item>> {
        self.enter(StoreOp::ItemsByTags).await?;

        Ok(self
            .items
            .values()
            .rev()
            .filter(|item| item.tag_ids.iter().any(|t| tag_ids.contains(t)))
            .take(cap)
            .cloned()
            .collect())
    }

    async fn items_created_since(&self, since: DateTime<Utc>) -> Result<Vec<Item>> {
        self.enter(StoreOp::ItemsCreatedSince).await?;

        let mut items: Vec<Item> = self
            .items
            .values()
            .filter(|item| item.created_at > since)
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(items)
    }

    async fn item_by_id(&self, id: ItemId) -> Result<Option<Item>> {
        self.enter(StoreOp::ItemById).await?;
        Ok(self.items.get(&id).cloned())
    }

    async fn popular_recent_items(
        &self,
        since: DateTime<Utc>,
        excluding: &HashSet<ItemId>,
        cap: usize,
    ) -> Result<Vec<Item>> {
        self.enter(StoreOp::PopularRecentItems).await?;

        let mut pool: Vec<(usize, &Item)> = self
            .items
            .values()
            .filter(|item| item.created_at > since && !excluding.contains(&item.id))
            .map(|item| (self.interaction_count(item.id), item))
            .collect();
        pool.sort_by(|(count_a, a), (count_b, b)| {
            count_b
                .cmp(count_a)
                .then(b.created_at.cmp(&a.created_at))
                .then(b.id.cmp(&a.id))
        });

        Ok(pool
            .into_iter()
            .take(cap)
            .map(|(_, item)| item.clone())
            .collect())
    }
}

#[async_trait]
impl InteractionStore for InMemoryStore {
    async fn interaction_counts_by_item(
        &self,
        since: DateTime<Utc>,
    ) -> Result<HashMap<ItemId, i64>> {
        self.enter(StoreOp::InteractionCounts).await?;

        let mut counts: HashMap<ItemId, i64> = HashMap::new();
        for interaction in self.interactions.iter().filter(|i| i.timestamp > since) {
            *counts.entry(interaction.item_id).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn top_tags_by_interaction_count(
        &self,
        viewer_id: UserId,
        cap: usize,
    ) -> Result<Vec<TagId>> {
        self.enter(StoreOp::TopTags).await?;

        let mut counts: HashMap<TagId, usize> = HashMap::new();
        for interaction in self.interactions.iter().filter(|i| i.user_id == viewer_id) {
            if let Some(item) = self.items.get(&interaction.item_id) {
                for tag_id in &item.tag_ids {
                    *counts.entry(*tag_id).or_insert(0) += 1;
                }
            }
        }

        let mut ranked: Vec<(TagId, usize)> = counts.into_iter().collect();
        ranked.sort_by(|(tag_a, count_a), (tag_b, count_b)| {
            count_b.cmp(count_a).then(tag_a.cmp(tag_b))
        });
        Ok(ranked.into_iter().take(cap).map(|(tag, _)| tag).collect())
    }
}

#[async_trait]
impl SocialGraph for InMemoryStore {
    async fn followed_ids(&self, viewer_id: UserId) -> Result<Vec<UserId>> {
        self.enter(StoreOp::FollowedIds).await?;
        Ok(self.follows.get(&viewer_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn user_exists(&self, viewer_id: UserId) -> Result<bool> {
        self.enter(StoreOp::UserExists).await?;
        Ok(self.users.contains(&viewer_id))
    }
}
