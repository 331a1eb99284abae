/// Postgres-backed collaborator stores
///
/// Reads the image service schema:
/// `images(id, user_id, image_url, description, created_at)`,
/// `image_tags(image_id, tag_id)`, `follows(follower_id, followed_id)`,
/// `users(id, ...)` and
/// `interactions(id, user_id, image_id, interaction_type, weight, timestamp)`.
/// All ids are BIGINT and all timestamps TIMESTAMPTZ.
use super::{InteractionStore, ItemStore, SocialGraph, UserStore};
use crate::error::Result;
use crate::models::{Interaction, Item, ItemId, NewInteraction, TagId, UserId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Columns of `Item`, tags folded into an array.
const ITEM_COLUMNS: &str = r#"
    i.id,
    i.user_id AS owner_id,
    i.image_url,
    i.description,
    i.created_at,
    COALESCE(ARRAY_AGG(it.tag_id) FILTER (WHERE it.tag_id IS NOT NULL), '{}') AS tag_ids
"#;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Append an interaction. Existing rows are never touched.
    pub async fn record_interaction(&self, new: &NewInteraction) -> Result<Interaction> {
        let interaction = sqlx::query_as::<_, Interaction>(
            r#"
            INSERT INTO interactions (user_id, image_id, interaction_type, weight, timestamp)
            VALUES ($1, $2, $3, $4, NOW())
            RETURNING id, user_id, image_id AS item_id, interaction_type AS kind, weight, timestamp
            "#,
        )
        .bind(new.user_id)
        .bind(new.item_id)
        .bind(&new.kind)
        .bind(new.weight)
        .fetch_one(&self.pool)
        .await?;

        debug!(
            user_id = new.user_id,
            item_id = new.item_id,
            kind = %new.kind,
            "Recorded interaction"
        );

        Ok(interaction)
    }
}

fn sql_limit(cap: usize) -> i64 {
    i64::try_from(cap).unwrap_or(i64::MAX)
}

#[async_trait]
impl ItemStore for PgStore {
    async fn items_by_owners(&self, owner_ids: &[UserId], cap: usize) -> Result<Vec<Item>> {
        if owner_ids.is_empty() || cap == 0 {
            return Ok(Vec::new());
        }

        let query = format!(
            r#"
            SELECT {ITEM_COLUMNS}
            FROM images i
            LEFT JOIN image_tags it ON it.image_id = i.id
            WHERE i.user_id = ANY($1)
            GROUP BY i.id
            ORDER BY i.created_at DESC, i.id DESC
            LIMIT $2
            "#
        );

        let items = sqlx::query_as::<_, Item>(&query)
            .bind(owner_ids)
            .bind(sql_limit(cap))
            .fetch_all(&self.pool)
            .await?;

        Ok(items)
    }

    async fn items_by_tags(&self, tag_ids: &[TagId], cap: usize) -> Result<Vec<Item>> {
        if tag_ids.is_empty() || cap == 0 {
            return Ok(Vec::new());
        }

        let query = format!(
            r#"
            SELECT {ITEM_COLUMNS}
            FROM images i
            LEFT JOIN image_tags it ON it.image_id = i.id
            WHERE i.id IN (SELECT image_id FROM image_tags WHERE tag_id = ANY($1))
            GROUP BY i.id
            ORDER BY i.id DESC
            LIMIT $2
            "#
        );

        let items = sqlx::query_as::<_, Item>(&query)
            .bind(tag_ids)
            .bind(sql_limit(cap))
            .fetch_all(&self.pool)
            .await?;

        Ok(items)
    }

    async fn items_created_since(&self, since: DateTime<Utc>) -> Result<Vec<Item>> {
        let query = format!(
            r#"
            SELECT {ITEM_COLUMNS}
            FROM images i
            LEFT JOIN image_tags it ON it.image_id = i.id
            WHERE i.created_at > $1
            GROUP BY i.id
            ORDER BY i.created_at DESC, i.id DESC
            "#
        );

        let items = sqlx::query_as::<_, Item>(&query)
            .bind(since)
            .fetch_all(&self.pool)
            .await?;

        Ok(items)
    }

    async fn item_by_id(&self, id: ItemId) -> Result<Option<Item>> {
        let query = format!(
            r#"
            SELECT {ITEM_COLUMNS}
            FROM images i
            LEFT JOIN image_tags it ON it.image_id = i.id
            WHERE i.id = $1
            GROUP BY i.id
            "#
        );

        let item = sqlx::query_as::<_, Item>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(item)
    }

    async fn items_by_ids(&self, ids: &[ItemId]) -> Result<Vec<Item>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = format!(
            r#"
            SELECT {ITEM_COLUMNS}
            FROM images i
            LEFT JOIN image_tags it ON it.image_id = i.id
            WHERE i.id = ANY($1)
            GROUP BY i.id
            "#
        );

        let rows = sqlx::query_as::<_, Item>(&query)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        // ANY() gives no ordering guarantee
        let mut by_id: HashMap<ItemId, Item> = rows.into_iter().map(|i| (i.id, i)).collect();
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    async fn popular_recent_items(
        &self,
        since: DateTime<Utc>,
        excluding: &HashSet<ItemId>,
        cap: usize,
    ) -> Result<Vec<Item>> {
        if cap == 0 {
            return Ok(Vec::new());
        }

        let excluded: Vec<ItemId> = excluding.iter().copied().collect();
        let query = format!(
            r#"
            WITH counts AS (
                SELECT image_id, COUNT(*) AS interaction_count
                FROM interactions
                GROUP BY image_id
            )
            SELECT {ITEM_COLUMNS}
            FROM images i
            LEFT JOIN counts c ON c.image_id = i.id
            LEFT JOIN image_tags it ON it.image_id = i.id
            WHERE i.created_at > $1
              AND NOT (i.id = ANY($2))
            GROUP BY i.id, c.interaction_count
            ORDER BY COALESCE(c.interaction_count, 0) DESC, i.created_at DESC, i.id DESC
            LIMIT $3
            "#
        );

        let items = sqlx::query_as::<_, Item>(&query)
            .bind(since)
            .bind(&excluded)
            .bind(sql_limit(cap))
            .fetch_all(&self.pool)
            .await?;

        Ok(items)
    }
}

#[async_trait]
impl InteractionStore for PgStore {
    async fn interaction_counts_by_item(
        &self,
        since: DateTime<Utc>,
    ) -> Result<HashMap<ItemId, i64>> {
        let rows: Vec<(ItemId, i64)> = sqlx::query_as(
            r#"
            SELECT image_id, COUNT(*) AS interaction_count
            FROM interactions
            WHERE timestamp > $1
            GROUP BY image_id
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().collect())
    }

    async fn top_tags_by_interaction_count(
        &self,
        viewer_id: UserId,
        cap: usize,
    ) -> Result<Vec<TagId>> {
        let tags: Vec<TagId> = sqlx::query_scalar(
            r#"
            SELECT it.tag_id
            FROM interactions x
            JOIN image_tags it ON it.image_id = x.image_id
            WHERE x.user_id = $1
            GROUP BY it.tag_id
            ORDER BY COUNT(x.id) DESC, it.tag_id ASC
            LIMIT $2
            "#,
        )
        .bind(viewer_id)
        .bind(sql_limit(cap))
        .fetch_all(&self.pool)
        .await?;

        Ok(tags)
    }
}

#[async_trait]
impl SocialGraph for PgStore {
    async fn followed_ids(&self, viewer_id: UserId) -> Result<Vec<UserId>> {
        let ids: Vec<UserId> = sqlx::query_scalar(
            r#"
            SELECT followed_id FROM follows
            WHERE follower_id = $1
            "#,
        )
        .bind(viewer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn user_exists(&self, viewer_id: UserId) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM users
                WHERE id = $1
            )
            "#,
        )
        .bind(viewer_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }
}
