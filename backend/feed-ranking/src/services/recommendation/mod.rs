/// Recommendation engine
///
/// Entry point of a ranking call. Chooses between the personalized path
/// (signals → aggregation → ranking → fallback fill) and the cold-start path
/// (fallback pool only) and reports how the feed was built.
use crate::config::RankingConfig;
use crate::error::{RankingError, Result};
use crate::models::{
    Feed, Item, ItemId, RankedItem, RankingSource, RankingStats, SignalBreakdown, UserId,
};
use crate::services::aggregation::aggregate;
use crate::services::fallback::FallbackFiller;
use crate::services::ranking::Ranker;
use crate::services::signals::{SignalContext, SignalLayer};
use crate::store::Stores;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::{debug, info};

pub struct RecommendationEngine {
    stores: Stores,
    signals: SignalLayer,
    ranker: Ranker,
    fallback: FallbackFiller,
    config: RankingConfig,
}

impl RecommendationEngine {
    /// Fails with `InvalidInput` when `config` does not validate.
    pub fn new(stores: Stores, config: RankingConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            signals: SignalLayer::new(&stores, &config),
            ranker: Ranker::new(),
            fallback: FallbackFiller::new(config.windows().fallback_days),
            stores,
            config,
        })
    }

    pub fn config(&self) -> &RankingConfig {
        &self.config
    }

    /// Ordered feed of at most `limit` items for `viewer_id`.
    pub async fn recommend(&self, viewer_id: Option<UserId>, limit: usize) -> Result<Vec<Item>> {
        self.recommend_at(viewer_id, limit, Utc::now()).await
    }

    /// Same as `recommend` with an explicit time of call.
    pub async fn recommend_at(
        &self,
        viewer_id: Option<UserId>,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<Item>> {
        Ok(self
            .recommend_explained(viewer_id, limit, now)
            .await?
            .into_items())
    }

    /// Feed with per-item score breakdowns and call statistics.
    pub async fn recommend_explained(
        &self,
        viewer_id: Option<UserId>,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Result<Feed> {
        let limit = self.effective_limit(limit)?;

        let Some(viewer_id) = viewer_id else {
            return self.cold_start(now, limit).await;
        };

        if !self.stores.users.user_exists(viewer_id).await? {
            debug!(viewer_id = viewer_id, "Unknown viewer, serving cold-start feed");
            return self.cold_start(now, limit).await;
        }

        self.personalized(viewer_id, now, limit).await
    }

    fn effective_limit(&self, requested: usize) -> Result<usize> {
        if requested == 0 {
            return Err(RankingError::InvalidInput(
                "limit must be positive".to_string(),
            ));
        }
        match self.config.max_limit {
            Some(max_limit) if requested > max_limit => {
                debug!(
                    requested = requested,
                    max_limit = max_limit,
                    "Clamping requested limit"
                );
                Ok(max_limit)
            }
            _ => Ok(requested),
        }
    }

    async fn cold_start(&self, now: DateTime<Utc>, limit: usize) -> Result<Feed> {
        let pool = self.fallback.pool(self.stores.items.as_ref(), now, limit).await?;

        let stats = RankingStats {
            cold_start: true,
            fallback_count: pool.len(),
            ..RankingStats::default()
        };

        info!(limit = limit, returned = pool.len(), "Cold-start feed served");

        Ok(Feed {
            items: pool.into_iter().map(fallback_item).collect(),
            stats,
        })
    }

    async fn personalized(
        &self,
        viewer_id: UserId,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Feed> {
        let ctx = SignalContext {
            viewer_id,
            now,
            limit,
        };

        let scores = self.signals.collect_all(&ctx).await?;
        let aggregated = aggregate(scores.contributions());

        let ranked = self
            .ranker
            .rank(self.stores.items.as_ref(), &aggregated.totals, limit)
            .await?;

        let mut items: Vec<RankedItem> = ranked
            .items
            .into_iter()
            .map(|(item, score)| RankedItem {
                breakdown: aggregated.breakdown(item.id),
                item,
                score,
                source: RankingSource::Personalized,
            })
            .collect();
        let ranked_count = items.len();

        let selected: HashSet<ItemId> = items.iter().map(|ranked| ranked.item.id).collect();
        let filler = self
            .fallback
            .fill(self.stores.items.as_ref(), now, &selected, limit)
            .await?;
        let fallback_count = filler.len();
        items.extend(filler.into_iter().map(fallback_item));

        let stats = RankingStats {
            cold_start: false,
            follow_candidates: scores.follow_affinity.len(),
            tag_candidates: scores.tag_affinity.len(),
            popularity_candidates: scores.popularity.len(),
            recency_candidates: scores.recency.len(),
            timed_out: scores.timed_out.clone(),
            scored_count: aggregated.totals.len(),
            ranked_count,
            stale_dropped: ranked.stale.len(),
            fallback_count,
        };

        info!(
            viewer_id = viewer_id,
            limit = limit,
            follow = stats.follow_candidates,
            tag = stats.tag_candidates,
            popularity = stats.popularity_candidates,
            recency = stats.recency_candidates,
            ranked = stats.ranked_count,
            fallback = stats.fallback_count,
            "Personalized feed served"
        );

        Ok(Feed { items, stats })
    }
}

fn fallback_item(item: Item) -> RankedItem {
    RankedItem {
        item,
        score: 0.0,
        breakdown: SignalBreakdown::default(),
        source: RankingSource::Fallback,
    }
}
