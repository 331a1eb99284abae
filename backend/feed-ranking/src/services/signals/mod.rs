mod follow_affinity;
mod popularity;
mod recency;
mod tag_affinity;

use crate::config::RankingConfig;
use crate::error::Result;
use crate::models::{Signal, UserId};
use crate::services::aggregation::ScoreMap;
use crate::store::Stores;
use crate::utils::within;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub use follow_affinity::FollowAffinityCollector;
pub use popularity::PopularityCollector;
pub use recency::RecencyCollector;
pub use tag_affinity::TagAffinityCollector;

/// Inputs shared by every collector in one ranking call.
#[derive(Debug, Clone, Copy)]
pub struct SignalContext {
    pub viewer_id: UserId,
    pub now: DateTime<Utc>,
    pub limit: usize,
}

/// A relevance signal: reads collaborators, returns item → contribution.
///
/// Collectors never see each other's output.
#[async_trait]
pub trait SignalCollector: Send + Sync {
    async fn collect(&self, ctx: &SignalContext) -> Result<ScoreMap>;
    fn signal(&self) -> Signal;
}

/// Output of all collectors for one call.
#[derive(Debug, Clone, Default)]
pub struct SignalScores {
    pub follow_affinity: ScoreMap,
    pub tag_affinity: ScoreMap,
    pub popularity: ScoreMap,
    pub recency: ScoreMap,
    pub timed_out: Vec<Signal>,
}

impl SignalScores {
    pub fn contributions(&self) -> [(Signal, &ScoreMap); 4] {
        [
            (Signal::FollowAffinity, &self.follow_affinity),
            (Signal::TagAffinity, &self.tag_affinity),
            (Signal::Popularity, &self.popularity),
            (Signal::Recency, &self.recency),
        ]
    }

    /// Tag affinity only introduces items follow affinity did not score, at
    /// most `limit` of them, highest ids first.
    pub fn reconcile(mut self, limit: usize) -> Self {
        self.tag_affinity = self
            .tag_affinity
            .without(&self.follow_affinity)
            .keep_newest(limit);
        self
    }
}

/// Signal layer: runs every collector concurrently under a time bound.
pub struct SignalLayer {
    follow_affinity: FollowAffinityCollector,
    tag_affinity: TagAffinityCollector,
    popularity: PopularityCollector,
    recency: RecencyCollector,
    timeout: Duration,
}

impl SignalLayer {
    pub fn new(stores: &Stores, config: &RankingConfig) -> Self {
        let weights = config.weights();
        let windows = config.windows();

        Self {
            follow_affinity: FollowAffinityCollector::new(
                stores.items.clone(),
                stores.social.clone(),
                weights.follow,
                config.follow_cap_multiplier,
            ),
            tag_affinity: TagAffinityCollector::new(
                stores.items.clone(),
                stores.interactions.clone(),
                weights.tag,
                config.top_tags,
                config.follow_cap_multiplier,
            ),
            popularity: PopularityCollector::new(
                stores.interactions.clone(),
                weights.popularity_divisor,
                weights.popularity_cap,
                windows.signal_days,
            ),
            recency: RecencyCollector::new(
                stores.items.clone(),
                weights.recency_max,
                windows.signal_days,
            ),
            timeout: config.collector_timeout(),
        }
    }

    /// Collect all signals and reconcile them for aggregation.
    ///
    /// A collector that exceeds the time bound contributes nothing; a
    /// collector error fails the whole call.
    pub async fn collect_all(&self, ctx: &SignalContext) -> Result<SignalScores> {
        let (follow_affinity, tag_affinity, popularity, recency) = tokio::try_join!(
            self.bounded(&self.follow_affinity, ctx),
            self.bounded(&self.tag_affinity, ctx),
            self.bounded(&self.popularity, ctx),
            self.bounded(&self.recency, ctx),
        )?;

        let mut scores = SignalScores::default();
        for (signal, outcome) in [
            (Signal::FollowAffinity, follow_affinity),
            (Signal::TagAffinity, tag_affinity),
            (Signal::Popularity, popularity),
            (Signal::Recency, recency),
        ] {
            let Some(map) = outcome else {
                scores.timed_out.push(signal);
                continue;
            };
            match signal {
                Signal::FollowAffinity => scores.follow_affinity = map,
                Signal::TagAffinity => scores.tag_affinity = map,
                Signal::Popularity => scores.popularity = map,
                Signal::Recency => scores.recency = map,
            }
        }

        Ok(scores.reconcile(ctx.limit))
    }

    async fn bounded<C>(&self, collector: &C, ctx: &SignalContext) -> Result<Option<ScoreMap>>
    where
        C: SignalCollector,
    {
        let started = Instant::now();
        let outcome = within(self.timeout, collector.collect(ctx)).await?;

        match &outcome {
            Some(scores) => debug!(
                viewer_id = ctx.viewer_id,
                signal = %collector.signal(),
                candidates = scores.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Signal collected"
            ),
            None => warn!(
                viewer_id = ctx.viewer_id,
                signal = %collector.signal(),
                timeout_ms = self.timeout.as_millis() as u64,
                "Signal collector timed out, contributing nothing"
            ),
        }

        Ok(outcome)
    }
}
