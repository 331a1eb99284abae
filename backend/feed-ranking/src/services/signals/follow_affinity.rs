use super::{SignalCollector, SignalContext};
use crate::error::Result;
use crate::models::Signal;
use crate::services::aggregation::ScoreMap;
use crate::store::{ItemStore, SocialGraph};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Follow affinity: recent items from owners the viewer follows.
pub struct FollowAffinityCollector {
    items: Arc<dyn ItemStore>,
    social: Arc<dyn SocialGraph>,
    weight: f64,
    cap_multiplier: usize,
}

impl FollowAffinityCollector {
    pub fn new(
        items: Arc<dyn ItemStore>,
        social: Arc<dyn SocialGraph>,
        weight: f64,
        cap_multiplier: usize,
    ) -> Self {
        Self {
            items,
            social,
            weight,
            cap_multiplier,
        }
    }
}

#[async_trait]
impl SignalCollector for FollowAffinityCollector {
    async fn collect(&self, ctx: &SignalContext) -> Result<ScoreMap> {
        let followed = self.social.followed_ids(ctx.viewer_id).await?;

        if followed.is_empty() {
            debug!(viewer_id = ctx.viewer_id, "Viewer follows nobody");
            return Ok(ScoreMap::new());
        }

        let cap = ctx.limit.saturating_mul(self.cap_multiplier);
        let items = self.items.items_by_owners(&followed, cap).await?;

        Ok(items.into_iter().map(|item| (item.id, self.weight)).collect())
    }

    fn signal(&self) -> Signal {
        Signal::FollowAffinity
    }
}
