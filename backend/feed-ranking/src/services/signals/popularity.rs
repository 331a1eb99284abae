use super::{SignalCollector, SignalContext};
use crate::error::Result;
use crate::models::Signal;
use crate::services::aggregation::ScoreMap;
use crate::store::InteractionStore;
use crate::utils::capped_linear;
use async_trait::async_trait;
use chrono::Duration;
use std::sync::Arc;

/// Popularity: interaction volume over the trailing window.
///
/// Uses raw interaction counts; interaction weights are not applied.
pub struct PopularityCollector {
    interactions: Arc<dyn InteractionStore>,
    divisor: f64,
    cap: f64,
    window_days: i64,
}

impl PopularityCollector {
    pub fn new(
        interactions: Arc<dyn InteractionStore>,
        divisor: f64,
        cap: f64,
        window_days: i64,
    ) -> Self {
        Self {
            interactions,
            divisor,
            cap,
            window_days,
        }
    }
}

#[async_trait]
impl SignalCollector for PopularityCollector {
    async fn collect(&self, ctx: &SignalContext) -> Result<ScoreMap> {
        let since = ctx.now - Duration::days(self.window_days);
        let counts = self.interactions.interaction_counts_by_item(since).await?;

        Ok(counts
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .map(|(item_id, count)| (item_id, capped_linear(count, self.divisor, self.cap)))
            .collect())
    }

    fn signal(&self) -> Signal {
        Signal::Popularity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MockInteractionStore;
    use chrono::Utc;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_popularity_is_capped() {
        let now = Utc::now();
        let mut interactions = MockInteractionStore::new();
        interactions
            .expect_interaction_counts_by_item()
            .withf(move |since| *since == now - Duration::days(7))
            .returning(|_| Ok(HashMap::from([(1, 5), (2, 30), (3, 120)])));

        let collector = PopularityCollector::new(Arc::new(interactions), 10.0, 3.0, 7);
        let ctx = SignalContext {
            viewer_id: 1,
            now,
            limit: 20,
        };
        let scores = collector.collect(&ctx).await.unwrap();

        assert!((scores.get(1) - 0.5).abs() < 1e-9);
        assert_eq!(scores.get(2), 3.0);
        assert_eq!(scores.get(3), 3.0);
    }
}
