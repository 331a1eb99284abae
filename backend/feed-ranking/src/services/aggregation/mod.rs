/// Score aggregation
///
/// Collector outputs are summed per item. An item absent from a collector's
/// output receives exactly 0.0 from it, so merge order never changes totals.
use crate::models::{ItemId, Signal, SignalBreakdown};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};

/// Item id → accumulated score, scoped to one ranking call.
///
/// Iteration is in ascending id order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreMap {
    scores: BTreeMap<ItemId, f64>,
}

impl ScoreMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `score` to `item_id`, summing on collision.
    pub fn add(&mut self, item_id: ItemId, score: f64) {
        match self.scores.entry(item_id) {
            Entry::Occupied(mut existing) => *existing.get_mut() += score,
            Entry::Vacant(slot) => {
                slot.insert(score);
            }
        }
    }

    /// Score of `item_id`; 0.0 when absent.
    pub fn get(&self, item_id: ItemId) -> f64 {
        self.scores.get(&item_id).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, item_id: ItemId) -> bool {
        self.scores.contains_key(&item_id)
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ItemId, f64)> + '_ {
        self.scores.iter().map(|(id, score)| (*id, *score))
    }

    pub fn merge(&mut self, other: &ScoreMap) {
        for (item_id, score) in other.iter() {
            self.add(item_id, score);
        }
    }

    /// Entries whose id is not scored in `other`.
    pub fn without(&self, other: &ScoreMap) -> ScoreMap {
        self.iter()
            .filter(|(item_id, _)| !other.contains(*item_id))
            .collect()
    }

    /// Keep the `n` highest ids.
    pub fn keep_newest(mut self, n: usize) -> ScoreMap {
        while self.scores.len() > n {
            self.scores.pop_first();
        }
        self
    }
}

impl FromIterator<(ItemId, f64)> for ScoreMap {
    fn from_iter<I: IntoIterator<Item = (ItemId, f64)>>(iter: I) -> Self {
        let mut map = ScoreMap::new();
        for (item_id, score) in iter {
            map.add(item_id, score);
        }
        map
    }
}

/// Summed scores plus the per-signal explanation of every total.
#[derive(Debug, Clone, Default)]
pub struct Aggregate {
    pub totals: ScoreMap,
    pub breakdowns: HashMap<ItemId, SignalBreakdown>,
}

impl Aggregate {
    pub fn breakdown(&self, item_id: ItemId) -> SignalBreakdown {
        self.breakdowns.get(&item_id).copied().unwrap_or_default()
    }
}

/// Sum collector outputs into one score per item.
pub fn aggregate<'a, I>(contributions: I) -> Aggregate
where
    I: IntoIterator<Item = (Signal, &'a ScoreMap)>,
{
    let mut result = Aggregate::default();

    for (signal, scores) in contributions {
        result.totals.merge(scores);
        for (item_id, score) in scores.iter() {
            result
                .breakdowns
                .entry(item_id)
                .or_default()
                .add(signal, score);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_sums_on_collision() {
        let mut map = ScoreMap::new();
        map.add(1, 10.0);
        map.add(1, 1.5);
        map.add(2, 0.0);

        assert_eq!(map.get(1), 11.5);
        assert!(map.contains(2));
        assert_eq!(map.get(3), 0.0);
        assert!(!map.contains(3));
    }

    #[test]
    fn test_without_and_keep_newest() {
        let follow: ScoreMap = vec![(5, 10.0), (9, 10.0)].into_iter().collect();
        let tag: ScoreMap = vec![(3, 5.0), (5, 5.0), (7, 5.0), (8, 5.0), (9, 5.0)]
            .into_iter()
            .collect();

        let reconciled = tag.without(&follow).keep_newest(2);
        let ids: Vec<ItemId> = reconciled.iter().map(|(id, _)| id).collect();

        assert_eq!(ids, vec![7, 8]);
    }

    #[test]
    fn test_aggregate_sums_and_explains() {
        let follow: ScoreMap = vec![(1, 10.0)].into_iter().collect();
        let popularity: ScoreMap = vec![(1, 0.3), (2, 3.0)].into_iter().collect();
        let recency: ScoreMap = vec![(2, 2.0)].into_iter().collect();

        let result = aggregate(vec![
            (Signal::FollowAffinity, &follow),
            (Signal::Popularity, &popularity),
            (Signal::Recency, &recency),
        ]);

        assert!((result.totals.get(1) - 10.3).abs() < 1e-9);
        assert!((result.totals.get(2) - 5.0).abs() < 1e-9);
        assert_eq!(result.breakdown(2).popularity, 3.0);
        assert_eq!(result.breakdown(2).follow_affinity, 0.0);
        assert_eq!(result.breakdown(42), SignalBreakdown::default());
    }

    #[test]
    fn test_aggregate_of_nothing_is_empty() {
        let result = aggregate(Vec::<(Signal, &ScoreMap)>::new());
        assert!(result.totals.is_empty());
    }
}
