use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type ItemId = i64;
pub type UserId = i64;
pub type TagId = i64;

/// Weight stored for interaction kinds the table does not know.
pub const DEFAULT_INTERACTION_WEIGHT: f64 = 1.0;

/// A rankable piece of content (an uploaded image).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Item {
    pub id: ItemId,
    pub owner_id: UserId,
    pub image_url: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub tag_ids: Vec<TagId>,
}

/// Interaction kinds with a known weight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionKind {
    View,
    Like,
    Save,
    Comment,
}

impl InteractionKind {
    pub fn parse(kind: &str) -> Option<Self> {
        match kind {
            "view" => Some(Self::View),
            "like" => Some(Self::Like),
            "save" => Some(Self::Save),
            "comment" => Some(Self::Comment),
            _ => None,
        }
    }

    /// Get weight for this interaction kind
    pub fn weight(&self) -> f64 {
        match self {
            Self::View => 0.5,
            Self::Like => 2.0,
            Self::Save => 3.0,
            Self::Comment => 4.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Like => "like",
            Self::Save => "save",
            Self::Comment => "comment",
        }
    }
}

impl std::fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Weight table lookup for a raw interaction kind.
pub fn interaction_weight(kind: &str) -> f64 {
    InteractionKind::parse(kind)
        .map(|k| k.weight())
        .unwrap_or(DEFAULT_INTERACTION_WEIGHT)
}

/// A recorded user action against an item. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Interaction {
    pub id: i64,
    pub user_id: UserId,
    pub item_id: ItemId,
    pub kind: String,
    pub weight: f64,
    pub timestamp: DateTime<Utc>,
}

/// Interaction about to be appended; the weight is fixed at creation time.
#[derive(Debug, Clone, PartialEq)]
pub struct NewInteraction {
    pub user_id: UserId,
    pub item_id: ItemId,
    pub kind: String,
    pub weight: f64,
}

impl NewInteraction {
    pub fn new(user_id: UserId, item_id: ItemId, kind: impl Into<String>) -> Self {
        let kind = kind.into();
        let weight = interaction_weight(&kind);
        Self {
            user_id,
            item_id,
            kind,
            weight,
        }
    }
}

/// One independent source of relevance evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    FollowAffinity, // items from followed owners
    TagAffinity,    // items sharing the viewer's most used tags
    Popularity,     // recent interaction volume
    Recency,        // creation age decay
}

impl Signal {
    pub const ALL: [Signal; 4] = [
        Signal::FollowAffinity,
        Signal::TagAffinity,
        Signal::Popularity,
        Signal::Recency,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::FollowAffinity => "follow_affinity",
            Signal::TagAffinity => "tag_affinity",
            Signal::Popularity => "popularity",
            Signal::Recency => "recency",
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-signal contributions to an item's score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalBreakdown {
    pub follow_affinity: f64,
    pub tag_affinity: f64,
    pub popularity: f64,
    pub recency: f64,
}

impl SignalBreakdown {
    pub fn get(&self, signal: Signal) -> f64 {
        match signal {
            Signal::FollowAffinity => self.follow_affinity,
            Signal::TagAffinity => self.tag_affinity,
            Signal::Popularity => self.popularity,
            Signal::Recency => self.recency,
        }
    }

    pub fn add(&mut self, signal: Signal, value: f64) {
        match signal {
            Signal::FollowAffinity => self.follow_affinity += value,
            Signal::TagAffinity => self.tag_affinity += value,
            Signal::Popularity => self.popularity += value,
            Signal::Recency => self.recency += value,
        }
    }

    pub fn total(&self) -> f64 {
        self.follow_affinity + self.tag_affinity + self.popularity + self.recency
    }
}

/// Which stage placed an item in the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingSource {
    Personalized,
    Fallback,
}

#[derive(Debug, Clone, Serialize)]
pub struct RankedItem {
    pub item: Item,
    pub score: f64,
    pub breakdown: SignalBreakdown,
    pub source: RankingSource,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RankingStats {
    pub cold_start: bool,
    pub follow_candidates: usize,
    pub tag_candidates: usize,
    pub popularity_candidates: usize,
    pub recency_candidates: usize,
    pub timed_out: Vec<Signal>,
    pub scored_count: usize,
    pub ranked_count: usize,
    pub stale_dropped: usize,
    pub fallback_count: usize,
}

/// Result of one ranking call, with explanations.
#[derive(Debug, Clone, Serialize)]
pub struct Feed {
    pub items: Vec<RankedItem>,
    pub stats: RankingStats,
}

impl Feed {
    pub fn into_items(self) -> Vec<Item> {
        self.items.into_iter().map(|ranked| ranked.item).collect()
    }
}
