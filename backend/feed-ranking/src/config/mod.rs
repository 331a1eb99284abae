use crate::error::{RankingError, Result};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub database: DatabaseConfig,
    pub ranking: RankingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_app_env")]
    pub app_env: String,
    #[serde(default)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

/// Tunables of the ranking pipeline.
///
/// Read from `RANKING_*` variables, e.g. `RANKING_FOLLOW_WEIGHT=12.5`.
#[derive(Debug, Clone, Deserialize)]
pub struct RankingConfig {
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    /// Optional ceiling on requested limits; unset means no ceiling.
    #[serde(default)]
    pub max_limit: Option<usize>,
    #[serde(default = "default_collector_timeout_ms")]
    pub collector_timeout_ms: u64,

    #[serde(default = "default_follow_weight")]
    pub follow_weight: f64,
    #[serde(default = "default_tag_weight")]
    pub tag_weight: f64,
    #[serde(default = "default_popularity_cap")]
    pub popularity_cap: f64,
    #[serde(default = "default_popularity_divisor")]
    pub popularity_divisor: f64,
    #[serde(default = "default_recency_max")]
    pub recency_max: f64,

    #[serde(default = "default_signal_window_days")]
    pub signal_window_days: i64,
    #[serde(default = "default_fallback_window_days")]
    pub fallback_window_days: i64,
    #[serde(default = "default_top_tags")]
    pub top_tags: usize,
    #[serde(default = "default_follow_cap_multiplier")]
    pub follow_cap_multiplier: usize,
}

/// Fixed per-signal contributions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalWeights {
    pub follow: f64,
    pub tag: f64,
    pub popularity_cap: f64,
    pub popularity_divisor: f64,
    pub recency_max: f64,
}

/// Longest accepted look-back window, in days.
pub const MAX_WINDOW_DAYS: i64 = 3_650;

/// Look-back windows, in whole days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalWindows {
    pub signal_days: i64,
    pub fallback_days: i64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: None,
            collector_timeout_ms: default_collector_timeout_ms(),
            follow_weight: default_follow_weight(),
            tag_weight: default_tag_weight(),
            popularity_cap: default_popularity_cap(),
            popularity_divisor: default_popularity_divisor(),
            recency_max: default_recency_max(),
            signal_window_days: default_signal_window_days(),
            fallback_window_days: default_fallback_window_days(),
            top_tags: default_top_tags(),
            follow_cap_multiplier: default_follow_cap_multiplier(),
        }
    }
}

impl RankingConfig {
    pub fn weights(&self) -> SignalWeights {
        SignalWeights {
            follow: self.follow_weight,
            tag: self.tag_weight,
            popularity_cap: self.popularity_cap,
            popularity_divisor: self.popularity_divisor,
            recency_max: self.recency_max,
        }
    }

    pub fn windows(&self) -> SignalWindows {
        SignalWindows {
            signal_days: self.signal_window_days,
            fallback_days: self.fallback_window_days,
        }
    }

    pub fn collector_timeout(&self) -> Duration {
        Duration::from_millis(self.collector_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_limit == 0 {
            return Err(RankingError::InvalidInput(
                "default_limit must be positive".to_string(),
            ));
        }
        if let Some(max_limit) = self.max_limit {
            if max_limit == 0 || self.default_limit > max_limit {
                return Err(RankingError::InvalidInput(format!(
                    "max_limit must be positive and at least default_limit ({})",
                    self.default_limit
                )));
            }
        }
        for (name, days) in [
            ("signal_window_days", self.signal_window_days),
            ("fallback_window_days", self.fallback_window_days),
        ] {
            if !(1..=MAX_WINDOW_DAYS).contains(&days) {
                return Err(RankingError::InvalidInput(format!(
                    "{name} must be in 1..={MAX_WINDOW_DAYS}, got {days}"
                )));
            }
        }
        if self.popularity_divisor <= 0.0 {
            return Err(RankingError::InvalidInput(
                "popularity_divisor must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config {
            service: envy::from_env::<ServiceConfig>()?,
            database: envy::prefixed("DATABASE_").from_env::<DatabaseConfig>()?,
            ranking: envy::prefixed("RANKING_").from_env::<RankingConfig>()?,
        };
        config.ranking.validate()?;

        Ok(config)
    }
}

fn default_service_name() -> String {
    "feed-ranking".to_string()
}

fn default_app_env() -> String {
    "development".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_limit() -> usize {
    20
}

fn default_collector_timeout_ms() -> u64 {
    2_000
}

fn default_follow_weight() -> f64 {
    10.0
}

fn default_tag_weight() -> f64 {
    5.0
}

fn default_popularity_cap() -> f64 {
    3.0
}

fn default_popularity_divisor() -> f64 {
    10.0
}

fn default_recency_max() -> f64 {
    2.0
}

fn default_signal_window_days() -> i64 {
    7
}

fn default_fallback_window_days() -> i64 {
    30
}

fn default_top_tags() -> usize {
    10
}

fn default_follow_cap_multiplier() -> usize {
    2
}
