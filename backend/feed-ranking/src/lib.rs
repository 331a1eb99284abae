pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod store;
pub mod utils;

pub use config::Config;
pub use error::{RankingError, Result};
pub use services::RecommendationEngine;
pub use store::{InMemoryStore, PgStore, Stores};
