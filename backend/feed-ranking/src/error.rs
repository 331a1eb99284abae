use thiserror::Error;

/// Errors surfaced by a ranking call.
///
/// A missing viewer, a stale item reference or a collector timeout are not
/// errors; they are absorbed by the pipeline.
#[derive(Debug, Error)]
pub enum RankingError {
    #[error("Data source failure: {0}")]
    DataSource(#[from] sqlx::Error),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(#[from] envy::Error),
}

pub type Result<T> = std::result::Result<T, RankingError>;
