use anyhow::{Context, Result};
use chrono::Utc;
use feed_ranking::config::LogFormat;
use feed_ranking::{Config, PgStore, RecommendationEngine, Stores};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Prints the explained feed for a viewer as JSON.
///
/// Usage: `feed-ranking [viewer_id|-] [limit]`
#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("Failed to load config")?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.service.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init(),
    }

    let mut args = std::env::args().skip(1);
    let viewer_id = match args.next().as_deref() {
        None | Some("-") => None,
        Some(raw) => Some(
            raw.parse::<i64>()
                .with_context(|| format!("viewer_id must be an integer, got {raw}"))?,
        ),
    };
    let limit = match args.next() {
        Some(raw) => raw
            .parse::<usize>()
            .with_context(|| format!("limit must be a positive integer, got {raw}"))?,
        None => config.ranking.default_limit,
    };

    info!(
        service = %config.service.service_name,
        env = %config.service.app_env,
        viewer_id = ?viewer_id,
        limit = limit,
        "Computing feed"
    );

    let store = PgStore::connect(&config.database.url, config.database.max_connections)
        .await
        .context("Failed to connect to Postgres")?;
    let engine = RecommendationEngine::new(Stores::shared(Arc::new(store)), config.ranking)
        .context("Invalid ranking config")?;

    let feed = engine
        .recommend_explained(viewer_id, limit, Utc::now())
        .await
        .context("Ranking failed")?;

    println!("{}", serde_json::to_string_pretty(&feed)?);

    Ok(())
}
