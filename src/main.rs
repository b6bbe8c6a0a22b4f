use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use friend_feeds::config::Config;
use friend_feeds::error_log::FileErrorLog;
use friend_feeds::pipeline;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "friend_feeds=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::var("FRIEND_FEEDS_CONFIG")
        .unwrap_or_else(|_| "friend-feeds.toml".to_string());
    let config = Config::load_or_default(&config_path)?;

    let error_log = Arc::new(FileErrorLog::new(&config.error_log_path));

    if let Err(e) = pipeline::run(&config, error_log).await {
        error!("RSS fetch failed: {}", e);
        return Err(e.into());
    }

    info!("RSS fetch completed.");
    Ok(())
}
