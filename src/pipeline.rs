use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::aggregator::Aggregator;
use crate::article::Article;
use crate::config::Config;
use crate::error_log::ErrorSink;
use crate::fetcher::{FetchError, Fetcher};
use crate::identity::IdentityResolver;
use crate::output::{write_articles, OutputError};
use crate::sources::{load_avatars, load_feed_list, SourceError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("reading feed list: {0}")]
    FeedList(#[source] SourceError),
    #[error("loading avatars: {0}")]
    Avatars(#[source] SourceError),
    #[error("building HTTP client: {0}")]
    Client(#[from] FetchError),
    #[error("writing output: {0}")]
    Output(#[from] OutputError),
}

/// Load inputs, aggregate every feed, append the static entry and write the
/// result. Returns the articles that were written.
pub async fn run(config: &Config, sink: Arc<dyn ErrorSink>) -> Result<Vec<Article>, PipelineError> {
    let feeds = load_feed_list(&config.feeds_path).map_err(|e| {
        sink.record(&format!("Read feeds error: {}", e));
        PipelineError::FeedList(e)
    })?;
    info!("Loaded {} feeds from {}", feeds.len(), config.feeds_path.display());

    let avatars = load_avatars(&config.avatars_path).map_err(|e| {
        sink.record(&format!("Load avatars error: {}", e));
        PipelineError::Avatars(e)
    })?;
    info!("Loaded {} avatars", avatars.len());

    let fetcher = Fetcher::new(config.retry.clone())?;
    let resolver = IdentityResolver::from_config(&config.identity, avatars);
    let aggregator = Aggregator::new(fetcher, resolver, sink.clone())
        .with_max_concurrency(config.max_concurrency);

    let mut articles = aggregator.aggregate(&feeds).await;
    articles.push(Article::from(&config.static_entry));

    write_articles(&config.output_path, &articles).map_err(|e| {
        let file = config
            .output_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| config.output_path.display().to_string());
        sink.record(&format!("Write {} error: {}", file, e));
        PipelineError::Output(e)
    })?;
    info!(
        "Wrote {} articles to {}",
        articles.len(),
        config.output_path.display()
    );

    Ok(articles)
}
