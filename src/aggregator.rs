use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future;
use futures::stream::{self, StreamExt};
use tracing::{debug, info};

use crate::article::{sort_newest_first, Article};
use crate::domain::extract_domain;
use crate::error_log::ErrorSink;
use crate::fetcher::Fetcher;
use crate::identity::IdentityResolver;
use crate::parser::{parse_with_retry, Feed};
use crate::sanitize::sanitize;

pub struct Aggregator {
    fetcher: Fetcher,
    resolver: IdentityResolver,
    sink: Arc<dyn ErrorSink>,
    max_concurrency: Option<usize>,
}

impl Aggregator {
    pub fn new(fetcher: Fetcher, resolver: IdentityResolver, sink: Arc<dyn ErrorSink>) -> Self {
        Self {
            fetcher,
            resolver,
            sink,
            max_concurrency: None,
        }
    }

    /// Cap the number of feeds in flight. `None` or zero runs every feed at once.
    pub fn with_max_concurrency(mut self, limit: Option<usize>) -> Self {
        self.max_concurrency = limit.filter(|&n| n > 0);
        self
    }

    /// Fetch the latest post of every feed and return them newest first.
    ///
    /// Feeds that fail or have no items are left out. Equal publish times are
    /// ordered by position in `feed_urls`.
    pub async fn aggregate(&self, feed_urls: &[String]) -> Vec<Article> {
        if feed_urls.is_empty() {
            return Vec::new();
        }

        let limit = self.max_concurrency.unwrap_or(feed_urls.len());
        info!("Fetching {} feeds ({} at a time)", feed_urls.len(), limit);

        let mut results: Vec<(usize, Article)> = stream::iter(feed_urls.iter().enumerate())
            .map(|(index, url)| async move { self.process(url).await.map(|a| (index, a)) })
            .buffer_unordered(limit)
            .filter_map(future::ready)
            .collect()
            .await;

        results.sort_by_key(|(index, _)| *index);
        let mut articles: Vec<Article> = results.into_iter().map(|(_, a)| a).collect();
        sort_newest_first(&mut articles);

        info!(
            "Collected {} articles from {} feeds",
            articles.len(),
            feed_urls.len()
        );
        articles
    }

    /// Run one feed through fetch, sanitize, parse and resolve. Failures are
    /// already recorded in the error sink, so they surface here as `None`.
    pub async fn process(&self, url: &str) -> Option<Article> {
        let payload = self.fetcher.fetch(url, self.sink.as_ref()).await.ok()?;
        let cleaned = sanitize(&payload);
        let feed = parse_with_retry(&cleaned, url, self.fetcher.policy(), self.sink.as_ref())
            .await
            .ok()?;

        let article = build_article(&feed, &self.resolver, Utc::now());
        if article.is_none() {
            debug!("Feed has no items: {}", url);
        }
        article
    }
}

/// Build the article for a feed's first item, or `None` for an empty feed.
/// `now` stands in for items that carry no date at all.
pub fn build_article(
    feed: &Feed,
    resolver: &IdentityResolver,
    now: DateTime<Utc>,
) -> Option<Article> {
    let item = feed.items.first()?;
    let (name, avatar) = resolver.resolve(&feed.title);

    let domain_name = if feed.link.is_empty() {
        String::new()
    } else {
        extract_domain(&feed.link).unwrap_or_else(|e| {
            debug!("No domain for '{}': {}", feed.title, e);
            String::new()
        })
    };

    Some(Article::new(
        domain_name,
        name,
        item.title.clone(),
        item.link.clone(),
        avatar,
        item.timestamp_or(now),
    ))
}
