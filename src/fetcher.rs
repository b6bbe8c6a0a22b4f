use reqwest::Client;
use thiserror::Error;
use tracing::debug;

use crate::config::RetryPolicy;
use crate::error_log::ErrorSink;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<FetchError>,
    },
}

pub struct Fetcher {
    client: Client,
    policy: RetryPolicy,
}

impl Fetcher {
    pub fn new(policy: RetryPolicy) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(policy.request_timeout())
            .user_agent("FriendFeeds/1.0 (RSS Aggregator)")
            .build()?;

        Ok(Self { client, policy })
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// GET `url`, retrying with a fixed delay. Each failed attempt and the
    /// final give-up are recorded in `sink`.
    pub async fn fetch(&self, url: &str, sink: &dyn ErrorSink) -> Result<Vec<u8>, FetchError> {
        let attempts = self.policy.attempts();
        let mut attempt = 1;

        loop {
            match self.fetch_once(url).await {
                Ok(body) => {
                    debug!("Fetched {} ({} bytes)", url, body.len());
                    return Ok(body);
                }
                Err(e) => {
                    sink.record(&format!(
                        "Get RSS error: {} (attempt {}/{}): {}",
                        url, attempt, attempts, e
                    ));

                    if attempt >= attempts {
                        sink.record(&format!("Failed to fetch RSS: {}: {}", url, e));
                        return Err(FetchError::Exhausted {
                            attempts,
                            last: Box::new(e),
                        });
                    }
                }
            }

            tokio::time::sleep(self.policy.retry_delay()).await;
            attempt += 1;
        }
    }

    async fn fetch_once(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        Ok(response.bytes().await?.to_vec())
    }
}
