use std::time::Duration;

use futures::stream::{self, StreamExt};
use reqwest::Client;
use url::Url;

use crate::config::Config;
use crate::error::{Result, StoreError};
use crate::models::{ParsedFeed, SourceRecord};

use super::normalizer::normalize;

/// HTTP front end for the normalizer. Never retries; a failed fetch is
/// reported and left to the caller.
pub struct FeedFetcher {
    client: Client,
    max_concurrent: usize,
}

impl FeedFetcher {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            client,
            max_concurrent: config.max_concurrent_fetches.max(1),
        })
    }

    /// Downloads the raw feed document.
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let url = Url::parse(url)?;
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(StoreError::Fetch(response.status()));
        }

        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }

    /// Fetches and normalizes `url`, stamping the snapshot with it.
    pub async fn fetch_and_normalize(&self, url: &str) -> Result<ParsedFeed> {
        let document = self.fetch(url).await?;
        let parsed = normalize(&document)?.with_feed_url(url);
        tracing::debug!("Fetched {} articles from {}", parsed.articles.len(), url);
        Ok(parsed)
    }

    /// Fetches every source concurrently, at most `max_concurrent_fetches`
    /// at a time. Results come back in completion order.
    pub async fn fetch_all(
        &self,
        sources: Vec<SourceRecord>,
    ) -> Vec<(SourceRecord, Result<ParsedFeed>)> {
        stream::iter(sources)
            .map(|source| async move {
                let result = self.fetch_and_normalize(&source.feed_url).await;
                if let Err(e) = &result {
                    tracing::debug!("Failed to fetch {}: {}", source.feed_url, e);
                }
                (source, result)
            })
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_malformed_urls_before_sending() {
        let fetcher = FeedFetcher::new(&Config::default()).unwrap();
        let err = fetcher.fetch("not a url").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn fetch_all_of_nothing_is_empty() {
        let fetcher = FeedFetcher::new(&Config::default()).unwrap();
        assert!(fetcher.fetch_all(Vec::new()).await.is_empty());
    }
}
