use crate::config::Config;
use crate::db::Backend;
use crate::error::{Result, StoreError};
use crate::feed::FeedFetcher;
use crate::models::{ArticleRecord, ParsedFeed, SourceRecord};
use crate::store::{ContentStore, Deletion, RefreshSummary};

/// Which articles a listing includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArticleFilter {
    #[default]
    Visible,
    IncludeTombstoned,
}

/// Store plus fetcher: the operations the command line drives.
pub struct App {
    pub store: ContentStore,
    fetcher: FeedFetcher,
}

impl App {
    pub async fn new(config: &Config) -> Result<Self> {
        let backend = Backend::open(config).await?;
        let fetcher = FeedFetcher::new(config)?;
        Ok(Self::with_parts(ContentStore::new(backend), fetcher))
    }

    pub fn with_parts(store: ContentStore, fetcher: FeedFetcher) -> Self {
        Self { store, fetcher }
    }

    /// Fetches a feed, registers its source and stores its first snapshot.
    pub async fn add_feed(&self, feed_url: &str) -> Result<(SourceRecord, RefreshSummary)> {
        let parsed = self.fetcher.fetch_and_normalize(feed_url).await?;
        self.ingest(&parsed).await
    }

    /// Registers the snapshot's source and reconciles its articles. If the
    /// first refresh fails the source is unregistered again, so the feed can
    /// be re-added later.
    pub async fn ingest(&self, parsed: &ParsedFeed) -> Result<(SourceRecord, RefreshSummary)> {
        let source = self.store.add_source(parsed.source.clone()).await?;
        match self.store.refresh_feed(&source.id, parsed).await {
            Ok(summary) => Ok((source, summary)),
            Err(e) => {
                tracing::warn!("Initial refresh of {} failed: {}", source.feed_url, e);
                if let Err(rollback) = self.store.delete_source(&source.id).await {
                    tracing::warn!("Could not unregister {}: {}", source.id, rollback);
                }
                Err(e)
            }
        }
    }

    pub async fn refresh_source(&self, source_id: &str) -> Result<RefreshSummary> {
        let source = self
            .store
            .get_source_by_id(source_id)
            .await?
            .ok_or_else(|| StoreError::SourceNotFound {
                id: source_id.to_string(),
            })?;
        let parsed = self.fetcher.fetch_and_normalize(&source.feed_url).await?;
        self.store.refresh_feed(&source.id, &parsed).await
    }

    /// Refreshes every source. One source failing does not stop the others;
    /// each result is reported alongside its source.
    pub async fn refresh_all(&self) -> Result<Vec<(SourceRecord, Result<RefreshSummary>)>> {
        let sources = self.store.get_all_sources().await?;
        let fetched = self.fetcher.fetch_all(sources).await;

        let mut results = Vec::with_capacity(fetched.len());
        for (source, parsed) in fetched {
            let outcome = match parsed {
                Ok(parsed) => self.store.refresh_feed(&source.id, &parsed).await,
                Err(e) => Err(e),
            };
            if let Err(e) = &outcome {
                tracing::warn!("Refresh of {} failed: {}", source.feed_url, e);
            }
            results.push((source, outcome));
        }
        Ok(results)
    }

    pub async fn list_articles(
        &self,
        source_id: Option<&str>,
        filter: ArticleFilter,
    ) -> Result<Vec<ArticleRecord>> {
        match (source_id, filter) {
            (Some(id), ArticleFilter::Visible) => self.store.get_articles_for_source_id(id).await,
            (Some(id), ArticleFilter::IncludeTombstoned) => Ok(self
                .store
                .get_all_articles()
                .await?
                .into_iter()
                .filter(|a| a.source_id == id)
                .collect()),
            (None, ArticleFilter::Visible) => self.store.get_articles().await,
            (None, ArticleFilter::IncludeTombstoned) => self.store.get_all_articles().await,
        }
    }

    pub async fn delete_article(&self, id: &str) -> Result<Deletion> {
        self.store.delete_article(id).await
    }

    pub async fn delete_source(&self, id: &str) -> Result<()> {
        self.store.delete_source(id).await
    }

    pub async fn clear(&self) -> Result<()> {
        self.store.clear_store().await
    }
}
