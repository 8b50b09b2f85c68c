mod memory;
mod repository;
mod schema;

use async_trait::async_trait;

use crate::config::{BackendKind, Config};
use crate::error::Result;
use crate::models::{ArticleRecord, SourceRecord};

pub use memory::MemoryBackend;
pub use repository::SqliteBackend;

/// A batch of writes applied as one unit. Puts are upserts that keep an
/// existing record's enumeration position; removals run after puts.
#[derive(Debug, Clone, Default)]
pub struct Changeset {
    pub put_sources: Vec<SourceRecord>,
    pub put_articles: Vec<ArticleRecord>,
    pub remove_sources: Vec<String>,
    pub remove_articles: Vec<String>,
}

impl Changeset {
    pub fn is_empty(&self) -> bool {
        self.put_sources.is_empty()
            && self.put_articles.is_empty()
            && self.remove_sources.is_empty()
            && self.remove_articles.is_empty()
    }

    pub fn put_source(mut self, record: SourceRecord) -> Self {
        self.put_sources.push(record);
        self
    }

    pub fn put_article(mut self, record: ArticleRecord) -> Self {
        self.put_articles.push(record);
        self
    }

    pub fn remove_source(mut self, id: impl Into<String>) -> Self {
        self.remove_sources.push(id.into());
        self
    }

    pub fn remove_article(mut self, id: impl Into<String>) -> Self {
        self.remove_articles.push(id.into());
        self
    }
}

/// Logical read/write contract of the persisted content: an ordered id list
/// per record kind plus an id-to-record map.
///
/// Backends hold no business rules; validation, uniqueness and the delete
/// lifecycle live in [`crate::store::ContentStore`].
#[async_trait]
pub trait StorageBackend: Send + Sync + 'static {
    async fn source(&self, id: &str) -> Result<Option<SourceRecord>>;

    async fn source_by_feed_url(&self, feed_url: &str) -> Result<Option<SourceRecord>>;

    /// All sources in insertion order.
    async fn sources(&self) -> Result<Vec<SourceRecord>>;

    async fn article(&self, id: &str) -> Result<Option<ArticleRecord>>;

    /// All articles in insertion order, tombstoned ones included.
    async fn articles(&self) -> Result<Vec<ArticleRecord>>;

    /// Articles of one source in insertion order, tombstoned ones included.
    async fn articles_for_source(&self, source_id: &str) -> Result<Vec<ArticleRecord>>;

    /// Applies every change in `changes` or none of them.
    async fn commit(&self, changes: Changeset) -> Result<()>;

    async fn clear(&self) -> Result<()>;
}

/// Backend chosen at runtime from [`Config::backend`].
pub enum Backend {
    Memory(MemoryBackend),
    Sqlite(SqliteBackend),
}

impl Backend {
    pub async fn open(config: &Config) -> Result<Self> {
        match config.backend {
            BackendKind::Memory => Ok(Backend::Memory(MemoryBackend::new())),
            BackendKind::Sqlite => Ok(Backend::Sqlite(SqliteBackend::new(&config.db_path).await?)),
        }
    }
}

#[async_trait]
impl StorageBackend for Backend {
    async fn source(&self, id: &str) -> Result<Option<SourceRecord>> {
        match self {
            Backend::Memory(b) => b.source(id).await,
            Backend::Sqlite(b) => b.source(id).await,
        }
    }

    async fn source_by_feed_url(&self, feed_url: &str) -> Result<Option<SourceRecord>> {
        match self {
            Backend::Memory(b) => b.source_by_feed_url(feed_url).await,
            Backend::Sqlite(b) => b.source_by_feed_url(feed_url).await,
        }
    }

    async fn sources(&self) -> Result<Vec<SourceRecord>> {
        match self {
            Backend::Memory(b) => b.sources().await,
            Backend::Sqlite(b) => b.sources().await,
        }
    }

    async fn article(&self, id: &str) -> Result<Option<ArticleRecord>> {
        match self {
            Backend::Memory(b) => b.article(id).await,
            Backend::Sqlite(b) => b.article(id).await,
        }
    }

    async fn articles(&self) -> Result<Vec<ArticleRecord>> {
        match self {
            Backend::Memory(b) => b.articles().await,
            Backend::Sqlite(b) => b.articles().await,
        }
    }

    async fn articles_for_source(&self, source_id: &str) -> Result<Vec<ArticleRecord>> {
        match self {
            Backend::Memory(b) => b.articles_for_source(source_id).await,
            Backend::Sqlite(b) => b.articles_for_source(source_id).await,
        }
    }

    async fn commit(&self, changes: Changeset) -> Result<()> {
        match self {
            Backend::Memory(b) => b.commit(changes).await,
            Backend::Sqlite(b) => b.commit(changes).await,
        }
    }

    async fn clear(&self) -> Result<()> {
        match self {
            Backend::Memory(b) => b.clear().await,
            Backend::Sqlite(b) => b.clear().await,
        }
    }
}
