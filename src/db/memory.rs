use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::models::{ArticleRecord, SourceRecord};

use super::{Changeset, StorageBackend};

#[derive(Debug, Clone)]
enum Entry {
    Source(SourceRecord),
    Article(ArticleRecord),
}

#[derive(Debug, Default)]
struct Content {
    source_keys: Vec<String>,
    article_keys: Vec<String>,
    entries: HashMap<String, Entry>,
}

impl Content {
    fn source(&self, id: &str) -> Option<&SourceRecord> {
        match self.entries.get(id) {
            Some(Entry::Source(record)) => Some(record),
            _ => None,
        }
    }

    fn article(&self, id: &str) -> Option<&ArticleRecord> {
        match self.entries.get(id) {
            Some(Entry::Article(record)) => Some(record),
            _ => None,
        }
    }

    fn articles(&self) -> impl Iterator<Item = &ArticleRecord> {
        self.article_keys.iter().filter_map(|id| self.article(id))
    }

    fn put(&mut self, id: String, entry: Entry) {
        let keys = match entry {
            Entry::Source(_) => &mut self.source_keys,
            Entry::Article(_) => &mut self.article_keys,
        };
        if self.entries.insert(id.clone(), entry).is_none() {
            keys.push(id);
        }
    }

    fn remove(&mut self, id: &str) {
        if self.entries.remove(id).is_some() {
            self.source_keys.retain(|key| key != id);
            self.article_keys.retain(|key| key != id);
        }
    }
}

/// Volatile backend for single-process use and tests.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    content: RwLock<Content>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn source(&self, id: &str) -> Result<Option<SourceRecord>> {
        Ok(self.content.read().await.source(id).cloned())
    }

    async fn source_by_feed_url(&self, feed_url: &str) -> Result<Option<SourceRecord>> {
        let content = self.content.read().await;
        Ok(content
            .source_keys
            .iter()
            .filter_map(|id| content.source(id))
            .find(|source| source.feed_url == feed_url)
            .cloned())
    }

    async fn sources(&self) -> Result<Vec<SourceRecord>> {
        let content = self.content.read().await;
        Ok(content
            .source_keys
            .iter()
            .filter_map(|id| content.source(id))
            .cloned()
            .collect())
    }

    async fn article(&self, id: &str) -> Result<Option<ArticleRecord>> {
        Ok(self.content.read().await.article(id).cloned())
    }

    async fn articles(&self) -> Result<Vec<ArticleRecord>> {
        Ok(self.content.read().await.articles().cloned().collect())
    }

    async fn articles_for_source(&self, source_id: &str) -> Result<Vec<ArticleRecord>> {
        Ok(self
            .content
            .read()
            .await
            .articles()
            .filter(|article| article.source_id == source_id)
            .cloned()
            .collect())
    }

    async fn commit(&self, changes: Changeset) -> Result<()> {
        let mut content = self.content.write().await;
        for record in changes.put_sources {
            content.put(record.id.clone(), Entry::Source(record));
        }
        for record in changes.put_articles {
            content.put(record.id.clone(), Entry::Article(record));
        }
        for id in changes.remove_sources.iter().chain(&changes.remove_articles) {
            content.remove(id);
        }
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.content.write().await = Content::default();
        Ok(())
    }
}
