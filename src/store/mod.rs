//! The content store: validation, uniqueness and the delete lifecycle on top
//! of a [`StorageBackend`].

mod locks;
mod reconcile;

use tracing::{debug, info};

use crate::db::{Backend, Changeset, StorageBackend};
use crate::error::{Result, StoreError};
use crate::models::{Article, ArticleRecord, Freshness, Source, SourceRecord};

use locks::SourceLocks;

pub use reconcile::RefreshSummary;

/// Explicit store handle. Every caller (and every test) owns its own
/// instance; there is no process-wide store.
pub struct ContentStore<B: StorageBackend = Backend> {
    backend: B,
    locks: SourceLocks,
}

/// Outcome of applying the delete rule to one article.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deletion {
    /// The article was not Stale and is now hidden from default listings.
    Tombstoned,
    /// The article was Stale and has been physically removed.
    Removed,
}

impl<B: StorageBackend> ContentStore<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            locks: SourceLocks::default(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    // Source operations

    pub async fn add_source(&self, source: Source) -> Result<SourceRecord> {
        let record = SourceRecord::new(source)?;
        let _guard = self.locks.acquire(&record.id).await;

        if self.backend.source_by_feed_url(&record.feed_url).await?.is_some() {
            return Err(StoreError::DuplicateKey {
                feed_url: record.feed_url,
            });
        }

        self.backend
            .commit(Changeset::default().put_source(record.clone()))
            .await?;
        info!("Added source {} ({})", record.id, record.feed_url);
        Ok(record)
    }

    pub async fn get_source_by_id(&self, id: &str) -> Result<Option<SourceRecord>> {
        self.backend.source(id).await
    }

    pub async fn find_source_by_feed_url(&self, feed_url: &str) -> Result<Option<SourceRecord>> {
        self.backend.source_by_feed_url(feed_url).await
    }

    /// Replaces the descriptive fields of a stored source. The id and feed URL
    /// are fixed at creation.
    pub async fn update_source(&self, update: SourceRecord) -> Result<SourceRecord> {
        let _guard = self.locks.acquire(&update.id).await;
        let mut stored = self.require_source(&update.id).await?;

        stored.merge(update)?;
        self.backend
            .commit(Changeset::default().put_source(stored.clone()))
            .await?;
        Ok(stored)
    }

    /// Removes the source and applies the article delete rule to each of its
    /// articles: Stale ones go away, the rest are tombstoned.
    pub async fn delete_source(&self, id: &str) -> Result<()> {
        let _guard = self.locks.acquire(id).await;
        let source = self.require_source(id).await?;

        let mut changes = Changeset::default().remove_source(source.id.clone());
        let (mut removed, mut tombstoned) = (0, 0);
        for article in self.backend.articles_for_source(id).await? {
            match stage_delete(&mut changes, article) {
                Deletion::Removed => removed += 1,
                Deletion::Tombstoned => tombstoned += 1,
            }
        }

        self.backend.commit(changes).await?;
        info!(
            "Deleted source {} ({} articles removed, {} tombstoned)",
            source.id, removed, tombstoned
        );
        Ok(())
    }

    pub async fn get_all_sources(&self) -> Result<Vec<SourceRecord>> {
        self.backend.sources().await
    }

    pub async fn get_sources_count(&self) -> Result<usize> {
        Ok(self.backend.sources().await?.len())
    }

    /// Deletes every source with the same cascade as [`Self::delete_source`].
    /// Returns the number of sources this call removed.
    pub async fn delete_all_sources(&self) -> Result<usize> {
        let mut count = 0;
        for source in self.backend.sources().await? {
            match self.delete_source(&source.id).await {
                Ok(()) => count += 1,
                // Lost a race with another delete; already satisfied.
                Err(err) if err.is_not_found() => {}
                Err(err) => return Err(err),
            }
        }
        Ok(count)
    }

    // Article operations

    pub async fn add_article(&self, source_id: &str, article: Article) -> Result<ArticleRecord> {
        let record = ArticleRecord::new(source_id, article)?;
        let _guard = self.locks.acquire(source_id).await;
        self.require_source_for_article(source_id).await?;

        let existing = self.backend.article(&record.id).await?;
        ensure_unique(existing.as_ref(), &record)?;

        self.backend
            .commit(Changeset::default().put_article(record.clone()))
            .await?;
        debug!("Added article {} to {}", record.id, source_id);
        Ok(record)
    }

    pub async fn get_article_by_id(&self, id: &str) -> Result<Option<ArticleRecord>> {
        self.backend.article(id).await
    }

    /// Replaces the mutable fields of a stored article; `id`, `sha` and
    /// `source_id` keep their stored values.
    pub async fn update_article(&self, update: ArticleRecord) -> Result<ArticleRecord> {
        let source_id = self.require_article(&update.id).await?.source_id;
        let _guard = self.locks.acquire(&source_id).await;
        let mut stored = self.require_article(&update.id).await?;

        stored.merge(update)?;
        self.backend
            .commit(Changeset::default().put_article(stored.clone()))
            .await?;
        Ok(stored)
    }

    pub async fn update_article_freshness(&self, id: &str, freshness: Freshness) -> Result<ArticleRecord> {
        let source_id = self.require_article(id).await?.source_id;
        let _guard = self.locks.acquire(&source_id).await;
        let mut stored = self.require_article(id).await?;

        stored.freshness = freshness;
        self.backend
            .commit(Changeset::default().put_article(stored.clone()))
            .await?;
        Ok(stored)
    }

    /// Tombstones the article, or removes it outright if it is already Stale.
    pub async fn delete_article(&self, id: &str) -> Result<Deletion> {
        let source_id = self.require_article(id).await?.source_id;
        let _guard = self.locks.acquire(&source_id).await;
        let article = self.require_article(id).await?;

        let mut changes = Changeset::default();
        let outcome = stage_delete(&mut changes, article);
        self.backend.commit(changes).await?;
        debug!("Deleted article {}: {:?}", id, outcome);
        Ok(outcome)
    }

    /// Articles of every source, tombstoned ones excluded.
    pub async fn get_articles(&self) -> Result<Vec<ArticleRecord>> {
        Ok(visible(self.backend.articles().await?))
    }

    /// Articles of every source, tombstoned ones included.
    pub async fn get_all_articles(&self) -> Result<Vec<ArticleRecord>> {
        self.backend.articles().await
    }

    pub async fn get_all_articles_count(&self) -> Result<usize> {
        Ok(self.backend.articles().await?.len())
    }

    /// Applies the delete rule to every stored article. Returns how many
    /// articles this call removed or tombstoned; articles that are already
    /// tombstoned and not Stale are skipped.
    pub async fn delete_all_articles(&self) -> Result<usize> {
        let mut count = 0;
        for article in self.backend.articles().await? {
            if article.is_tombstoned && !article.freshness.is_stale() {
                continue;
            }
            match self.delete_article(&article.id).await {
                Ok(_) => count += 1,
                Err(err) if err.is_not_found() => {}
                Err(err) => return Err(err),
            }
        }
        Ok(count)
    }

    /// Articles of one source, tombstoned ones excluded.
    pub async fn get_articles_for_source_id(&self, source_id: &str) -> Result<Vec<ArticleRecord>> {
        Ok(visible(self.backend.articles_for_source(source_id).await?))
    }

    pub async fn get_articles_count_for_source_id(&self, source_id: &str) -> Result<usize> {
        Ok(self.get_articles_for_source_id(source_id).await?.len())
    }

    pub async fn clear_store(&self) -> Result<()> {
        self.backend.clear().await?;
        info!("Cleared content store");
        Ok(())
    }

    async fn require_source(&self, id: &str) -> Result<SourceRecord> {
        self.backend
            .source(id)
            .await?
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })
    }

    async fn require_source_for_article(&self, source_id: &str) -> Result<SourceRecord> {
        self.backend
            .source(source_id)
            .await?
            .ok_or_else(|| StoreError::SourceNotFound {
                id: source_id.to_string(),
            })
    }

    async fn require_article(&self, id: &str) -> Result<ArticleRecord> {
        self.backend
            .article(id)
            .await?
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })
    }
}

/// Rejects `candidate` when a record already occupies its content address.
pub(crate) fn ensure_unique(existing: Option<&ArticleRecord>, candidate: &ArticleRecord) -> Result<()> {
    match existing {
        Some(_) => Err(StoreError::DuplicateContent {
            sha: candidate.sha.clone(),
        }),
        None => Ok(()),
    }
}

fn stage_delete(changes: &mut Changeset, mut article: ArticleRecord) -> Deletion {
    if article.freshness.is_stale() {
        changes.remove_articles.push(article.id);
        Deletion::Removed
    } else {
        article.is_tombstoned = true;
        changes.put_articles.push(article);
        Deletion::Tombstoned
    }
}

fn visible(articles: Vec<ArticleRecord>) -> Vec<ArticleRecord> {
    articles.into_iter().filter(|a| !a.is_tombstoned).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryBackend;

    const FEED_URL: &str = "https://example.com/feed";

    fn store() -> ContentStore<MemoryBackend> {
        ContentStore::new(MemoryBackend::new())
    }

    async fn store_with_source() -> (ContentStore<MemoryBackend>, SourceRecord) {
        let store = store();
        let source = store
            .add_source(Source::new(FEED_URL, "Example"))
            .await
            .unwrap();
        (store, source)
    }

    #[tokio::test]
    async fn add_source_rejects_duplicate_feed_url() {
        let (store, _) = store_with_source().await;
        let err = store
            .add_source(Source::new(FEED_URL, "Another title"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { ref feed_url } if feed_url == FEED_URL));
        assert_eq!(store.get_sources_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn add_source_validates_required_fields() {
        let store = store();
        assert!(matches!(
            store.add_source(Source::new(FEED_URL, "")).await,
            Err(StoreError::FieldRequired("title"))
        ));
        assert!(matches!(
            store.add_source(Source::new("", "Title")).await,
            Err(StoreError::FieldRequired("feed_url"))
        ));
        assert!(store.get_all_sources().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn add_article_rejects_duplicate_content() {
        let (store, source) = store_with_source().await;
        let article = Article::titled("Hello").with_link("https://example.com/hello");

        let first = store.add_article(&source.id, article.clone()).await.unwrap();
        assert_eq!(first.freshness, Freshness::New);

        let err = store.add_article(&source.id, article).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateContent { ref sha } if *sha == first.sha));
        assert_eq!(store.get_all_articles_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn add_article_requires_known_source() {
        let store = store();
        let err = store
            .add_article("S-0000000000000000000000000000000000000000", Article::titled("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::SourceNotFound { .. }));

        let err = store.add_article("", Article::titled("x")).await.unwrap_err();
        assert!(matches!(err, StoreError::FieldRequired("source_id")));
    }

    #[tokio::test]
    async fn deleting_a_live_article_tombstones_it() {
        let (store, source) = store_with_source().await;
        let article = store.add_article(&source.id, Article::titled("One")).await.unwrap();

        assert_eq!(store.delete_article(&article.id).await.unwrap(), Deletion::Tombstoned);

        let stored = store.get_article_by_id(&article.id).await.unwrap().unwrap();
        assert!(stored.is_tombstoned);
        assert_eq!(stored.freshness, Freshness::New);
        assert!(store.get_articles_for_source_id(&source.id).await.unwrap().is_empty());
        assert!(store.get_articles().await.unwrap().is_empty());
        assert_eq!(store.get_all_articles().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn deleting_a_stale_article_removes_it() {
        let (store, source) = store_with_source().await;
        let article = store.add_article(&source.id, Article::titled("One")).await.unwrap();
        store
            .update_article_freshness(&article.id, Freshness::Stale)
            .await
            .unwrap();

        assert_eq!(store.delete_article(&article.id).await.unwrap(), Deletion::Removed);
        assert!(store.get_article_by_id(&article.id).await.unwrap().is_none());
        assert!(matches!(
            store.delete_article(&article.id).await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn tombstoned_article_is_removed_once_stale() {
        let (store, source) = store_with_source().await;
        let article = store.add_article(&source.id, Article::titled("One")).await.unwrap();
        store.delete_article(&article.id).await.unwrap();
        store
            .update_article_freshness(&article.id, Freshness::Stale)
            .await
            .unwrap();

        assert_eq!(store.delete_article(&article.id).await.unwrap(), Deletion::Removed);
        assert!(store.get_all_articles().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_source_cascades_with_delete_rule() {
        let (store, source) = store_with_source().await;
        let live = store.add_article(&source.id, Article::titled("Live")).await.unwrap();
        let stale = store.add_article(&source.id, Article::titled("Stale")).await.unwrap();
        store
            .update_article_freshness(&stale.id, Freshness::Stale)
            .await
            .unwrap();

        store.delete_source(&source.id).await.unwrap();

        assert!(store.get_source_by_id(&source.id).await.unwrap().is_none());
        assert!(store.get_article_by_id(&stale.id).await.unwrap().is_none());
        let live = store.get_article_by_id(&live.id).await.unwrap().unwrap();
        assert!(live.is_tombstoned);

        assert!(matches!(
            store.delete_source(&source.id).await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn update_source_keeps_identity() {
        let (store, source) = store_with_source().await;
        let mut update = source.clone();
        update.title = "Renamed".into();
        update.feed_url = "https://elsewhere.test/feed".into();

        let updated = store.update_source(update).await.unwrap();
        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.feed_url, FEED_URL);
        assert_eq!(store.get_source_by_id(&source.id).await.unwrap(), Some(updated));

        let mut missing = source;
        missing.id = "S-missing".into();
        assert!(matches!(
            store.update_source(missing).await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn update_article_replaces_mutable_fields() {
        let (store, source) = store_with_source().await;
        let article = store.add_article(&source.id, Article::titled("One")).await.unwrap();

        let mut update = article.clone();
        update.content = Some("Body".into());
        update.sha = "tampered".into();
        let updated = store.update_article(update).await.unwrap();

        assert_eq!(updated.content.as_deref(), Some("Body"));
        assert_eq!(updated.sha, article.sha);
    }

    #[tokio::test]
    async fn counts_and_bulk_deletes() {
        let (store, source) = store_with_source().await;
        store.add_article(&source.id, Article::titled("One")).await.unwrap();
        store.add_article(&source.id, Article::titled("Two")).await.unwrap();
        assert_eq!(store.get_articles_count_for_source_id(&source.id).await.unwrap(), 2);

        assert_eq!(store.delete_all_articles().await.unwrap(), 2);
        assert_eq!(store.get_articles_count_for_source_id(&source.id).await.unwrap(), 0);
        assert_eq!(store.get_all_articles_count().await.unwrap(), 2);

        assert_eq!(store.delete_all_sources().await.unwrap(), 1);
        assert_eq!(store.get_sources_count().await.unwrap(), 0);

        store.clear_store().await.unwrap();
        assert_eq!(store.get_all_articles_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn delete_all_articles_counts_only_what_it_deleted() {
        let (store, source) = store_with_source().await;
        let one = store.add_article(&source.id, Article::titled("One")).await.unwrap();
        store.add_article(&source.id, Article::titled("Two")).await.unwrap();
        store.delete_article(&one.id).await.unwrap();

        assert_eq!(store.delete_all_articles().await.unwrap(), 1);
        assert_eq!(store.delete_all_articles().await.unwrap(), 0);

        store
            .update_article_freshness(&one.id, Freshness::Stale)
            .await
            .unwrap();
        assert_eq!(store.delete_all_articles().await.unwrap(), 1);
        assert!(store.get_article_by_id(&one.id).await.unwrap().is_none());
        assert_eq!(store.get_all_articles_count().await.unwrap(), 1);
    }
}
