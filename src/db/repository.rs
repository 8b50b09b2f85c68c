use std::path::Path;

use async_trait::async_trait;
use rusqlite::{params, OptionalExtension};
use serde::de::DeserializeOwned;
use tokio_rusqlite::Connection;

use crate::error::Result;
use crate::models::{ArticleRecord, SourceRecord};

use super::schema::SCHEMA;
use super::{Changeset, StorageBackend};

const KIND_SOURCE: &str = "source";
const KIND_ARTICLE: &str = "article";

/// A record flattened into the columns of the `entries` table.
struct EntryRow {
    id: String,
    kind: &'static str,
    source_id: Option<String>,
    feed_url: Option<String>,
    record: String,
}

impl EntryRow {
    fn from_source(source: &SourceRecord) -> Result<Self> {
        Ok(Self {
            id: source.id.clone(),
            kind: KIND_SOURCE,
            source_id: None,
            feed_url: Some(source.feed_url.clone()),
            record: serde_json::to_string(source)?,
        })
    }

    fn from_article(article: &ArticleRecord) -> Result<Self> {
        Ok(Self {
            id: article.id.clone(),
            kind: KIND_ARTICLE,
            source_id: Some(article.source_id.clone()),
            feed_url: None,
            record: serde_json::to_string(article)?,
        })
    }
}

/// Durable backend over a single SQLite database file.
pub struct SqliteBackend {
    conn: Connection,
}

impl SqliteBackend {
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(db_path.as_ref()).await?;
        Self::init(conn).await
    }

    pub async fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self> {
        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    async fn query_one<T: DeserializeOwned>(&self, sql: &'static str, key: String) -> Result<Option<T>> {
        let record = self
            .conn
            .call(move |conn| {
                let record = conn
                    .query_row(sql, params![key], |row| row.get::<_, String>(0))
                    .optional()?;
                Ok(record)
            })
            .await?;
        record.map(|json| decode(&json)).transpose()
    }

    async fn query_all<T: DeserializeOwned>(&self, sql: &'static str, key: Option<String>) -> Result<Vec<T>> {
        let records = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(sql)?;
                let read = |row: &rusqlite::Row| row.get::<_, String>(0);
                let rows = match key {
                    Some(key) => stmt.query_map(params![key], read)?,
                    None => stmt.query_map([], read)?,
                };
                let records = rows.collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(records)
            })
            .await?;
        records.iter().map(|json| decode(json)).collect()
    }
}

fn decode<T: DeserializeOwned>(json: &str) -> Result<T> {
    Ok(serde_json::from_str(json)?)
}

#[async_trait]
impl StorageBackend for SqliteBackend {
    async fn source(&self, id: &str) -> Result<Option<SourceRecord>> {
        self.query_one(
            "SELECT record FROM entries WHERE id = ?1 AND kind = 'source'",
            id.to_string(),
        )
        .await
    }

    async fn source_by_feed_url(&self, feed_url: &str) -> Result<Option<SourceRecord>> {
        self.query_one(
            "SELECT record FROM entries WHERE feed_url = ?1 AND kind = 'source'",
            feed_url.to_string(),
        )
        .await
    }

    async fn sources(&self) -> Result<Vec<SourceRecord>> {
        self.query_all(
            r#"SELECT e.record FROM source_keys k
               JOIN entries e ON e.id = k.id
               ORDER BY k.seq"#,
            None,
        )
        .await
    }

    async fn article(&self, id: &str) -> Result<Option<ArticleRecord>> {
        self.query_one(
            "SELECT record FROM entries WHERE id = ?1 AND kind = 'article'",
            id.to_string(),
        )
        .await
    }

    async fn articles(&self) -> Result<Vec<ArticleRecord>> {
        self.query_all(
            r#"SELECT e.record FROM article_keys k
               JOIN entries e ON e.id = k.id
               ORDER BY k.seq"#,
            None,
        )
        .await
    }

    async fn articles_for_source(&self, source_id: &str) -> Result<Vec<ArticleRecord>> {
        self.query_all(
            r#"SELECT e.record FROM article_keys k
               JOIN entries e ON e.id = k.id
               WHERE e.source_id = ?1
               ORDER BY k.seq"#,
            Some(source_id.to_string()),
        )
        .await
    }

    async fn commit(&self, changes: Changeset) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }

        // Serialize before entering the connection thread so a bad record
        // fails the commit without touching the database.
        let mut rows = Vec::with_capacity(changes.put_sources.len() + changes.put_articles.len());
        for source in &changes.put_sources {
            rows.push(EntryRow::from_source(source)?);
        }
        for article in &changes.put_articles {
            rows.push(EntryRow::from_article(article)?);
        }
        let removals: Vec<String> = changes
            .remove_sources
            .into_iter()
            .chain(changes.remove_articles)
            .collect();

        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                for row in &rows {
                    tx.execute(
                        r#"INSERT INTO entries (id, kind, source_id, feed_url, record)
                           VALUES (?1, ?2, ?3, ?4, ?5)
                           ON CONFLICT(id) DO UPDATE SET
                               source_id = excluded.source_id,
                               feed_url = excluded.feed_url,
                               record = excluded.record,
                               updated_at = datetime('now')"#,
                        params![row.id, row.kind, row.source_id, row.feed_url, row.record],
                    )?;
                    let keys_sql = if row.kind == KIND_SOURCE {
                        "INSERT OR IGNORE INTO source_keys (id) VALUES (?1)"
                    } else {
                        "INSERT OR IGNORE INTO article_keys (id) VALUES (?1)"
                    };
                    tx.execute(keys_sql, params![row.id])?;
                }
                for id in &removals {
                    tx.execute("DELETE FROM entries WHERE id = ?1", params![id])?;
                    tx.execute("DELETE FROM source_keys WHERE id = ?1", params![id])?;
                    tx.execute("DELETE FROM article_keys WHERE id = ?1", params![id])?;
                }
                tx.commit()?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.conn
            .call(|conn| {
                conn.execute_batch(
                    r#"BEGIN;
                       DELETE FROM entries;
                       DELETE FROM source_keys;
                       DELETE FROM article_keys;
                       COMMIT;"#,
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::models::{Article, Freshness, Source};

    fn source(feed_url: &str, title: &str) -> SourceRecord {
        SourceRecord::new(Source::new(feed_url, title)).unwrap()
    }

    #[tokio::test]
    async fn round_trips_records_through_json_column() {
        let backend = SqliteBackend::open_in_memory().await.unwrap();
        let src = source("https://a.test/feed", "A");
        let mut article = ArticleRecord::new(&src.id, Article::titled("One").with_link("https://a.test/1")).unwrap();
        article.freshness = Freshness::Current;

        backend
            .commit(Changeset::default().put_source(src.clone()).put_article(article.clone()))
            .await
            .unwrap();

        assert_eq!(backend.source(&src.id).await.unwrap(), Some(src.clone()));
        assert_eq!(backend.article(&article.id).await.unwrap(), Some(article.clone()));
        assert_eq!(
            backend.source_by_feed_url("https://a.test/feed").await.unwrap(),
            Some(src.clone())
        );
        assert_eq!(backend.articles_for_source(&src.id).await.unwrap(), vec![article]);
    }

    #[tokio::test]
    async fn keeps_insertion_order_across_upserts() {
        let backend = SqliteBackend::open_in_memory().await.unwrap();
        let first = source("https://a.test/feed", "A");
        let second = source("https://b.test/feed", "B");
        backend
            .commit(Changeset::default().put_source(first.clone()).put_source(second))
            .await
            .unwrap();

        let mut renamed = first;
        renamed.title = "A2".into();
        backend.commit(Changeset::default().put_source(renamed)).await.unwrap();

        let titles: Vec<_> = backend.sources().await.unwrap().into_iter().map(|s| s.title).collect();
        assert_eq!(titles, vec!["A2", "B"]);
    }

    #[tokio::test]
    async fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feeds.db");
        let src = source("https://a.test/feed", "A");

        {
            let backend = SqliteBackend::new(&path).await.unwrap();
            backend.commit(Changeset::default().put_source(src.clone())).await.unwrap();
        }

        let reopened = SqliteBackend::new(&path).await.unwrap();
        assert_eq!(reopened.sources().await.unwrap(), vec![src]);
    }

    #[tokio::test]
    async fn open_failures_surface_as_database_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("feeds.db");

        let err = SqliteBackend::new(&path).await.err().unwrap();
        assert!(matches!(err, StoreError::Database(_)));
    }

    #[tokio::test]
    async fn removal_and_clear() {
        let backend = SqliteBackend::open_in_memory().await.unwrap();
        let src = source("https://a.test/feed", "A");
        let article = ArticleRecord::new(&src.id, Article::titled("One")).unwrap();
        backend
            .commit(Changeset::default().put_source(src.clone()).put_article(article.clone()))
            .await
            .unwrap();

        backend
            .commit(Changeset::default().remove_article(article.id.clone()))
            .await
            .unwrap();
        assert!(backend.article(&article.id).await.unwrap().is_none());
        assert!(backend.articles().await.unwrap().is_empty());

        backend.clear().await.unwrap();
        assert!(backend.sources().await.unwrap().is_empty());
    }
}
