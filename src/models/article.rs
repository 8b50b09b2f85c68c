use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::identity::{derive_article_identity, ArticleIdentity};

use super::{is_blank, Freshness};

/// A normalized feed item, before it is bound to a stored source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub external_id: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub link: Option<String>,
    pub content: Option<String>,
    pub published_date: Option<DateTime<Utc>>,
}

impl Article {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn with_external_id(mut self, external_id: impl Into<String>) -> Self {
        self.external_id = Some(external_id.into());
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_published_date(mut self, date: DateTime<Utc>) -> Self {
        self.published_date = Some(date);
        self
    }

    /// The field that distinguishes this item within its source: the
    /// external id when the feed supplies one, otherwise the title.
    pub fn disambiguator(&self) -> Option<&str> {
        self.external_id
            .as_deref()
            .filter(|id| !is_blank(id))
            .or_else(|| self.title.as_deref().filter(|title| !is_blank(title)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub id: String,
    pub sha: String,
    pub source_id: String,
    pub external_id: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub link: Option<String>,
    pub content: Option<String>,
    pub published_date: Option<DateTime<Utc>>,
    pub freshness: Freshness,
    pub is_tombstoned: bool,
}

impl ArticleRecord {
    /// Validates `article` against `source_id` and builds a fresh, untombstoned
    /// record.
    pub fn new(source_id: &str, article: Article) -> Result<Self> {
        let ArticleIdentity { sha, id } = derive_article_identity(source_id, &article)?;

        Ok(Self {
            id,
            sha,
            source_id: source_id.to_string(),
            external_id: article.external_id,
            title: article.title,
            author: article.author,
            link: article.link,
            content: article.content,
            published_date: article.published_date,
            freshness: Freshness::New,
            is_tombstoned: false,
        })
    }

    /// Takes every mutable field from `update`. `id`, `sha` and `source_id`
    /// stay as stored; an update may not leave the record without a
    /// disambiguator.
    pub fn merge(&mut self, update: ArticleRecord) -> Result<()> {
        if update.to_article().disambiguator().is_none() {
            return Err(StoreError::FieldRequired("external_id or title"));
        }
        self.external_id = update.external_id;
        self.title = update.title;
        self.author = update.author;
        self.link = update.link;
        self.content = update.content;
        self.published_date = update.published_date;
        self.freshness = update.freshness;
        self.is_tombstoned = update.is_tombstoned;
        Ok(())
    }

    pub fn to_article(&self) -> Article {
        Article {
            external_id: self.external_id.clone(),
            title: self.title.clone(),
            author: self.author.clone(),
            link: self.link.clone(),
            content: self.content.clone(),
            published_date: self.published_date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE_ID: &str = "S-0123456789abcdef0123456789abcdef01234567";

    #[test]
    fn external_id_wins_over_title() {
        let article = Article::titled("Hello").with_external_id("42");
        assert_eq!(article.disambiguator(), Some("42"));

        let article = Article::titled("Hello").with_external_id("");
        assert_eq!(article.disambiguator(), Some("Hello"));

        assert_eq!(Article::default().disambiguator(), None);
    }

    #[test]
    fn new_record_starts_fresh() {
        let record = ArticleRecord::new(SOURCE_ID, Article::titled("Hello")).unwrap();
        assert_eq!(record.freshness, Freshness::New);
        assert!(!record.is_tombstoned);
        assert_eq!(record.source_id, SOURCE_ID);
        assert!(record.id.starts_with("A-"));
        assert_eq!(record.sha.len(), 64);
    }

    #[test]
    fn missing_disambiguator_is_rejected() {
        let err = ArticleRecord::new(SOURCE_ID, Article::default().with_link("https://x.test")).unwrap_err();
        assert!(matches!(err, StoreError::FieldRequired("external_id or title")));
    }

    #[test]
    fn merge_keeps_identity() {
        let mut record = ArticleRecord::new(SOURCE_ID, Article::titled("Hello")).unwrap();
        let (id, sha) = (record.id.clone(), record.sha.clone());

        let mut update = record.clone();
        update.id = "A-other".into();
        update.sha = "other".into();
        update.source_id = "S-other".into();
        update.content = Some("body".into());
        update.freshness = Freshness::Current;
        record.merge(update).unwrap();

        assert_eq!(record.id, id);
        assert_eq!(record.sha, sha);
        assert_eq!(record.source_id, SOURCE_ID);
        assert_eq!(record.content.as_deref(), Some("body"));
        assert_eq!(record.freshness, Freshness::Current);
    }
}
