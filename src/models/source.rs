use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::identity::derive_source_id;

use super::is_blank;

/// A feed source as described by a user or by a normalized feed document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub feed_url: String,
    pub title: String,
    pub url: Option<String>,
    pub description: Option<String>,
}

impl Source {
    pub fn new(feed_url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            feed_url: feed_url.into(),
            title: title.into(),
            url: None,
            description: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A stored source. `id` is derived from `feed_url` and never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub id: String,
    pub feed_url: String,
    pub title: String,
    pub url: Option<String>,
    pub description: Option<String>,
}

impl SourceRecord {
    /// Validates `source` and derives its id.
    pub fn new(source: Source) -> Result<Self> {
        if is_blank(&source.title) {
            return Err(StoreError::FieldRequired("title"));
        }
        let id = derive_source_id(&source.feed_url)?;

        Ok(Self {
            id,
            feed_url: source.feed_url,
            title: source.title,
            url: source.url,
            description: source.description,
        })
    }

    /// Takes the descriptive fields from `update`, keeping identity.
    pub fn merge(&mut self, update: SourceRecord) -> Result<()> {
        if is_blank(&update.title) {
            return Err(StoreError::FieldRequired("title"));
        }
        self.title = update.title;
        self.url = update.url;
        self.description = update.description;
        Ok(())
    }

    pub fn to_source(&self) -> Source {
        Source {
            feed_url: self.feed_url.clone(),
            title: self.title.clone(),
            url: self.url.clone(),
            description: self.description.clone(),
        }
    }
}
