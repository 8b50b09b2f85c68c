use serde::{Deserialize, Serialize};

use super::{Article, Source};

/// Canonical output of the feed normalizer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedFeed {
    pub source: Source,
    pub articles: Vec<Article>,
}

impl ParsedFeed {
    pub fn new(source: Source, articles: Vec<Article>) -> Self {
        Self { source, articles }
    }

    /// Stamps the URL the document was fetched from; feed documents do not
    /// reliably state it themselves.
    pub fn with_feed_url(mut self, feed_url: impl Into<String>) -> Self {
        self.source.feed_url = feed_url.into();
        self
    }
}
