use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} is required")]
    FieldRequired(&'static str),

    #[error("a source with feed URL {feed_url} is already tracked")]
    DuplicateKey { feed_url: String },

    #[error("an article with content hash {sha} is already stored")]
    DuplicateContent { sha: String },

    #[error("no record with id {id}")]
    NotFound { id: String },

    #[error("source not found: {id}")]
    SourceNotFound { id: String },

    #[error("unsupported feed format")]
    UnsupportedFormat,

    #[error("feed parse error: {0}")]
    Parse(#[from] feed_rs::parser::ParseFeedError),

    #[error("failed to fetch feed: HTTP {0}")]
    Fetch(reqwest::StatusCode),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("database error: {0}")]
    Database(#[from] tokio_rusqlite::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Reconciliation treats this kind as "still present" rather than a failure.
    pub fn is_duplicate_content(&self) -> bool {
        matches!(self, StoreError::DuplicateContent { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::NotFound { .. } | StoreError::SourceNotFound { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
