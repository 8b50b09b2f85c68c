//! Feed sources and articles in a content-addressed store, with freshness
//! reconciliation of newly fetched feed snapshots.

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod feed;
pub mod identity;
pub mod models;
pub mod store;

pub use config::{BackendKind, Config};
pub use error::{Result, StoreError};
pub use models::{Article, ArticleRecord, Freshness, ParsedFeed, Source, SourceRecord};
pub use store::{ContentStore, Deletion, RefreshSummary};
