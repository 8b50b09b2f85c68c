mod article;
mod freshness;
mod parsed_feed;
mod source;

pub use article::{Article, ArticleRecord};
pub use freshness::Freshness;
pub use parsed_feed::ParsedFeed;
pub use source::{Source, SourceRecord};

pub(crate) fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}
