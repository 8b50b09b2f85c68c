//! Deterministic identifiers for sources and articles.
//!
//! Ids are content-addressed so that repeated fetches of the same logical
//! item map onto the same record without relying on feed-supplied guids.
//!
//! * source id: `"S-" + hex(SHA1(feed_url))`
//! * article sha: `hex(SHA256(source_id + disambiguator + link))`, where the
//!   disambiguator is the external id if present, else the title, and a
//!   missing link contributes nothing
//! * article id: `"A-" + hex(SHA1(sha))`

use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::error::{Result, StoreError};
use crate::models::{is_blank, Article};

pub const SOURCE_ID_PREFIX: &str = "S-";
pub const ARTICLE_ID_PREFIX: &str = "A-";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArticleIdentity {
    pub sha: String,
    pub id: String,
}

pub fn derive_source_id(feed_url: &str) -> Result<String> {
    if is_blank(feed_url) {
        return Err(StoreError::FieldRequired("feed_url"));
    }
    Ok(format!("{SOURCE_ID_PREFIX}{}", sha1_hex(feed_url)))
}

pub fn derive_article_identity(source_id: &str, article: &Article) -> Result<ArticleIdentity> {
    if is_blank(source_id) {
        return Err(StoreError::FieldRequired("source_id"));
    }
    let disambiguator = article
        .disambiguator()
        .ok_or(StoreError::FieldRequired("external_id or title"))?;

    let mut hasher = Sha256::new();
    hasher.update(source_id.as_bytes());
    hasher.update(disambiguator.as_bytes());
    hasher.update(article.link.as_deref().unwrap_or_default().as_bytes());
    let sha = hex::encode(hasher.finalize());

    let id = article_id_for_sha(&sha);
    Ok(ArticleIdentity { sha, id })
}

pub fn article_id_for_sha(sha: &str) -> String {
    format!("{ARTICLE_ID_PREFIX}{}", sha1_hex(sha))
}

fn sha1_hex(input: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn is_source_id(id: &str) -> bool {
    has_hex_suffix(id, SOURCE_ID_PREFIX)
}

pub fn is_article_id(id: &str) -> bool {
    has_hex_suffix(id, ARTICLE_ID_PREFIX)
}

fn has_hex_suffix(id: &str, prefix: &str) -> bool {
    id.strip_prefix(prefix).is_some_and(|hex| {
        hex.len() == 40 && hex.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    })
}
