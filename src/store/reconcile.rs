use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::Serialize;
use tracing::{debug, info};

use crate::db::{Changeset, StorageBackend};
use crate::error::{Result, StoreError};
use crate::models::{is_blank, ArticleRecord, Freshness, ParsedFeed, SourceRecord};

use super::{ensure_unique, ContentStore};

/// Counts from one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RefreshSummary {
    /// Items stored for the first time.
    pub added: usize,
    /// Stored items present in the snapshot.
    pub current: usize,
    /// Stored items missing from the snapshot.
    pub stale: usize,
}

impl fmt::Display for RefreshSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} new, {} current, {} stale",
            self.added, self.current, self.stale
        )
    }
}

/// Buffered outcome of a refresh; nothing is written until the whole snapshot
/// has been evaluated.
#[derive(Debug, Default)]
pub(crate) struct RefreshPlan {
    pub(crate) changes: Changeset,
    pub(crate) summary: RefreshSummary,
}

/// Diffs `feed` against the `stored` articles of `source`.
///
/// Each snapshot item is first tried as a new article. A `DuplicateContent`
/// rejection means the item is already stored and marks it Current; any other
/// error aborts the plan. Stored articles whose sha was not seen become Stale,
/// tombstoned ones included. Only records whose state actually changes end up
/// in the changeset.
pub(crate) fn plan_refresh(
    source: &SourceRecord,
    stored: &[ArticleRecord],
    feed: &ParsedFeed,
) -> Result<RefreshPlan> {
    let index: HashMap<&str, usize> = stored
        .iter()
        .enumerate()
        .map(|(i, article)| (article.id.as_str(), i))
        .collect();
    let mut next: Vec<Freshness> = stored.iter().map(|article| article.freshness).collect();
    let mut seen: HashSet<String> = HashSet::new();
    let mut plan = RefreshPlan::default();

    for article in &feed.articles {
        let candidate = ArticleRecord::new(&source.id, article.clone())?;
        if seen.contains(&candidate.sha) {
            debug!("Skipping repeated item {} in snapshot", candidate.id);
            continue;
        }

        let existing = index.get(candidate.id.as_str()).map(|&i| &stored[i]);
        match ensure_unique(existing, &candidate) {
            Ok(()) => {
                debug!("New article {}", candidate.id);
                seen.insert(candidate.sha.clone());
                plan.changes.put_articles.push(candidate);
                plan.summary.added += 1;
            }
            Err(err) if err.is_duplicate_content() => {
                if let Some(&i) = index.get(candidate.id.as_str()) {
                    next[i] = Freshness::Current;
                    plan.summary.current += 1;
                }
                seen.insert(candidate.sha);
            }
            Err(err) => return Err(err),
        }
    }

    for (i, article) in stored.iter().enumerate() {
        if !seen.contains(&article.sha) {
            next[i] = Freshness::Stale;
            plan.summary.stale += 1;
        }
    }

    for (article, freshness) in stored.iter().zip(next) {
        if article.freshness != freshness {
            debug!("Article {}: {} -> {}", article.id, article.freshness, freshness);
            let mut updated = article.clone();
            updated.freshness = freshness;
            plan.changes.put_articles.push(updated);
        }
    }

    Ok(plan)
}

impl<B: StorageBackend> ContentStore<B> {
    /// Reconciles a freshly normalized snapshot into the stored articles of
    /// `source_id`. Never deletes; absent articles are only flagged Stale.
    ///
    /// The whole pass runs under the source's lock and lands as a single
    /// backend commit, so a failure leaves the previous state untouched.
    pub async fn refresh_feed(&self, source_id: &str, feed: &ParsedFeed) -> Result<RefreshSummary> {
        let _guard = self.locks.acquire(source_id).await;
        let source = self
            .backend
            .source(source_id)
            .await?
            .ok_or_else(|| StoreError::SourceNotFound {
                id: source_id.to_string(),
            })?;

        if !is_blank(&feed.source.feed_url) && feed.source.feed_url != source.feed_url {
            return Err(StoreError::SourceNotFound {
                id: feed.source.feed_url.clone(),
            });
        }

        let stored = self.backend.articles_for_source(&source.id).await?;
        let plan = plan_refresh(&source, &stored, feed)?;
        self.backend.commit(plan.changes).await?;

        info!("Refreshed {}: {}", source.feed_url, plan.summary);
        Ok(plan.summary)
    }

    /// Like [`Self::refresh_feed`], locating the source by the snapshot's
    /// feed URL.
    pub async fn refresh_parsed_feed(&self, feed: &ParsedFeed) -> Result<RefreshSummary> {
        let feed_url = &feed.source.feed_url;
        if is_blank(feed_url) {
            return Err(StoreError::FieldRequired("feed_url"));
        }
        let source = self
            .backend
            .source_by_feed_url(feed_url)
            .await?
            .ok_or_else(|| StoreError::SourceNotFound {
                id: feed_url.clone(),
            })?;
        self.refresh_feed(&source.id, feed).await
    }
}
