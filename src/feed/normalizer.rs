//! RSS/Atom documents to [`ParsedFeed`].

use feed_rs::model::{Entry, Feed, FeedType, Link, Person};
use feed_rs::parser::{self, ParseErrorKind, ParseFeedError};

use crate::error::{Result, StoreError};
use crate::models::{Article, ParsedFeed, Source};

const UNTITLED_FEED: &str = "Untitled Feed";
const UNTITLED_ARTICLE: &str = "Untitled";
const EXCERPT_CHARS: usize = 80;

/// Which rule set applies, decided by the document's root element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedFormat {
    /// `<rss>` root.
    Rss,
    /// `<feed>` root.
    Atom,
}

impl FeedFormat {
    fn of(feed_type: &FeedType) -> Result<Self> {
        match feed_type {
            FeedType::RSS0 | FeedType::RSS2 => Ok(FeedFormat::Rss),
            FeedType::Atom => Ok(FeedFormat::Atom),
            // <rdf:RDF> and JSON Feed
            FeedType::RSS1 | FeedType::JSON => Err(StoreError::UnsupportedFormat),
        }
    }
}

/// Parses a raw feed document. `source.feed_url` is left empty; stamp it with
/// [`ParsedFeed::with_feed_url`] once the fetch URL is known.
pub fn normalize(document: &[u8]) -> Result<ParsedFeed> {
    let feed = parser::parse(document).map_err(|err| match err {
        ParseFeedError::ParseError(ParseErrorKind::NoFeedRoot) => StoreError::UnsupportedFormat,
        other => StoreError::Parse(other),
    })?;

    let parsed = match FeedFormat::of(&feed.feed_type)? {
        FeedFormat::Rss => normalize_rss(feed),
        FeedFormat::Atom => normalize_atom(feed),
    };
    tracing::debug!("Normalized feed with {} articles", parsed.articles.len());
    Ok(parsed)
}

fn normalize_source(feed: &Feed) -> Source {
    Source {
        feed_url: String::new(),
        title: feed
            .title
            .as_ref()
            .map(|t| t.content.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| UNTITLED_FEED.to_string()),
        url: site_link(&feed.links),
        description: feed.description.as_ref().map(|d| d.content.clone()),
    }
}

fn normalize_rss(feed: Feed) -> ParsedFeed {
    let source = normalize_source(&feed);
    let articles = feed
        .entries
        .into_iter()
        .map(|entry| Article {
            // Item guids are unreliable in RSS; identity falls back to the title.
            external_id: None,
            title: entry_title(&entry),
            author: entry.authors.first().map(|a| a.name.clone()),
            link: entry.links.first().map(|l| l.href.clone()),
            content: entry
                .summary
                .as_ref()
                .map(|s| s.content.clone())
                .or_else(|| entry.content.as_ref().and_then(|c| c.body.clone())),
            published_date: entry.published.or(entry.updated),
        })
        .collect();

    ParsedFeed { source, articles }
}

fn normalize_atom(feed: Feed) -> ParsedFeed {
    let source = normalize_source(&feed);
    let feed_person = first_person(&feed.authors, &feed.contributors);

    let articles = feed
        .entries
        .iter()
        .map(|entry| Article {
            external_id: Some(entry.id.clone()).filter(|id| !id.is_empty()),
            title: entry_title(entry),
            author: first_person(&entry.authors, &entry.contributors)
                .or(feed_person)
                .map(render_person),
            link: site_link(&entry.links),
            content: entry
                .content
                .as_ref()
                .and_then(|c| c.body.clone())
                .or_else(|| entry.summary.as_ref().map(|s| s.content.clone())),
            published_date: entry.updated.or(entry.published),
        })
        .collect();

    ParsedFeed { source, articles }
}

/// Every normalized article carries a title. Title-less items (legal in RSS,
/// which only demands a title or a description) take an excerpt of their
/// summary instead, or a placeholder when there is none; the link still
/// separates their identities.
fn entry_title(entry: &Entry) -> Option<String> {
    let title = entry
        .title
        .as_ref()
        .map(|t| t.content.clone())
        .filter(|t| !t.trim().is_empty())
        .or_else(|| {
            entry
                .summary
                .as_ref()
                .map(|s| excerpt(&s.content))
                .filter(|s| !s.is_empty())
        })
        .unwrap_or_else(|| UNTITLED_ARTICLE.to_string());
    Some(title)
}

fn excerpt(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= EXCERPT_CHARS {
        return collapsed;
    }
    let mut short: String = collapsed.chars().take(EXCERPT_CHARS).collect();
    short.push_str("...");
    short
}

fn first_person<'a>(authors: &'a [Person], contributors: &'a [Person]) -> Option<&'a Person> {
    authors.first().or_else(|| contributors.first())
}

fn render_person(person: &Person) -> String {
    match person.uri.as_deref() {
        Some(uri) if !uri.is_empty() => format!("<a href=\"{}\">{}</a>", uri, person.name),
        _ => person.name.clone(),
    }
}

/// Prefers the `alternate` link, which points at the site rather than the
/// document itself.
fn site_link(links: &[Link]) -> Option<String> {
    links
        .iter()
        .find(|l| l.rel.as_deref() == Some("alternate"))
        .or_else(|| links.first())
        .map(|l| l.href.clone())
}
