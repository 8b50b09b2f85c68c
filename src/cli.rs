use clap::{Parser, Subcommand};

use feedstore::app::{App, ArticleFilter};
use feedstore::{ArticleRecord, Deletion, StoreError};

#[derive(Debug, Parser)]
#[command(name = "feedstore", version, about = "Track feeds and the freshness of their articles")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch a feed, track its source and store its articles
    Add { feed_url: String },
    /// Refresh one source, or every source when no id is given
    Refresh { source_id: Option<String> },
    /// List tracked sources
    Sources,
    /// List stored articles
    Articles {
        /// Only articles of this source
        #[arg(long)]
        source: Option<String>,
        /// Include deleted (tombstoned) articles
        #[arg(long)]
        all: bool,
    },
    /// Delete an article
    DeleteArticle { id: String },
    /// Delete a source and its articles
    DeleteSource { id: String },
    /// Remove everything from the store
    Clear,
}

pub async fn run(command: Command, app: &App) -> anyhow::Result<()> {
    match command {
        Command::Add { feed_url } => {
            let (source, summary) = app.add_feed(&feed_url).await?;
            println!("{} {} ({})", source.id, source.title, summary);
        }
        Command::Refresh { source_id: Some(id) } => {
            let summary = app.refresh_source(&id).await?;
            println!("{}: {}", id, summary);
        }
        Command::Refresh { source_id: None } => {
            let results = app.refresh_all().await?;
            let failed = results.iter().filter(|(_, r)| r.is_err()).count();
            for (source, result) in &results {
                match result {
                    Ok(summary) => println!("{} {}: {}", source.id, source.title, summary),
                    Err(e) => println!("{} {}: failed ({})", source.id, source.title, e),
                }
            }
            println!("Refreshed {} feeds, {} failed", results.len() - failed, failed);
        }
        Command::Sources => {
            for source in app.store.get_all_sources().await? {
                let count = app.store.get_articles_count_for_source_id(&source.id).await?;
                println!("{}  {}  {} ({} articles)", source.id, source.feed_url, source.title, count);
            }
        }
        Command::Articles { source, all } => {
            let filter = if all {
                ArticleFilter::IncludeTombstoned
            } else {
                ArticleFilter::Visible
            };
            for article in app.list_articles(source.as_deref(), filter).await? {
                println!("{}", article_line(&article));
            }
        }
        Command::DeleteArticle { id } => match app.delete_article(&id).await {
            Ok(Deletion::Tombstoned) => println!("{} tombstoned", id),
            Ok(Deletion::Removed) => println!("{} removed", id),
            Err(e) if e.is_not_found() => already_removed(&id, &e),
            Err(e) => return Err(e.into()),
        },
        Command::DeleteSource { id } => match app.delete_source(&id).await {
            Ok(()) => println!("{} deleted", id),
            Err(e) if e.is_not_found() => already_removed(&id, &e),
            Err(e) => return Err(e.into()),
        },
        Command::Clear => {
            app.clear().await?;
            println!("Store cleared");
        }
    }
    Ok(())
}

fn already_removed(id: &str, err: &StoreError) {
    tracing::warn!("Delete of {} rejected: {}", id, err);
    println!("{} already removed", id);
}

fn article_line(article: &ArticleRecord) -> String {
    let mut line = format!(
        "{}  {:<7}  {}",
        article.id,
        article.freshness.as_str(),
        article.title.as_deref().unwrap_or("(untitled)")
    );
    if article.is_tombstoned {
        line.push_str("  [deleted]");
    }
    if let Some(link) = &article.link {
        line.push_str("  ");
        line.push_str(link);
    }
    line
}
