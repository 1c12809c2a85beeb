//! RSS/Atom feed source.

use chrono::{DateTime, Utc};
use feed_rs::parser;
use reqwest::Client;
use tracing::debug;

use super::fetcher::{fetch_body, LinkFetcher};
use super::types::Link;
use crate::{FreebiesError, Result};

/// Parse feed bytes, keeping entries published strictly after `since`.
///
/// An entry's time is its `published` date, or `updated` when absent.
/// Entries without a link or a time are skipped.
pub fn parse_feed_links(bytes: &[u8], since: DateTime<Utc>) -> Result<Vec<Link>> {
    let feed = parser::parse(bytes)
        .map_err(|e| FreebiesError::Fetch(format!("failed to parse feed: {}", e)))?;

    let links = feed
        .entries
        .into_iter()
        .filter_map(|entry| {
            let published_at = entry.published.or(entry.updated)?;
            let href = entry.links.into_iter().next()?.href;
            Some(Link::new(href, published_at))
        })
        .filter(|link| link.published_at > since)
        .collect();

    Ok(links)
}

/// Fetcher for an RSS or Atom feed.
#[derive(Debug)]
pub struct FeedFetcher {
    client: Client,
    url: String,
    max_body_bytes: u64,
}

impl FeedFetcher {
    /// Create a fetcher for `url`.
    pub fn new(client: Client, url: impl Into<String>, max_body_bytes: u64) -> Self {
        Self {
            client,
            url: url.into(),
            max_body_bytes,
        }
    }

    /// Feed URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl LinkFetcher for FeedFetcher {
    async fn fetch(&self, since: DateTime<Utc>) -> Result<Vec<Link>> {
        let body = fetch_body(&self.client, &self.url, self.max_body_bytes).await?;
        let links = parse_feed_links(&body, since)?;
        debug!(count = links.len(), %since, "Parsed feed");
        Ok(links)
    }
}
