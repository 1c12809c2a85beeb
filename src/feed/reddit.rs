//! Reddit listing source.
//!
//! Polls the JSON form of a subreddit's "new" page. Promoted, stickied,
//! moderator and expired posts are never returned.

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::fetcher::{fetch_body, LinkFetcher};
use super::types::Link;
use crate::{FreebiesError, Result};

/// Flair classes that mark posts which are not giveaways (case-insensitive).
const SKIPPED_FLAIRS: &[&str] = &["modpost", "expired"];

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: Post,
}

#[derive(Debug, Deserialize)]
struct Post {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    permalink: Option<String>,
    #[serde(default)]
    is_self: bool,
    created_utc: f64,
    #[serde(default)]
    stickied: bool,
    #[serde(default)]
    promoted: Option<bool>,
    #[serde(default)]
    link_flair_css_class: Option<String>,
}

impl Post {
    fn is_skipped(&self) -> bool {
        if self.stickied || self.promoted.unwrap_or(false) {
            return true;
        }
        match &self.link_flair_css_class {
            Some(flair) => SKIPPED_FLAIRS
                .iter()
                .any(|skipped| flair.eq_ignore_ascii_case(skipped)),
            None => false,
        }
    }

    fn published_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis((self.created_utc * 1000.0).round() as i64)
    }

    /// Self posts link to their relative permalink (`/r/...`), everything
    /// else to the target URL.
    fn into_link(self) -> Option<Link> {
        let published_at = self.published_at()?;
        let href = if self.is_self {
            self.permalink.or(self.url)?
        } else {
            self.url.or(self.permalink)?
        };
        Some(Link::new(href, published_at))
    }
}

/// Parse a listing body, keeping posts created strictly after `since`.
///
/// Listing order (newest first) is preserved.
pub fn parse_listing(bytes: &[u8], since: DateTime<Utc>) -> Result<Vec<Link>> {
    let listing: Listing = serde_json::from_slice(bytes)
        .map_err(|e| FreebiesError::Fetch(format!("failed to parse listing: {}", e)))?;

    let links = listing
        .data
        .children
        .into_iter()
        .map(|child| child.data)
        .filter(|post| !post.is_skipped())
        .filter_map(Post::into_link)
        .filter(|link| link.published_at > since)
        .collect();

    Ok(links)
}

/// Fetcher for a Reddit JSON listing.
#[derive(Debug)]
pub struct RedditFetcher {
    client: Client,
    url: String,
    max_body_bytes: u64,
}

impl RedditFetcher {
    /// Create a fetcher for `url`.
    pub fn new(client: Client, url: impl Into<String>, max_body_bytes: u64) -> Self {
        Self {
            client,
            url: url.into(),
            max_body_bytes,
        }
    }

    /// Listing URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl LinkFetcher for RedditFetcher {
    async fn fetch(&self, since: DateTime<Utc>) -> Result<Vec<Link>> {
        let body = fetch_body(&self.client, &self.url, self.max_body_bytes).await?;
        let links = parse_listing(&body, since)?;
        debug!(count = links.len(), %since, "Parsed reddit listing");
        Ok(links)
    }
}
