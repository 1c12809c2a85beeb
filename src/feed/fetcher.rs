//! Content source adapters.
//!
//! A [`LinkFetcher`] returns every link published after a cutoff. The
//! watcher only depends on this trait; [`Source`] picks the concrete
//! implementation from configuration at startup.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;

use super::reddit::RedditFetcher;
use super::rss::FeedFetcher;
use super::types::Link;
use crate::config::SourceConfig;
use crate::{FreebiesError, Result};

/// Supplies links published after a cutoff.
///
/// Implementations must not change anything at the source, and may
/// legitimately return an empty list.
pub trait LinkFetcher: Send + Sync + 'static {
    /// Fetch links published strictly after `since`.
    fn fetch(&self, since: DateTime<Utc>) -> impl Future<Output = Result<Vec<Link>>> + Send;
}

/// Build the HTTP client shared by source adapters.
pub fn build_client(config: &SourceConfig) -> Result<Client> {
    Client::builder()
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .read_timeout(Duration::from_secs(config.read_timeout_secs))
        .timeout(Duration::from_secs(config.total_timeout_secs))
        .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
        .user_agent(config.user_agent.as_str())
        .build()
        .map_err(|e| FreebiesError::Fetch(format!("failed to create HTTP client: {}", e)))
}

/// GET `url` and return the body, enforcing a size limit.
pub(crate) async fn fetch_body(client: &Client, url: &str, max_bytes: u64) -> Result<Vec<u8>> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| FreebiesError::Fetch(format!("failed to fetch {}: {}", url, e)))?;

    if !response.status().is_success() {
        return Err(FreebiesError::Fetch(format!(
            "HTTP error: {}",
            response.status()
        )));
    }

    if let Some(content_length) = response.content_length() {
        if content_length > max_bytes {
            return Err(FreebiesError::Fetch(format!(
                "response too large: {} bytes (max {} bytes)",
                content_length, max_bytes
            )));
        }
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| FreebiesError::Fetch(format!("failed to read response: {}", e)))?;

    if bytes.len() as u64 > max_bytes {
        return Err(FreebiesError::Fetch(format!(
            "response too large: {} bytes (max {} bytes)",
            bytes.len(),
            max_bytes
        )));
    }

    Ok(bytes.to_vec())
}

/// The content source selected at startup.
#[derive(Debug)]
pub enum Source {
    /// Reddit JSON listing.
    Reddit(RedditFetcher),
    /// RSS or Atom feed.
    Feed(FeedFetcher),
}

impl Source {
    /// Build the source described by `config`.
    pub fn from_config(config: &SourceConfig) -> Result<Self> {
        let client = build_client(config)?;
        match config.kind.as_str() {
            "reddit" => Ok(Source::Reddit(RedditFetcher::new(
                client,
                &config.url,
                config.max_body_bytes,
            ))),
            "feed" => Ok(Source::Feed(FeedFetcher::new(
                client,
                &config.url,
                config.max_body_bytes,
            ))),
            other => Err(FreebiesError::Config(format!(
                "unknown source kind: {}",
                other
            ))),
        }
    }

    /// URL being polled.
    pub fn url(&self) -> &str {
        match self {
            Source::Reddit(fetcher) => fetcher.url(),
            Source::Feed(fetcher) => fetcher.url(),
        }
    }
}

impl LinkFetcher for Source {
    async fn fetch(&self, since: DateTime<Utc>) -> Result<Vec<Link>> {
        match self {
            Source::Reddit(fetcher) => fetcher.fetch(since).await,
            Source::Feed(fetcher) => fetcher.fetch(since).await,
        }
    }
}
