//! Link types.

use chrono::{DateTime, Utc};

/// A published giveaway link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Target of the post.
    pub href: String,
    /// When the post was published at the source.
    pub published_at: DateTime<Utc>,
}

impl Link {
    /// Create a new link.
    pub fn new(href: impl Into<String>, published_at: DateTime<Utc>) -> Self {
        Self {
            href: href.into(),
            published_at,
        }
    }
}

/// Select the links published strictly after `since`, oldest first.
///
/// Links with equal timestamps keep the order they had in `links`.
pub fn links_after(links: &[Link], since: DateTime<Utc>) -> Vec<Link> {
    let mut selected: Vec<Link> = links
        .iter()
        .filter(|link| link.published_at > since)
        .cloned()
        .collect();
    selected.sort_by_key(|link| link.published_at);
    selected
}
