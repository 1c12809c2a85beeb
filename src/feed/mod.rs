//! Content sources and link filtering.

pub mod fetcher;
pub mod filter;
pub mod reddit;
pub mod rss;
pub mod types;

pub use fetcher::{build_client, LinkFetcher, Source};
pub use filter::{builtin_rule, InclusionFilter, Rule, BUILTIN_RULES};
pub use reddit::{parse_listing, RedditFetcher};
pub use rss::{parse_feed_links, FeedFetcher};
pub use types::{links_after, Link};
