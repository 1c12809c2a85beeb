//! Freebies - free game watcher
//!
//! Polls a giveaway source and notifies subscribed Telegram chats about
//! newly published free games.

pub mod bot;
pub mod config;
pub mod datetime;
pub mod db;
pub mod error;
pub mod feed;
pub mod logging;
pub mod metrics;
pub mod notify;
pub mod subscriber;
pub mod watcher;
pub mod web;

pub use bot::{BotPoller, Command, CommandHandler};
pub use config::Config;
pub use db::Database;
pub use error::{FreebiesError, Result};
pub use feed::{InclusionFilter, Link, LinkFetcher, Source};
pub use metrics::Metrics;
pub use notify::{Notifier, TelegramClient};
pub use subscriber::{Subscriber, SubscriberRepository, SubscriberStore};
pub use watcher::{CycleOutcome, CycleReport, FailureKind, Watcher};
pub use web::WebServer;
