//! Subscriber registry.
//!
//! Subscribers are chats that receive new freebies. Each one carries a
//! watermark (`last_post`) that only the watcher moves forward.

pub mod repository;
pub mod types;

pub use repository::SubscriberRepository;
pub use types::{horizon, Subscriber};

use std::future::Future;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::{Database, Result};

/// Registry access needed by the watcher.
pub trait SubscriberStore: Send + Sync + 'static {
    /// Read every current subscriber.
    fn list_subscribers(&self) -> impl Future<Output = Result<Vec<Subscriber>>> + Send;

    /// Durably move a subscriber's watermark to `at`.
    fn advance_last_post(
        &self,
        chat_id: i64,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<()>> + Send;
}

impl SubscriberStore for Database {
    async fn list_subscribers(&self) -> Result<Vec<Subscriber>> {
        SubscriberRepository::new(self.pool()).list().await
    }

    async fn advance_last_post(&self, chat_id: i64, at: DateTime<Utc>) -> Result<()> {
        let updated = SubscriberRepository::new(self.pool())
            .advance_last_post(chat_id, at)
            .await?;
        if !updated {
            // Unsubscribed mid-cycle, or the stored watermark is already later.
            debug!(chat_id, "Watermark left unchanged");
        }
        Ok(())
    }
}
