//! Long-polling update loop.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use super::handler::CommandHandler;
use crate::feed::LinkFetcher;
use crate::notify::{Notifier, TelegramClient, Update};
use crate::Result;

/// Wait after a failed poll.
pub const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Where updates come from.
pub trait UpdateSource: Send + Sync + 'static {
    /// Long-poll for updates with an ID of at least `offset`.
    fn get_updates(
        &self,
        offset: i64,
        timeout_secs: u64,
    ) -> impl Future<Output = Result<Vec<Update>>> + Send;
}

impl UpdateSource for TelegramClient {
    async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>> {
        TelegramClient::get_updates(self, offset, timeout_secs).await
    }
}

/// Feeds incoming updates to a [`CommandHandler`].
pub struct BotPoller<U, F, N> {
    updates: Arc<U>,
    handler: CommandHandler<F, N>,
    poll_timeout_secs: u64,
}

impl<U, F, N> BotPoller<U, F, N>
where
    U: UpdateSource,
    F: LinkFetcher,
    N: Notifier,
{
    /// Create a new poller.
    pub fn new(updates: Arc<U>, handler: CommandHandler<F, N>, poll_timeout_secs: u64) -> Self {
        Self {
            updates,
            handler,
            poll_timeout_secs,
        }
    }

    /// Poll forever.
    pub async fn run(&self) {
        info!(timeout_secs = self.poll_timeout_secs, "Bot poller started");

        let mut offset = 0;
        loop {
            match self.poll_once(offset).await {
                Ok(next) => offset = next,
                Err(e) => {
                    warn!(error = %e, "Failed to get updates");
                    tokio::time::sleep(POLL_ERROR_BACKOFF).await;
                }
            }
        }
    }

    /// Fetch and handle one batch. Returns the offset for the next poll.
    ///
    /// A failing update is logged and skipped; it is never retried.
    pub async fn poll_once(&self, offset: i64) -> Result<i64> {
        let updates = self
            .updates
            .get_updates(offset, self.poll_timeout_secs)
            .await?;

        let mut next = offset;
        for update in &updates {
            next = next.max(update.update_id + 1);
            if let Err(e) = self.handler.handle_update(update).await {
                warn!(update_id = update.update_id, error = %e, "Failed to handle update");
            }
        }
        Ok(next)
    }
}

/// Spawn the poller as a background task.
pub fn start_bot_poller<U, F, N>(poller: BotPoller<U, F, N>) -> tokio::task::JoinHandle<()>
where
    U: UpdateSource,
    F: LinkFetcher,
    N: Notifier,
{
    tokio::spawn(async move {
        poller.run().await;
    })
}
