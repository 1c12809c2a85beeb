//! Command handling.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use super::command::Command;
use crate::datetime::start_of_day;
use crate::feed::{links_after, InclusionFilter, LinkFetcher};
use crate::notify::{Notifier, Update};
use crate::subscriber::SubscriberRepository;
use crate::{Database, Result};

/// Reply to `/start`.
pub const WELCOME: &str = "Hey\\! I'll be posting new game freebies as soon as I find them\\. \
                           Type _*/*_ to see the list of commands\\. 🙂";

/// Header of a non-empty catch-up list.
pub const CATCH_UP_HEADER: &str = "Here are some freebies for you 😉";

/// Reply when `/start` finds nothing for today.
pub const NO_FREEBIES_TODAY: &str = "No freebies for today 😕";

/// Reply when a catch-up command finds nothing.
pub const NO_FREEBIES_SO_FAR: &str = "No freebies so far 😕";

/// Reply when `/receive` unsubscribes.
pub const UNSUBSCRIBED: &str = "I won't be posting new freebies anymore. 😐";

/// Reply when `/receive` subscribes.
pub const SUBSCRIBED: &str =
    "I'll be posting new freebies from now on as soon as I find some. 😉";

/// Reply to an unknown command (MarkdownV2).
pub const UNKNOWN_COMMAND: &str = "Unknown command 🧐\\. Type _*/*_";

/// Executes chat commands.
pub struct CommandHandler<F, N> {
    db: Arc<Database>,
    fetcher: Arc<F>,
    notifier: Arc<N>,
    filter: InclusionFilter,
}

impl<F: LinkFetcher, N: Notifier> CommandHandler<F, N> {
    /// Create a new handler.
    pub fn new(
        db: Arc<Database>,
        fetcher: Arc<F>,
        notifier: Arc<N>,
        filter: InclusionFilter,
    ) -> Self {
        Self {
            db,
            fetcher,
            notifier,
            filter,
        }
    }

    /// Handle one update. Non-message updates and plain text are ignored.
    pub async fn handle_update(&self, update: &Update) -> Result<()> {
        let Some(message) = &update.message else {
            return Ok(());
        };
        let Some(command) = message.text.as_deref().and_then(Command::parse) else {
            return Ok(());
        };
        self.handle(message.chat.id, &command).await
    }

    /// Handle a command from `chat_id`.
    pub async fn handle(&self, chat_id: i64, command: &Command) -> Result<()> {
        self.handle_at(chat_id, command, Utc::now()).await
    }

    /// Handle a command as if received at `now`.
    pub async fn handle_at(
        &self,
        chat_id: i64,
        command: &Command,
        now: DateTime<Utc>,
    ) -> Result<()> {
        debug!(chat_id, %command, "Handling command");

        match command {
            Command::Start => {
                let repo = SubscriberRepository::new(self.db.pool());
                match repo.create_or_ignore(chat_id, start_of_day(&now)).await {
                    Ok(true) => info!(chat_id, "Subscribed"),
                    Ok(false) => {}
                    Err(e) => warn!(chat_id, error = %e, "Failed to store subscriber"),
                }
                self.notifier.send_markdown(chat_id, WELCOME).await?;
                self.send_catch_up(chat_id, start_of_day(&now), NO_FREEBIES_TODAY)
                    .await
            }
            Command::Today | Command::Yesterday | Command::Week | Command::Month => {
                let days = command.catch_up_days().unwrap_or(1);
                self.send_catch_up(chat_id, now - Duration::days(days), NO_FREEBIES_SO_FAR)
                    .await
            }
            Command::Receive => self.toggle_subscription(chat_id, now).await,
            Command::Unknown(_) => self.notifier.send_markdown(chat_id, UNKNOWN_COMMAND).await,
        }
    }

    async fn toggle_subscription(&self, chat_id: i64, now: DateTime<Utc>) -> Result<()> {
        let repo = SubscriberRepository::new(self.db.pool());
        if repo.get(chat_id).await?.is_some() {
            repo.delete(chat_id).await?;
            info!(chat_id, "Unsubscribed");
            self.notifier.send(chat_id, UNSUBSCRIBED).await
        } else {
            repo.create_or_ignore(chat_id, start_of_day(&now)).await?;
            info!(chat_id, "Subscribed");
            self.notifier.send(chat_id, SUBSCRIBED).await
        }
    }

    async fn send_catch_up(
        &self,
        chat_id: i64,
        since: DateTime<Utc>,
        empty_reply: &str,
    ) -> Result<()> {
        let links = match self.fetcher.fetch(since).await {
            Ok(links) => self.filter.apply(links_after(&links, since)),
            Err(e) => {
                warn!(chat_id, error = %e, "Failed to fetch catch-up links");
                Vec::new()
            }
        };

        if links.is_empty() {
            return self.notifier.send(chat_id, empty_reply).await;
        }

        self.notifier.send(chat_id, CATCH_UP_HEADER).await?;
        for link in &links {
            self.notifier.send(chat_id, &link.href).await?;
        }
        debug!(chat_id, sent = links.len(), "Catch-up sent");
        Ok(())
    }
}
