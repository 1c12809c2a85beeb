//! Message delivery.

pub mod telegram;

pub use telegram::{escape_markdown, TelegramClient, Update};

use std::future::Future;

use crate::Result;

/// Sends a text message to one chat.
///
/// A failure only concerns that chat; callers treat it as recoverable.
pub trait Notifier: Send + Sync + 'static {
    /// Send `text` as a plain message.
    fn send(&self, chat_id: i64, text: &str) -> impl Future<Output = Result<()>> + Send;

    /// Send `text` as MarkdownV2 with link previews disabled.
    ///
    /// Defaults to a plain send for transports without formatting.
    fn send_markdown(&self, chat_id: i64, text: &str) -> impl Future<Output = Result<()>> + Send {
        self.send(chat_id, text)
    }
}
