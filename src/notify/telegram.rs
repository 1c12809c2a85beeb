//! Telegram Bot API client.
//!
//! Only the three methods the watcher needs are wrapped: `getMe`,
//! `sendMessage` and `getUpdates`.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::Notifier;
use crate::{FreebiesError, Result};

/// Connect timeout in seconds.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Timeout for ordinary API calls in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Extra time granted to long-poll requests beyond the server-side timeout.
const LONG_POLL_GRACE_SECS: u64 = 10;

/// Characters escaped in admin-authored MarkdownV2 text.
const MARKDOWN_SPECIAL: &[char] = &['!', '(', ')', '.'];

/// Escape the punctuation that MarkdownV2 rejects in plain prose.
///
/// Formatting characters such as `*` and `_` are left alone so operators
/// can still use bold and italics.
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if MARKDOWN_SPECIAL.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Envelope of every Bot API response.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

/// An incoming update.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    /// Monotonic update identifier.
    pub update_id: i64,
    /// New incoming message, if this update carries one.
    #[serde(default)]
    pub message: Option<Message>,
}

/// An incoming message.
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    /// Chat the message belongs to.
    pub chat: Chat,
    /// Message text.
    #[serde(default)]
    pub text: Option<String>,
}

/// A Telegram chat.
#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    /// Chat identifier.
    pub id: i64,
}

/// The bot's own account.
#[derive(Debug, Clone, Deserialize)]
pub struct BotUser {
    /// Account identifier.
    pub id: i64,
    /// Bot username.
    #[serde(default)]
    pub username: Option<String>,
}

/// Client for the Telegram Bot API.
pub struct TelegramClient {
    client: Client,
    base_url: String,
}

impl TelegramClient {
    /// Create a client for `api_url` (e.g. `https://api.telegram.org`).
    pub fn new(api_url: &str, token: &str) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| FreebiesError::Delivery(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: format!("{}/bot{}", api_url.trim_end_matches('/'), token),
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: serde_json::Value,
        timeout: Duration,
    ) -> Result<T> {
        // reqwest errors embed the URL, which contains the bot token.
        let response = self
            .client
            .post(format!("{}/{}", self.base_url, method))
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                FreebiesError::Delivery(format!("{} failed: {}", method, e.without_url()))
            })?;

        let status = response.status();
        let envelope: ApiResponse<T> = response.json().await.map_err(|e| {
            FreebiesError::Delivery(format!(
                "{} returned unreadable response ({}): {}",
                method,
                status,
                e.without_url()
            ))
        })?;

        if !envelope.ok {
            return Err(FreebiesError::Delivery(format!(
                "{} rejected: {}",
                method,
                envelope
                    .description
                    .unwrap_or_else(|| status.to_string())
            )));
        }

        envelope
            .result
            .ok_or_else(|| FreebiesError::Delivery(format!("{} returned no result", method)))
    }

    /// Fetch the bot's own account.
    pub async fn get_me(&self) -> Result<BotUser> {
        self.call(
            "getMe",
            json!({}),
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        )
        .await
    }

    /// Send a plain text message.
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        let _: serde_json::Value = self
            .call(
                "sendMessage",
                json!({ "chat_id": chat_id, "text": text }),
                Duration::from_secs(REQUEST_TIMEOUT_SECS),
            )
            .await?;
        debug!(chat_id, "Message sent");
        Ok(())
    }

    /// Send a MarkdownV2 message without link previews.
    pub async fn send_markdown_message(&self, chat_id: i64, text: &str) -> Result<()> {
        let _: serde_json::Value = self
            .call(
                "sendMessage",
                json!({
                    "chat_id": chat_id,
                    "text": text,
                    "parse_mode": "MarkdownV2",
                    "disable_web_page_preview": true,
                }),
                Duration::from_secs(REQUEST_TIMEOUT_SECS),
            )
            .await?;
        debug!(chat_id, "Markdown message sent");
        Ok(())
    }

    /// Long-poll for updates newer than `offset`.
    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>> {
        self.call(
            "getUpdates",
            json!({
                "offset": offset,
                "timeout": timeout_secs,
                "allowed_updates": ["message"],
            }),
            Duration::from_secs(timeout_secs + LONG_POLL_GRACE_SECS),
        )
        .await
    }
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient").finish_non_exhaustive()
    }
}

impl Notifier for TelegramClient {
    async fn send(&self, chat_id: i64, text: &str) -> Result<()> {
        self.send_message(chat_id, text).await
    }

    async fn send_markdown(&self, chat_id: i64, text: &str) -> Result<()> {
        self.send_markdown_message(chat_id, text).await
    }
}
