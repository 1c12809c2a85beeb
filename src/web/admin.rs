//! Admin message endpoint.

use std::sync::Arc;

use axum::{extract::State, Form};
use serde::Deserialize;
use tracing::{info, warn};

use super::error::AdminError;
use crate::notify::{escape_markdown, Notifier};
use crate::subscriber::SubscriberStore;

/// `chat_id` value that broadcasts with MarkdownV2 formatting.
pub const BROADCAST_MARKDOWN: i64 = -1;

/// Shared state of the admin endpoints.
pub struct AdminState<S, N> {
    pub store: Arc<S>,
    pub notifier: Arc<N>,
}

impl<S, N> AdminState<S, N> {
    /// Create a new state.
    pub fn new(store: Arc<S>, notifier: Arc<N>) -> Self {
        Self { store, notifier }
    }
}

/// Form body of `POST /send`.
#[derive(Debug, Deserialize)]
pub struct SendForm {
    /// Message text.
    #[serde(default)]
    pub message: String,
    /// Target chat, `-1` for a formatted broadcast, absent for a plain one.
    #[serde(default)]
    pub chat_id: Option<String>,
}

/// Send an ad-hoc message to one chat or to every subscriber.
///
/// Individual send failures are logged and never change the response.
pub async fn send_message<S: SubscriberStore, N: Notifier>(
    State(state): State<Arc<AdminState<S, N>>>,
    Form(form): Form<SendForm>,
) -> Result<(), AdminError> {
    let chat_id = form.chat_id.as_deref().filter(|value| !value.is_empty());

    let Some(chat_id) = chat_id else {
        let subscribers = state.store.list_subscribers().await.map_err(|e| {
            warn!(error = %e, "Failed to read subscribers for broadcast");
            AdminError::internal(e.to_string())
        })?;
        info!(recipients = subscribers.len(), "Broadcasting message");
        for subscriber in subscribers {
            if let Err(e) = state.notifier.send(subscriber.chat_id, &form.message).await {
                warn!(chat_id = subscriber.chat_id, error = %e, "Unable to send message");
            }
        }
        return Ok(());
    };

    let chat_id: i64 = chat_id
        .parse()
        .map_err(|e| AdminError::bad_request(format!("invalid chat_id {:?}: {}", chat_id, e)))?;
    let text = escape_markdown(&form.message);

    if chat_id == BROADCAST_MARKDOWN {
        let subscribers = state
            .store
            .list_subscribers()
            .await
            .map_err(|e| AdminError::bad_request(e.to_string()))?;
        info!(recipients = subscribers.len(), "Broadcasting formatted message");
        for subscriber in subscribers {
            if let Err(e) = state.notifier.send_markdown(subscriber.chat_id, &text).await {
                warn!(chat_id = subscriber.chat_id, error = %e, "Unable to send message");
            }
        }
    } else if let Err(e) = state.notifier.send_markdown(chat_id, &text).await {
        warn!(chat_id, error = %e, "Unable to send message");
    } else {
        info!(chat_id, "Message sent");
    }

    Ok(())
}
