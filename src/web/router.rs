//! Router configuration for the admin surface.

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::admin::{send_message, AdminState};
use super::error::AdminError;
use crate::metrics::Metrics;
use crate::notify::Notifier;
use crate::subscriber::SubscriberStore;

/// Create the admin router: `/health`, `/metrics` and `/send`.
pub fn create_router<S, N>(store: Arc<S>, notifier: Arc<N>, metrics: Metrics) -> Router
where
    S: SubscriberStore,
    N: Notifier,
{
    let state = Arc::new(AdminState::new(store, notifier));

    Router::new()
        .route("/send", post(send_message::<S, N>))
        .with_state(state)
        .merge(create_health_router())
        .merge(create_metrics_router(metrics))
        .layer(TraceLayer::new_for_http())
}

/// Create the Prometheus scrape router.
pub fn create_metrics_router(metrics: Metrics) -> Router {
    Router::new()
        .route("/metrics", get(render_metrics))
        .with_state(metrics)
}

async fn render_metrics(
    State(metrics): State<Metrics>,
) -> Result<impl IntoResponse, AdminError> {
    let body = metrics
        .render()
        .map_err(|e| AdminError::internal(e.to_string()))?;
    Ok(([(header::CONTENT_TYPE, metrics.content_type())], body))
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}
