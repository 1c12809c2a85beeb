//! Admin web server.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;

use super::router::create_router;
use crate::config::WebConfig;
use crate::metrics::Metrics;
use crate::notify::Notifier;
use crate::subscriber::SubscriberStore;
use crate::{FreebiesError, Result};

/// HTTP server for the admin surface.
pub struct WebServer {
    addr: SocketAddr,
    router: Router,
}

impl WebServer {
    /// Create a new web server.
    pub fn new<S, N>(
        config: &WebConfig,
        store: Arc<S>,
        notifier: Arc<N>,
        metrics: Metrics,
    ) -> Result<Self>
    where
        S: SubscriberStore,
        N: Notifier,
    {
        let addr = format!("{}:{}", config.host, config.port)
            .parse()
            .map_err(|e| {
                FreebiesError::Config(format!(
                    "invalid web address {}:{}: {}",
                    config.host, config.port, e
                ))
            })?;

        Ok(Self {
            addr,
            router: create_router(store, notifier, metrics),
        })
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Run the web server.
    pub async fn run(self) -> std::result::Result<(), std::io::Error> {
        let listener = TcpListener::bind(self.addr).await?;
        tracing::info!("Web server listening on http://{}", listener.local_addr()?);
        axum::serve(listener, self.router).await
    }

    /// Bind, spawn the server and return the actual bound address.
    ///
    /// This is useful for testing when binding to port 0.
    pub async fn run_with_addr(self) -> std::result::Result<SocketAddr, std::io::Error> {
        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!("Web server listening on http://{}", local_addr);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, self.router).await {
                tracing::error!(error = %e, "Web server error");
            }
        });

        Ok(local_addr)
    }
}
