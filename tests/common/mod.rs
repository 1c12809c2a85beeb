//! Test helpers for integration tests.
//!
//! Provides in-memory fakes for the watcher's collaborators and a small
//! HTTP server for exercising the real HTTP adapters.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use axum::Router;
use chrono::{DateTime, TimeZone, Utc};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use freebies::{FreebiesError, Link, LinkFetcher, Notifier, Result, Subscriber, SubscriberStore};

/// Fixed reference time used across tests.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

/// In-memory subscriber registry.
///
/// Watermark writes follow the same guard as the SQLite registry: a write
/// never moves a watermark backwards.
#[derive(Default)]
pub struct MemoryStore {
    watermarks: Mutex<BTreeMap<i64, DateTime<Utc>>>,
    fail_reads: AtomicBool,
    failing_writes: Mutex<HashSet<i64>>,
    writes: AtomicUsize,
}

impl MemoryStore {
    /// Create a store holding `subscribers`.
    pub fn with(subscribers: &[(i64, DateTime<Utc>)]) -> Self {
        let store = Self::default();
        store
            .watermarks
            .lock()
            .unwrap()
            .extend(subscribers.iter().copied());
        store
    }

    /// Current watermark of `chat_id`.
    pub fn watermark(&self, chat_id: i64) -> Option<DateTime<Utc>> {
        self.watermarks.lock().unwrap().get(&chat_id).copied()
    }

    /// Number of successful watermark writes so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Make every list call fail.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make watermark writes for `chat_id` fail.
    pub fn fail_writes_for(&self, chat_id: i64) {
        self.failing_writes.lock().unwrap().insert(chat_id);
    }
}

impl SubscriberStore for MemoryStore {
    async fn list_subscribers(&self) -> Result<Vec<Subscriber>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(FreebiesError::Database("disk I/O error".to_string()));
        }
        Ok(self
            .watermarks
            .lock()
            .unwrap()
            .iter()
            .map(|(chat_id, at)| Subscriber::new(*chat_id, *at))
            .collect())
    }

    async fn advance_last_post(&self, chat_id: i64, at: DateTime<Utc>) -> Result<()> {
        if self.failing_writes.lock().unwrap().contains(&chat_id) {
            return Err(FreebiesError::Database("database is locked".to_string()));
        }
        let mut watermarks = self.watermarks.lock().unwrap();
        if let Some(current) = watermarks.get_mut(&chat_id) {
            if *current <= at {
                *current = at;
            }
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Source serving a mutable list of upstream links.
#[derive(Default)]
pub struct ScriptedFetcher {
    links: Mutex<Vec<Link>>,
    calls: Mutex<Vec<DateTime<Utc>>>,
    fail: AtomicBool,
}

impl ScriptedFetcher {
    /// Create a source publishing `links`.
    pub fn with(links: Vec<Link>) -> Self {
        let fetcher = Self::default();
        *fetcher.links.lock().unwrap() = links;
        fetcher
    }

    /// Publish another link upstream.
    pub fn publish(&self, link: Link) {
        self.links.lock().unwrap().push(link);
    }

    /// Cutoffs passed to `fetch`, in call order.
    pub fn calls(&self) -> Vec<DateTime<Utc>> {
        self.calls.lock().unwrap().clone()
    }

    /// Make every fetch fail.
    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

impl LinkFetcher for ScriptedFetcher {
    async fn fetch(&self, since: DateTime<Utc>) -> Result<Vec<Link>> {
        self.calls.lock().unwrap().push(since);
        if self.fail.load(Ordering::SeqCst) {
            return Err(FreebiesError::Fetch("HTTP error: 503 Service Unavailable".to_string()));
        }
        Ok(self
            .links
            .lock()
            .unwrap()
            .iter()
            .filter(|link| link.published_at > since)
            .cloned()
            .collect())
    }
}

/// Source that takes `delay` to answer.
pub struct SlowFetcher {
    pub delay: Duration,
}

impl LinkFetcher for SlowFetcher {
    async fn fetch(&self, since: DateTime<Utc>) -> Result<Vec<Link>> {
        tokio::time::sleep(self.delay).await;
        Ok(vec![Link::new(
            "https://store.steampowered.com/app/1",
            since + chrono::Duration::minutes(1),
        )])
    }
}

/// Notifier recording every message.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(i64, String)>>,
    failing: Mutex<HashSet<i64>>,
    hanging: Mutex<HashSet<i64>>,
    send_delay: Mutex<Option<Duration>>,
}

impl RecordingNotifier {
    /// Make sends to `chat_id` fail.
    pub fn fail_for(&self, chat_id: i64) {
        self.failing.lock().unwrap().insert(chat_id);
    }

    /// Make sends to `chat_id` succeed again.
    pub fn recover(&self, chat_id: i64) {
        self.failing.lock().unwrap().remove(&chat_id);
    }

    /// Make sends to `chat_id` never complete.
    pub fn hang_for(&self, chat_id: i64) {
        self.hanging.lock().unwrap().insert(chat_id);
    }

    /// Make every send take `delay`.
    pub fn delay_sends(&self, delay: Duration) {
        *self.send_delay.lock().unwrap() = Some(delay);
    }

    /// Messages sent to `chat_id`, in order.
    pub fn messages_for(&self, chat_id: i64) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| *id == chat_id)
            .map(|(_, text)| text.clone())
            .collect()
    }

    /// Total number of messages sent.
    pub fn total(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

impl Notifier for RecordingNotifier {
    async fn send(&self, chat_id: i64, text: &str) -> Result<()> {
        let delay = *self.send_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let hangs = self.hanging.lock().unwrap().contains(&chat_id);
        if hangs {
            std::future::pending::<()>().await;
        }
        if self.failing.lock().unwrap().contains(&chat_id) {
            return Err(FreebiesError::Delivery(
                "sendMessage rejected: Forbidden: bot was blocked by the user".to_string(),
            ));
        }
        self.sent.lock().unwrap().push((chat_id, text.to_string()));
        Ok(())
    }
}

/// HTTP server running a router on an ephemeral local port.
pub struct TestHttpServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl TestHttpServer {
    /// Serve `router` on 127.0.0.1.
    pub async fn start(router: Router) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Base URL of the server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for TestHttpServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
