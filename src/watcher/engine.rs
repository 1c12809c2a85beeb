//! The polling fan-out loop.
//!
//! Each cycle reads every subscriber, fetches once from the earliest
//! watermark, then delivers to all subscribers concurrently. A subscriber's
//! watermark only moves after everything selected for it was sent.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use super::cooldown::{Cooldown, CooldownKind, JitteredCooldown};
use crate::config::WatcherConfig;
use crate::feed::{links_after, InclusionFilter, Link, LinkFetcher};
use crate::metrics::Metrics;
use crate::notify::Notifier;
use crate::subscriber::{horizon, Subscriber, SubscriberStore};

/// First message of every delivery batch.
pub const NEW_FREEBIES_NOTICE: &str = "Just found some new freebies for you 😉";

/// Why a subscriber's batch was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// A send failed.
    Delivery,
    /// Everything was sent but the watermark could not be stored.
    WatermarkWrite,
    /// The delivery barrier expired before the batch finished.
    TimedOut,
}

/// A subscriber whose batch did not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryFailure {
    pub chat_id: i64,
    pub kind: FailureKind,
}

/// Result of the delivery phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Subscribers whose watermark was advanced.
    pub notified: usize,
    /// Link messages sent, across all subscribers.
    pub links_sent: usize,
    /// Subscribers that failed, sorted by chat ID.
    pub failures: Vec<DeliveryFailure>,
}

/// Chat ID and result of one delivery task.
type DeliveryResult = (i64, std::result::Result<usize, FailureKind>);

/// What a single cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The subscriber list could not be read.
    RegistryReadFailed,
    /// The source returned an error.
    FetchFailed,
    /// The source did not answer within the fetch timeout.
    FetchTimedOut,
    /// Nobody is subscribed; nothing was fetched.
    NoSubscribers,
    /// The source had nothing newer than the horizon.
    NothingNew,
    /// Links were fetched and fanned out.
    Delivered(CycleReport),
}

impl CycleOutcome {
    /// Cooldown to apply after this outcome.
    pub fn cooldown_kind(&self) -> CooldownKind {
        match self {
            CycleOutcome::NothingNew | CycleOutcome::NoSubscribers => CooldownKind::Idle,
            _ => CooldownKind::Normal,
        }
    }
}

/// Subscription-polling fan-out engine.
pub struct Watcher<S, F, N> {
    store: Arc<S>,
    fetcher: Arc<F>,
    notifier: Arc<N>,
    filter: InclusionFilter,
    cooldown: Box<dyn Cooldown>,
    fetch_timeout: Duration,
    delivery_timeout: Duration,
    metrics: Option<Metrics>,
}

impl<S, F, N> Watcher<S, F, N>
where
    S: SubscriberStore,
    F: LinkFetcher,
    N: Notifier,
{
    /// Create a watcher with default timeouts.
    pub fn new(
        store: Arc<S>,
        fetcher: Arc<F>,
        notifier: Arc<N>,
        filter: InclusionFilter,
        cooldown: impl Cooldown + 'static,
    ) -> Self {
        let defaults = WatcherConfig::default();
        Self {
            store,
            fetcher,
            notifier,
            filter,
            cooldown: Box::new(cooldown),
            fetch_timeout: Duration::from_secs(defaults.fetch_timeout_secs),
            delivery_timeout: Duration::from_secs(defaults.delivery_timeout_secs),
            metrics: None,
        }
    }

    /// Create a watcher from the `[watcher]` section, with a jittered cooldown.
    pub fn from_config(
        store: Arc<S>,
        fetcher: Arc<F>,
        notifier: Arc<N>,
        filter: InclusionFilter,
        config: &WatcherConfig,
    ) -> Self {
        Self::new(
            store,
            fetcher,
            notifier,
            filter,
            JitteredCooldown::from_config(config),
        )
        .with_timeouts(
            Duration::from_secs(config.fetch_timeout_secs),
            Duration::from_secs(config.delivery_timeout_secs),
        )
    }

    /// Override the fetch and delivery timeouts.
    pub fn with_timeouts(mut self, fetch: Duration, delivery: Duration) -> Self {
        self.fetch_timeout = fetch;
        self.delivery_timeout = delivery;
        self
    }

    /// Record fetches, deliveries and the registry size in `metrics`.
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Run cycles forever, sleeping between them.
    pub async fn run(&mut self) {
        info!(
            fetch_timeout_secs = self.fetch_timeout.as_secs(),
            delivery_timeout_secs = self.delivery_timeout.as_secs(),
            "Watcher started"
        );

        loop {
            let outcome = self.run_cycle().await;
            let delay = self.cooldown.next_delay(outcome.cooldown_kind());
            debug!(delay_secs = delay.as_secs(), "Sleeping until next cycle");
            tokio::time::sleep(delay).await;
        }
    }

    /// Run one cycle using the current time.
    pub async fn run_cycle(&self) -> CycleOutcome {
        self.run_cycle_at(Utc::now()).await
    }

    /// Run one cycle as if it started at `cycle_time`.
    pub async fn run_cycle_at(&self, cycle_time: DateTime<Utc>) -> CycleOutcome {
        let subscribers = match self.store.list_subscribers().await {
            Ok(subscribers) => subscribers,
            Err(e) => {
                error!(error = %e, "Failed to read subscribers");
                return CycleOutcome::RegistryReadFailed;
            }
        };

        if let Some(metrics) = &self.metrics {
            metrics.set_subscribers(subscribers.len());
        }

        if subscribers.is_empty() {
            debug!("No subscribers");
            return CycleOutcome::NoSubscribers;
        }

        let since = horizon(&subscribers, cycle_time);
        debug!(subscribers = subscribers.len(), %since, "Fetching links");

        let links = match tokio::time::timeout(self.fetch_timeout, self.fetcher.fetch(since)).await
        {
            Ok(Ok(links)) => links,
            Ok(Err(e)) => {
                warn!(error = %e, "Failed to fetch links");
                return CycleOutcome::FetchFailed;
            }
            Err(_) => {
                warn!(
                    timeout_secs = self.fetch_timeout.as_secs(),
                    "Fetch timed out"
                );
                return CycleOutcome::FetchTimedOut;
            }
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_fetch();
        }

        if links.is_empty() {
            debug!("Nothing new");
            return CycleOutcome::NothingNew;
        }

        let report = self.fan_out(subscribers, links, cycle_time).await;
        if report.notified > 0 || !report.failures.is_empty() {
            info!(
                notified = report.notified,
                links_sent = report.links_sent,
                failed = report.failures.len(),
                "Cycle delivered"
            );
        }
        CycleOutcome::Delivered(report)
    }

    async fn fan_out(
        &self,
        subscribers: Vec<Subscriber>,
        links: Vec<Link>,
        cycle_time: DateTime<Utc>,
    ) -> CycleReport {
        let links = Arc::new(links);
        let mut pending: HashSet<i64> = HashSet::with_capacity(subscribers.len());
        let mut tasks = JoinSet::new();

        for subscriber in subscribers {
            pending.insert(subscriber.chat_id);
            let store = Arc::clone(&self.store);
            let notifier = Arc::clone(&self.notifier);
            let filter = self.filter.clone();
            let links = Arc::clone(&links);
            let metrics = self.metrics.clone();
            tasks.spawn(async move {
                let chat_id = subscriber.chat_id;
                let result = deliver(
                    store.as_ref(),
                    notifier.as_ref(),
                    &filter,
                    subscriber,
                    &links,
                    cycle_time,
                )
                .await;
                if let (Ok(_), Some(metrics)) = (&result, &metrics) {
                    metrics.record_delivery();
                }
                (chat_id, result)
            });
        }

        let mut report = CycleReport::default();
        let joined = tokio::time::timeout(self.delivery_timeout, async {
            while let Some(joined) = tasks.join_next().await {
                record(&mut report, &mut pending, joined);
            }
        })
        .await;

        let timed_out = joined.is_err();
        if timed_out {
            warn!(
                timeout_secs = self.delivery_timeout.as_secs(),
                unfinished = pending.len(),
                "Delivery timed out"
            );
            abort_and_drain(&mut tasks, &mut report, &mut pending).await;
        }

        // Whatever never reported back either timed out or panicked.
        let kind = if timed_out {
            FailureKind::TimedOut
        } else {
            FailureKind::Delivery
        };
        report
            .failures
            .extend(pending.into_iter().map(|chat_id| DeliveryFailure { chat_id, kind }));
        report.failures.sort_by_key(|failure| failure.chat_id);
        report
    }
}

/// Fold one joined delivery task into the report.
fn record(
    report: &mut CycleReport,
    pending: &mut HashSet<i64>,
    joined: std::result::Result<DeliveryResult, JoinError>,
) {
    match joined {
        Ok((chat_id, result)) => {
            pending.remove(&chat_id);
            match result {
                Ok(0) => {}
                Ok(sent) => {
                    report.notified += 1;
                    report.links_sent += sent;
                }
                Err(kind) => report.failures.push(DeliveryFailure { chat_id, kind }),
            }
        }
        Err(e) => error!(error = %e, "Delivery task failed"),
    }
}

/// Abort unfinished tasks. Tasks that completed before the abort still count.
async fn abort_and_drain(
    tasks: &mut JoinSet<DeliveryResult>,
    report: &mut CycleReport,
    pending: &mut HashSet<i64>,
) {
    tasks.abort_all();
    while let Some(joined) = tasks.join_next().await {
        if !matches!(&joined, Err(e) if e.is_cancelled()) {
            record(report, pending, joined);
        }
    }
}

/// Deliver one subscriber's batch and advance its watermark.
///
/// Returns the number of links sent; zero means nothing was selected and
/// the watermark was left alone.
async fn deliver<S: SubscriberStore, N: Notifier>(
    store: &S,
    notifier: &N,
    filter: &InclusionFilter,
    subscriber: Subscriber,
    links: &[Link],
    cycle_time: DateTime<Utc>,
) -> std::result::Result<usize, FailureKind> {
    let chat_id = subscriber.chat_id;
    let selected = filter.apply(links_after(links, subscriber.last_post));
    if selected.is_empty() {
        return Ok(0);
    }

    if let Err(e) = notifier.send(chat_id, NEW_FREEBIES_NOTICE).await {
        warn!(chat_id, error = %e, "Failed to send notice");
        return Err(FailureKind::Delivery);
    }
    for link in &selected {
        if let Err(e) = notifier.send(chat_id, &link.href).await {
            warn!(chat_id, href = %link.href, error = %e, "Failed to send link");
            return Err(FailureKind::Delivery);
        }
    }

    let watermark = cycle_time.max(subscriber.last_post);
    if let Err(e) = store.advance_last_post(chat_id, watermark).await {
        error!(chat_id, error = %e, "Failed to store watermark");
        return Err(FailureKind::WatermarkWrite);
    }

    debug!(chat_id, sent = selected.len(), "Delivered");
    Ok(selected.len())
}
