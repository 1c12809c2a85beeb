//! Prometheus counters for the watcher.
//!
//! Exposed as text on the admin surface under `/metrics`.

use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};

use crate::{FreebiesError, Result};

/// Watcher metrics backed by a private registry.
///
/// Clones share the same counters.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    links_requests: IntCounter,
    freebie_deliveries: IntCounter,
    current_subscribers: IntGauge,
}

impl Metrics {
    /// Create and register the watcher metrics.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let links_requests = IntCounter::new(
            "freebies_links_requests",
            "The number of successful requests to fetch links",
        )?;
        let freebie_deliveries = IntCounter::new(
            "freebies_freebie_deliveries",
            "The number of subscriber batches delivered",
        )?;
        let current_subscribers =
            IntGauge::new("freebies_current_subscribers", "The current number of subscribers")?;

        registry.register(Box::new(links_requests.clone()))?;
        registry.register(Box::new(freebie_deliveries.clone()))?;
        registry.register(Box::new(current_subscribers.clone()))?;

        Ok(Self {
            registry,
            links_requests,
            freebie_deliveries,
            current_subscribers,
        })
    }

    /// Count a successful fetch.
    pub fn record_fetch(&self) {
        self.links_requests.inc();
    }

    /// Count a subscriber batch that completed.
    pub fn record_delivery(&self) {
        self.freebie_deliveries.inc();
    }

    /// Record the size of the registry.
    pub fn set_subscribers(&self, count: usize) {
        self.current_subscribers.set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    /// Fetches so far.
    pub fn links_requests(&self) -> u64 {
        self.links_requests.get()
    }

    /// Delivered batches so far.
    pub fn freebie_deliveries(&self) -> u64 {
        self.freebie_deliveries.get()
    }

    /// Last recorded registry size.
    pub fn current_subscribers(&self) -> i64 {
        self.current_subscribers.get()
    }

    /// Content type of [`Metrics::render`].
    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_string()
    }

    /// Encode every metric in the Prometheus text format.
    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| FreebiesError::Metrics(e.to_string()))
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("links_requests", &self.links_requests())
            .field("freebie_deliveries", &self.freebie_deliveries())
            .field("current_subscribers", &self.current_subscribers())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_start_at_zero() {
        let metrics = Metrics::new().unwrap();
        assert_eq!(metrics.links_requests(), 0);
        assert_eq!(metrics.freebie_deliveries(), 0);
        assert_eq!(metrics.current_subscribers(), 0);
    }

    #[test]
    fn test_clones_share_counters() {
        let metrics = Metrics::new().unwrap();
        let other = metrics.clone();
        other.record_fetch();
        other.record_delivery();
        other.record_delivery();
        other.set_subscribers(3);

        assert_eq!(metrics.links_requests(), 1);
        assert_eq!(metrics.freebie_deliveries(), 2);
        assert_eq!(metrics.current_subscribers(), 3);
    }

    #[test]
    fn test_render_text_format() {
        let metrics = Metrics::new().unwrap();
        metrics.record_fetch();
        metrics.set_subscribers(5);

        let text = metrics.render().unwrap();
        assert!(text.contains("# TYPE freebies_links_requests counter"));
        assert!(text.contains("freebies_links_requests 1"));
        assert!(text.contains("freebies_freebie_deliveries 0"));
        assert!(text.contains("# TYPE freebies_current_subscribers gauge"));
        assert!(text.contains("freebies_current_subscribers 5"));
        assert!(metrics.content_type().starts_with("text/plain"));
    }

    #[test]
    fn test_separate_instances_do_not_collide() {
        let a = Metrics::new().unwrap();
        let b = Metrics::new().unwrap();
        a.record_fetch();
        assert_eq!(b.links_requests(), 0);
    }
}
