//! Subscriber types.

use chrono::{DateTime, Utc};

/// A chat registered to receive new freebies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscriber {
    /// Telegram chat ID.
    pub chat_id: i64,
    /// Publish time of the newest link already delivered to this chat
    /// (registration time if nothing was delivered yet).
    pub last_post: DateTime<Utc>,
}

impl Subscriber {
    /// Create a new subscriber.
    pub fn new(chat_id: i64, last_post: DateTime<Utc>) -> Self {
        Self { chat_id, last_post }
    }
}

/// The fetch cutoff that serves every subscriber with a single request.
///
/// Returns the earliest watermark, or `now` when there are no subscribers.
pub fn horizon(subscribers: &[Subscriber], now: DateTime<Utc>) -> DateTime<Utc> {
    subscribers
        .iter()
        .map(|s| s.last_post)
        .min()
        .unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_horizon_is_min_watermark() {
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let subscribers = vec![
            Subscriber::new(1, t0),
            Subscriber::new(2, t0 - Duration::hours(2)),
            Subscriber::new(3, t0 + Duration::hours(1)),
        ];
        assert_eq!(horizon(&subscribers, t0), t0 - Duration::hours(2));
    }

    #[test]
    fn test_horizon_without_subscribers_is_now() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert_eq!(horizon(&[], now), now);
    }

    #[test]
    fn test_horizon_ignores_now_when_subscribers_exist() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let future = now + Duration::days(1);
        assert_eq!(horizon(&[Subscriber::new(1, future)], now), future);
    }
}
