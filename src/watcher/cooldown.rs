//! Wait between polling cycles.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::WatcherConfig;

/// Which base a cooldown starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownKind {
    /// After a cycle that delivered something, or failed.
    Normal,
    /// After a cycle that found nothing new upstream.
    Idle,
}

/// Produces the wait before the next cycle.
pub trait Cooldown: Send + Sync {
    /// Delay to sleep before the next cycle.
    fn next_delay(&mut self, kind: CooldownKind) -> Duration;
}

/// `base + uniform[0, jitter]`, from a generator seeded once.
#[derive(Debug)]
pub struct JitteredCooldown {
    base: Duration,
    idle_base: Duration,
    jitter: Duration,
    rng: StdRng,
}

impl JitteredCooldown {
    /// Create a cooldown seeded from the operating system.
    pub fn new(base: Duration, idle_base: Duration, jitter: Duration) -> Self {
        Self::with_rng(base, idle_base, jitter, StdRng::from_os_rng())
    }

    /// Create a cooldown with a fixed seed.
    pub fn seeded(base: Duration, idle_base: Duration, jitter: Duration, seed: u64) -> Self {
        Self::with_rng(base, idle_base, jitter, StdRng::seed_from_u64(seed))
    }

    fn with_rng(base: Duration, idle_base: Duration, jitter: Duration, rng: StdRng) -> Self {
        Self {
            base,
            idle_base,
            jitter,
            rng,
        }
    }

    /// Build from the `[watcher]` section.
    pub fn from_config(config: &WatcherConfig) -> Self {
        Self::new(
            Duration::from_secs(config.cooldown_base_secs),
            Duration::from_secs(config.idle_cooldown_base_secs),
            Duration::from_secs(config.cooldown_jitter_secs),
        )
    }
}

impl Cooldown for JitteredCooldown {
    fn next_delay(&mut self, kind: CooldownKind) -> Duration {
        let base = match kind {
            CooldownKind::Normal => self.base,
            CooldownKind::Idle => self.idle_base,
        };
        let jitter_ms = self.jitter.as_millis() as u64;
        let extra = if jitter_ms == 0 {
            0
        } else {
            self.rng.random_range(0..=jitter_ms)
        };
        base.saturating_add(Duration::from_millis(extra))
    }
}

/// Constant delays, for tests and deterministic runs.
#[derive(Debug, Clone, Copy)]
pub struct FixedCooldown {
    /// Delay after a normal cycle.
    pub normal: Duration,
    /// Delay after a cycle that found nothing.
    pub idle: Duration,
}

impl FixedCooldown {
    /// Same delay for both kinds.
    pub fn new(delay: Duration) -> Self {
        Self {
            normal: delay,
            idle: delay,
        }
    }
}

impl Cooldown for FixedCooldown {
    fn next_delay(&mut self, kind: CooldownKind) -> Duration {
        match kind {
            CooldownKind::Normal => self.normal,
            CooldownKind::Idle => self.idle,
        }
    }
}
