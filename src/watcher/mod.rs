//! Background polling and fan-out.

pub mod cooldown;
pub mod engine;

pub use cooldown::{Cooldown, CooldownKind, FixedCooldown, JitteredCooldown};
pub use engine::{
    CycleOutcome, CycleReport, DeliveryFailure, FailureKind, Watcher, NEW_FREEBIES_NOTICE,
};

use tokio::task::JoinHandle;

use crate::feed::LinkFetcher;
use crate::notify::Notifier;
use crate::subscriber::SubscriberStore;

/// Spawn the watcher loop as a background task.
pub fn start_watcher<S, F, N>(mut watcher: Watcher<S, F, N>) -> JoinHandle<()>
where
    S: SubscriberStore,
    F: LinkFetcher,
    N: Notifier,
{
    tokio::spawn(async move {
        watcher.run().await;
    })
}
