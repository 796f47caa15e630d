//! Periodic sampling of poll gauges.
//!
//! The sampler runs on its own task, independent of request traffic, so
//! metric scrapes never hit the database directly.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::error::RotiError;
use crate::traits::PollRepository;

/// Default sampling interval.
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_secs(15);

/// Latest sampled poll gauges.
#[derive(Debug, Default)]
pub struct PollGauges {
    /// Polls ever created, including purged ones (highest sequence value).
    total: AtomicI64,
    /// Polls currently stored.
    active: AtomicI64,
}

impl PollGauges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total(&self) -> i64 {
        self.total.load(Ordering::Relaxed)
    }

    pub fn active(&self) -> i64 {
        self.active.load(Ordering::Relaxed)
    }

    /// Read both gauges from the repository. Nothing is updated unless both
    /// reads succeed.
    pub async fn sample<P: PollRepository>(&self, polls: &P) -> Result<(), RotiError> {
        let total = polls.max_sequence().await?;
        let active = polls.count().await?;
        self.total.store(total, Ordering::Relaxed);
        self.active.store(active, Ordering::Relaxed);
        Ok(())
    }
}

/// Spawn a task sampling `gauges` every `interval`. A failed sample is
/// logged and the cycle skipped. Abort the returned handle to stop it.
pub fn spawn_gauge_sampler<P>(polls: Arc<P>, gauges: Arc<PollGauges>, interval: Duration) -> JoinHandle<()>
where
    P: PollRepository + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            match gauges.sample(polls.as_ref()).await {
                Ok(()) => tracing::debug!(
                    total = gauges.total(),
                    active = gauges.active(),
                    "Sampled poll gauges"
                ),
                Err(e) => tracing::warn!("Skipping poll gauge sample: {}", e),
            }
        }
    })
}
