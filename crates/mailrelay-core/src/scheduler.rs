//! Fixed-cadence polling loop with single-flight cycles.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::ack::AckEngine;
use crate::notify::Notifier;
use crate::pipeline::DeliveryPipeline;
use crate::provider::MailboxProvider;
use crate::store::Store;

/// Drives the expiry sweep and the per-binding pipeline on a fixed cadence.
///
/// A cycle that overruns the cadence is never overlapped by the next one;
/// the late tick is skipped instead.
#[derive(Debug)]
pub struct Scheduler<P, N> {
    store: Store,
    pipeline: DeliveryPipeline<P, N>,
    sweeper: AckEngine,
    interval: Duration,
    in_flight: AtomicBool,
}

impl<P: MailboxProvider, N: Notifier> Scheduler<P, N> {
    /// Creates a scheduler polling every `interval`.
    #[must_use]
    pub fn new(store: Store, pipeline: DeliveryPipeline<P, N>, interval: Duration) -> Self {
        let sweeper = AckEngine::new(store.clone());
        Self {
            store,
            pipeline,
            sweeper,
            interval,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Runs the polling loop forever. The first cycle starts immediately.
    pub async fn run(&self) {
        info!(interval_secs = self.interval.as_secs(), "Polling scheduler started");
        loop {
            let started = tokio::time::Instant::now();
            self.run_cycle().await;
            tokio::time::sleep(self.interval.saturating_sub(started.elapsed())).await;
        }
    }

    /// Runs one full cycle: sweep first, then every binding in turn.
    ///
    /// Per-binding failures are logged and do not stop the cycle. If a cycle
    /// is already in flight this call logs and returns without doing work.
    pub async fn run_cycle(&self) {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            warn!("Previous polling cycle still running; skipping this tick");
            return;
        }

        self.cycle_inner().await;

        self.in_flight.store(false, Ordering::SeqCst);
    }

    async fn cycle_inner(&self) {
        match self.sweeper.sweep(chrono::Utc::now()).await {
            Ok(stats) => {
                debug!(
                    auto_acknowledged = stats.auto_acknowledged,
                    pruned = stats.pruned,
                    "Expiry sweep complete"
                );
            }
            Err(e) => error!(error = %e, "Expiry sweep failed"),
        }

        let bindings = match self.store.bindings().list_all().await {
            Ok(bindings) => bindings,
            Err(e) => {
                error!(error = %e, "Failed to list mailbox bindings; skipping cycle");
                return;
            }
        };

        for binding in bindings {
            if let Err(e) = self.pipeline.run_once(&binding).await {
                warn!(
                    channel = %binding.channel_id,
                    mailbox = %binding.mailbox_address,
                    error = %e,
                    "Polling failed for binding"
                );
            }
        }
    }
}
