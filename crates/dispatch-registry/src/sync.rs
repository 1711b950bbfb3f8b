//! Reconciliation — copies the live view into the dispatch view.
//!
//! `Reconciler` runs on a fixed interval. Each tick recomputes the shared
//! `max_load` threshold from the live view and then overwrites the dispatch
//! view from it while holding both locks, so readers of the dispatch view
//! never observe a partially copied registry. The dispatch view may lag the
//! live view by up to one interval.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, trace};

use dispatch_core::LOAD_STEP;

use crate::context::{DispatchContext, Threshold};
use crate::dispatch::DispatchView;
use crate::live::LiveView;

/// Drives live → dispatch reconciliation.
pub struct Reconciler {
    live: LiveView,
    dispatch: DispatchView,
    threshold: Threshold,
    interval: Duration,
}

impl Reconciler {
    pub fn new(ctx: &DispatchContext, interval: Duration) -> Self {
        Self {
            live: ctx.live.clone(),
            dispatch: ctx.dispatch.clone(),
            threshold: ctx.threshold.clone(),
            interval,
        }
    }

    /// Run one reconciliation tick.
    pub fn reconcile(&self) -> SyncStats {
        // Lock order: live, then dispatch.
        let live = self.live.lock();
        let max_load = live
            .max_load()
            .map_or(0, |load| load.max(LOAD_STEP));
        self.threshold.set(max_load);

        self.dispatch.overwrite_from(&live);

        let stats = SyncStats {
            workers_total: live.count(),
            workers_connected: live.connected_count(),
            max_load,
        };
        trace!(registry = %*live, "live registry");
        drop(live);

        debug!(
            total = stats.workers_total,
            connected = stats.workers_connected,
            max_load = stats.max_load,
            "reconciliation complete"
        );
        stats
    }

    /// Run the reconciliation loop until shutdown signal.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.interval.as_secs(),
            "reconciler started"
        );

        let mut ticker = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.reconcile();
                }
                _ = shutdown.changed() => {
                    info!("reconciler shutting down");
                    break;
                }
            }
        }
    }
}

/// Reconciliation statistics.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncStats {
    pub workers_total: usize,
    pub workers_connected: usize,
    pub max_load: u32,
}
