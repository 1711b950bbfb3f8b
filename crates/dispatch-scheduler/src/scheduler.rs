//! Selection scheduler — feeds eligible worker indices to the handoff channel.
//!
//! The loop runs independently of client demand:
//! - With no connected worker it idles and retries.
//! - Otherwise it takes a ceiling from `CeilingSelector`, scans the dispatch
//!   view once, and pushes every connected worker strictly below the ceiling.
//! - A full channel blocks the loop, which keeps it from racing ahead of
//!   clients.
//!
//! Every worker under the ceiling gets one dispatch per scan before the
//! ceiling can rise, so load spreads least-loaded-first and round-robin
//! within a tier without sorting on each request.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use dispatch_core::SlotIndex;
use dispatch_registry::{DispatchContext, DispatchView, Threshold};

use crate::selector::CeilingSelector;

/// Sleep between checks while no worker is connected.
pub const IDLE_WAIT: Duration = Duration::from_secs(1);

/// Outcome of a single scheduler cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cycle {
    /// No worker connected; nothing scanned.
    Idle,
    /// Scan finished with this ceiling and these picks, in index order.
    Scanned { ceiling: u32, picks: Vec<SlotIndex> },
}

pub struct SelectionScheduler {
    dispatch: DispatchView,
    threshold: Threshold,
    selector: CeilingSelector,
    tx: mpsc::Sender<SlotIndex>,
    idle_wait: Duration,
}

impl SelectionScheduler {
    pub fn new(ctx: &DispatchContext, tx: mpsc::Sender<SlotIndex>) -> Self {
        Self {
            dispatch: ctx.dispatch.clone(),
            threshold: ctx.threshold.clone(),
            selector: CeilingSelector::new(),
            tx,
            idle_wait: IDLE_WAIT,
        }
    }

    /// Override the idle sleep.
    pub fn with_idle_wait(mut self, idle_wait: Duration) -> Self {
        self.idle_wait = idle_wait;
        self
    }

    /// Pick the indices for one cycle without publishing them.
    pub fn select(&mut self) -> Cycle {
        if self.dispatch.connected_count() == 0 {
            return Cycle::Idle;
        }

        let escalating = self.selector.is_escalating();
        let ceiling = self.selector.next_ceiling(self.threshold.max_load());
        if escalating {
            debug!(ceiling, "no eligible worker last scan, raising ceiling");
        }

        let picks = self.dispatch.take_below(ceiling);
        self.selector.record(picks.len());
        Cycle::Scanned { ceiling, picks }
    }

    /// Run the selection loop until shutdown or until every consumer is gone.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            capacity = self.tx.max_capacity(),
            "selection scheduler started"
        );

        loop {
            let picks = match self.select() {
                Cycle::Idle => {
                    tokio::select! {
                        _ = tokio::time::sleep(self.idle_wait) => continue,
                        _ = shutdown.changed() => break,
                    }
                }
                Cycle::Scanned { picks, .. } => picks,
            };

            if picks.is_empty() {
                if self.selector.is_saturated() {
                    // The ceiling cannot rise further; wait for fresh loads.
                    tokio::select! {
                        _ = tokio::time::sleep(self.idle_wait) => continue,
                        _ = shutdown.changed() => break,
                    }
                }
                // Let sessions and the reconciler progress between escalations.
                tokio::task::yield_now().await;
                continue;
            }

            for index in picks {
                tokio::select! {
                    sent = self.tx.send(index) => {
                        if sent.is_err() {
                            info!("handoff channel closed, scheduler stopping");
                            return;
                        }
                    }
                    _ = shutdown.changed() => {
                        info!("selection scheduler shutting down");
                        return;
                    }
                }
            }
        }

        info!("selection scheduler shutting down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispatch_core::{LOAD_STEP, WorkerRecord};
    use dispatch_registry::{ConnectionRegistry, Reconciler};
    use std::collections::HashSet;
    use std::net::IpAddr;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn seeded(loads: &[u32]) -> DispatchContext {
        let ctx = DispatchContext::new(4);
        let mut live = ConnectionRegistry::new(4);
        for (i, &load) in loads.iter().enumerate() {
            live.append(WorkerRecord {
                connected: true,
                address: format!("10.0.0.{i}"),
                port: "9000".to_string(),
                load,
            });
        }
        ctx.dispatch.overwrite_from(&live);
        let max = live.max_load().map_or(0, |l| l.max(LOAD_STEP));
        ctx.threshold.set(max);
        ctx
    }

    #[test]
    fn idle_without_workers() {
        let ctx = DispatchContext::new(4);
        let (tx, _rx) = mpsc::channel(4);
        let mut scheduler = SelectionScheduler::new(&ctx, tx);
        assert_eq!(scheduler.select(), Cycle::Idle);
    }

    #[test]
    fn each_eligible_worker_offered_once_per_scan() {
        let ctx = seeded(&[0, 4, 12, 1]);
        let (tx, _rx) = mpsc::channel(4);
        let mut scheduler = SelectionScheduler::new(&ctx, tx);

        // max_load is 12; worker 2 sits at the ceiling.
        assert_eq!(
            scheduler.select(),
            Cycle::Scanned { ceiling: 12, picks: vec![0, 1, 3] }
        );
    }

    #[test]
    fn fair_within_tier() {
        let ctx = seeded(&[0, 0, 0]);
        let (tx, _rx) = mpsc::channel(4);
        let mut scheduler = SelectionScheduler::new(&ctx, tx);

        let mut offered = Vec::new();
        for _ in 0..3 {
            if let Cycle::Scanned { picks, .. } = scheduler.select() {
                offered.extend(picks);
            }
        }

        // Nobody is offered a second time before everyone got a first.
        for round in offered.chunks(3) {
            let unique: HashSet<_> = round.iter().collect();
            assert_eq!(unique.len(), 3);
        }
        assert_eq!(offered.len(), 9);
    }

    #[test]
    fn escalates_when_all_at_ceiling() {
        let ctx = seeded(&[10]);
        let (tx, _rx) = mpsc::channel(4);
        let mut scheduler = SelectionScheduler::new(&ctx, tx);

        assert_eq!(
            scheduler.select(),
            Cycle::Scanned { ceiling: 10, picks: vec![] }
        );
        assert_eq!(
            scheduler.select(),
            Cycle::Scanned { ceiling: 20, picks: vec![0] }
        );
        // Back to the shared threshold after a successful scan.
        assert_eq!(
            scheduler.select(),
            Cycle::Scanned { ceiling: 10, picks: vec![] }
        );
    }

    #[tokio::test]
    async fn run_publishes_until_channel_full() {
        let ctx = DispatchContext::new(4);
        let worker = ctx.live.claim(ip("10.0.0.1"));
        worker.set_port(9000);
        Reconciler::new(&ctx, Duration::from_secs(1)).reconcile();

        let (tx, mut rx) = mpsc::channel(3);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let scheduler = SelectionScheduler::new(&ctx, tx.clone());
        let handle = tokio::spawn(scheduler.run(shutdown_rx));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(tx.capacity(), 0, "scheduler should fill the channel");
        assert_eq!(rx.recv().await, Some(0));

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn saturated_worker_does_not_spin() {
        let ctx = seeded(&[u32::MAX]);
        assert_eq!(ctx.threshold.max_load(), u32::MAX);

        let (tx, mut rx) = mpsc::channel(3);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let scheduler =
            SelectionScheduler::new(&ctx, tx).with_idle_wait(Duration::from_millis(5));
        let handle = tokio::spawn(scheduler.run(shutdown_rx));

        let received = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(received.is_err(), "nothing is eligible at the maximum load");

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("scheduler kept spinning after shutdown")
            .unwrap();
    }

    #[test]
    fn saturated_ceiling_stays_empty() {
        let ctx = seeded(&[u32::MAX]);
        let (tx, _rx) = mpsc::channel(3);
        let mut scheduler = SelectionScheduler::new(&ctx, tx);

        for _ in 0..3 {
            assert_eq!(
                scheduler.select(),
                Cycle::Scanned { ceiling: u32::MAX, picks: vec![] }
            );
        }
        assert!(scheduler.selector.is_saturated());
    }

    #[tokio::test]
    async fn run_idles_then_stops() {
        let ctx = DispatchContext::new(4);
        let (tx, _rx) = mpsc::channel(3);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let scheduler =
            SelectionScheduler::new(&ctx, tx).with_idle_wait(Duration::from_millis(5));
        let handle = tokio::spawn(scheduler.run(shutdown_rx));

        tokio::time::sleep(Duration::from_millis(30)).await;
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
