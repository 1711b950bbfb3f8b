//! Address handoff between the scheduler and client handlers.
//!
//! The scheduler is the only producer on a bounded channel of slot
//! indices; any number of client handlers consume from it. Each request
//! waits at most `wait` for an index and resolves it against the dispatch
//! view. An empty string means no worker was available.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio::time::Instant;
use tracing::debug;

use dispatch_core::SlotIndex;
use dispatch_registry::DispatchView;

/// Default client wait on the handoff channel.
pub const DEFAULT_HANDOFF_WAIT: Duration = Duration::from_secs(1);

/// Create the handoff channel. The sender goes to the scheduler.
pub fn channel(
    capacity: usize,
    dispatch: DispatchView,
    wait: Duration,
) -> (mpsc::Sender<SlotIndex>, Handoff) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let handoff = Handoff {
        rx: Arc::new(Mutex::new(rx)),
        dispatch,
        wait,
    };
    (tx, handoff)
}

/// Consumer side of the handoff channel, cheap to clone per client.
#[derive(Debug, Clone)]
pub struct Handoff {
    rx: Arc<Mutex<mpsc::Receiver<SlotIndex>>>,
    dispatch: DispatchView,
    wait: Duration,
}

impl Handoff {
    /// Address of the next eligible worker, or `""` when none arrives in time.
    ///
    /// Indices whose worker disconnected since they were queued are skipped
    /// within the same deadline.
    pub async fn request_address(&self) -> String {
        if self.dispatch.count() == 0 {
            return String::new();
        }

        let deadline = Instant::now() + self.wait;
        let received = tokio::time::timeout_at(deadline, async {
            let mut rx = self.rx.lock().await;
            loop {
                let index = rx.recv().await?;
                match self.dispatch.endpoint(index) {
                    Some(address) => return Some(address),
                    None => debug!(index, "skipping stale worker index"),
                }
            }
        })
        .await;

        match received {
            Ok(Some(address)) => address,
            Ok(None) => {
                debug!("handoff channel closed");
                String::new()
            }
            Err(_) => {
                debug!(wait_ms = self.wait.as_millis() as u64, "no worker available in time");
                String::new()
            }
        }
    }
}
