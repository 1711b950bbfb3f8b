//! Live view — the authoritative registry written by worker sessions.
//!
//! Each worker session claims one slot for its whole lifetime and writes
//! its advertised port and reported load into it. The slot is returned to
//! the free pool when the session's `SlotGuard` is dropped, whichever way
//! the session ends.

use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use dispatch_core::{SlotIndex, WorkerRecord};

use crate::registry::ConnectionRegistry;

/// Shared handle to the live registry.
#[derive(Debug, Clone)]
pub struct LiveView {
    registry: Arc<Mutex<ConnectionRegistry>>,
    /// Open worker sessions.
    online: Arc<AtomicUsize>,
}

impl LiveView {
    pub fn new(page_capacity: usize) -> Self {
        Self {
            registry: Arc::new(Mutex::new(ConnectionRegistry::new(page_capacity))),
            online: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Claim a slot for a worker connecting from `address`.
    ///
    /// Reuses the first free slot, appending only when none is free.
    pub fn claim(&self, address: IpAddr) -> SlotGuard {
        let index = {
            let mut registry = self.lock();
            let index = match registry.first_free() {
                Some(index) => index,
                None => registry.append(WorkerRecord::default()),
            };
            if let Some(slot) = registry.at_mut(index) {
                *slot = WorkerRecord::connected(address);
            }
            index
        };

        let online = self.online.fetch_add(1, Ordering::Relaxed) + 1;
        info!(%address, index, workers = online, "worker connected");

        SlotGuard {
            view: self.clone(),
            index,
        }
    }

    /// Number of open worker sessions.
    pub fn online(&self) -> usize {
        self.online.load(Ordering::Relaxed)
    }

    /// Run `f` against the registry while holding its lock.
    pub fn with_registry<R>(&self, f: impl FnOnce(&ConnectionRegistry) -> R) -> R {
        f(&self.lock())
    }

    /// Detached copy of the current registry.
    pub fn snapshot(&self) -> ConnectionRegistry {
        self.lock().clone()
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, ConnectionRegistry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, index: SlotIndex, f: impl FnOnce(&mut WorkerRecord)) -> bool {
        match self.lock().at_mut(index) {
            Some(slot) if slot.connected => {
                f(slot);
                true
            }
            _ => false,
        }
    }

    fn release(&self, index: SlotIndex) {
        let released = match self.lock().at_mut(index) {
            Some(slot) if slot.connected => {
                slot.reset();
                true
            }
            _ => false,
        };

        if released {
            let online = self.online.fetch_sub(1, Ordering::Relaxed) - 1;
            info!(index, workers = online, "worker disconnected");
        }
    }
}

/// Ownership of one live slot for the duration of a worker session.
///
/// Dropping the guard clears the slot and marks it free, including when the
/// owning task unwinds.
#[derive(Debug)]
pub struct SlotGuard {
    view: LiveView,
    index: SlotIndex,
}

impl SlotGuard {
    pub fn index(&self) -> SlotIndex {
        self.index
    }

    /// Store the worker's advertised listening port.
    pub fn set_port(&self, port: u32) {
        self.view.update(self.index, |slot| slot.port = port.to_string());
    }

    /// Store the worker's latest reported client count.
    pub fn report_load(&self, load: u32) {
        if self.view.update(self.index, |slot| slot.load = load) {
            debug!(index = self.index, load, "worker load reported");
        }
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.view.release(self.index);
    }
}
