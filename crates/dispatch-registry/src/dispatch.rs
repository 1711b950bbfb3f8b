//! Dispatch view — the snapshot the scheduler selects from.
//!
//! Only reconciliation writes the bulk content. Between ticks the scheduler
//! bumps the `load` of every record it hands out, so a worker that was just
//! offered to a client counts as busier until the next tick brings in its
//! real report.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dispatch_core::SlotIndex;

use crate::registry::ConnectionRegistry;

#[derive(Debug, Clone)]
pub struct DispatchView {
    registry: Arc<Mutex<ConnectionRegistry>>,
}

impl DispatchView {
    pub fn new(page_capacity: usize) -> Self {
        Self {
            registry: Arc::new(Mutex::new(ConnectionRegistry::new(page_capacity))),
        }
    }

    /// Overwrite the view from the live registry, index by index.
    pub fn overwrite_from(&self, live: &ConnectionRegistry) {
        self.lock().copy_from(live);
    }

    pub fn count(&self) -> usize {
        self.lock().count()
    }

    pub fn connected_count(&self) -> usize {
        self.lock().connected_count()
    }

    /// Pick every connected record whose load is strictly below `ceiling`,
    /// counting one dispatch against each, in index order.
    pub fn take_below(&self, ceiling: u32) -> Vec<SlotIndex> {
        let mut registry = self.lock();
        let eligible: Vec<SlotIndex> = registry
            .iter()
            .filter(|(_, r)| r.connected && r.load < ceiling)
            .map(|(index, _)| index)
            .collect();

        for &index in &eligible {
            if let Some(slot) = registry.at_mut(index) {
                slot.load = slot.load.saturating_add(1);
            }
        }
        eligible
    }

    /// `address:port` of a slot, `None` if out of range or no longer connected.
    pub fn endpoint(&self, index: SlotIndex) -> Option<String> {
        self.lock().at(index)?.endpoint()
    }

    pub fn snapshot(&self) -> ConnectionRegistry {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, ConnectionRegistry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispatch_core::WorkerRecord;

    fn live_with(loads: &[Option<u32>]) -> ConnectionRegistry {
        let mut registry = ConnectionRegistry::new(4);
        for (i, load) in loads.iter().enumerate() {
            let record = match load {
                Some(load) => WorkerRecord {
                    connected: true,
                    address: format!("10.0.0.{i}"),
                    port: "9000".to_string(),
                    load: *load,
                },
                None => WorkerRecord::default(),
            };
            registry.append(record);
        }
        registry
    }

    #[test]
    fn take_below_skips_busy_and_free_slots() {
        let view = DispatchView::new(4);
        view.overwrite_from(&live_with(&[Some(2), None, Some(10), Some(9)]));

        assert_eq!(view.take_below(10), vec![0, 3]);

        let snapshot = view.snapshot();
        assert_eq!(snapshot.at(0).unwrap().load, 3);
        assert_eq!(snapshot.at(3).unwrap().load, 10);
        assert_eq!(snapshot.at(2).unwrap().load, 10);

        // Worker 3 reached the ceiling through dispatches alone.
        assert_eq!(view.take_below(10), vec![0]);
    }

    #[test]
    fn overwrite_resets_dispatch_counts() {
        let live = live_with(&[Some(0)]);
        let view = DispatchView::new(4);
        view.overwrite_from(&live);
        view.take_below(10);
        view.take_below(10);
        assert_eq!(view.snapshot().at(0).unwrap().load, 2);

        view.overwrite_from(&live);
        assert_eq!(view.snapshot().at(0).unwrap().load, 0);
    }

    #[test]
    fn endpoint_resolves_connected_only() {
        let view = DispatchView::new(4);
        view.overwrite_from(&live_with(&[Some(0), None]));

        assert_eq!(view.endpoint(0).as_deref(), Some("10.0.0.0:9000"));
        assert_eq!(view.endpoint(1), None);
        assert_eq!(view.endpoint(7), None);
    }
}
