//! Escalating load ceiling.
//!
//! A worker is eligible for a dispatch while its load is strictly below the
//! ceiling. Normally the ceiling is the shared `max_load`. When a whole
//! scan finds nobody eligible, the next ceiling rises by `LOAD_STEP` above
//! the previous one so every worker cannot stay at or above it forever.

use dispatch_core::LOAD_STEP;

/// Tracks the ceiling across scheduler cycles.
#[derive(Debug)]
pub struct CeilingSelector {
    step: u32,
    ceiling: u32,
    starved: bool,
}

impl CeilingSelector {
    pub fn new() -> Self {
        Self::with_step(LOAD_STEP)
    }

    pub fn with_step(step: u32) -> Self {
        Self {
            step,
            ceiling: 0,
            starved: false,
        }
    }

    /// Ceiling for the next scan given the current shared `max_load`.
    pub fn next_ceiling(&mut self, max_load: u32) -> u32 {
        self.ceiling = if self.starved {
            max_load.max(self.ceiling.saturating_add(self.step))
        } else {
            max_load
        };
        self.ceiling
    }

    /// Record how many indices the last scan emitted.
    pub fn record(&mut self, emitted: usize) {
        self.starved = emitted == 0;
    }

    /// Ceiling used by the last scan.
    pub fn current(&self) -> u32 {
        self.ceiling
    }

    pub fn is_escalating(&self) -> bool {
        self.starved
    }

    /// Last scan came up empty at the highest possible ceiling.
    pub fn is_saturated(&self) -> bool {
        self.starved && self.ceiling == u32::MAX
    }
}

impl Default for CeilingSelector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn follows_max_load_while_dispatching() {
        let mut selector = CeilingSelector::new();
        assert_eq!(selector.next_ceiling(10), 10);
        selector.record(3);
        assert_eq!(selector.next_ceiling(25), 25);
        selector.record(1);
        assert_eq!(selector.next_ceiling(10), 10);
    }

    #[test]
    fn escalates_after_empty_scan() {
        let mut selector = CeilingSelector::new();
        assert_eq!(selector.next_ceiling(10), 10);
        selector.record(0);
        assert!(selector.is_escalating());

        assert_eq!(selector.next_ceiling(10), 20);
        selector.record(0);
        assert_eq!(selector.next_ceiling(10), 30);

        // A successful scan drops back to the shared threshold.
        selector.record(2);
        assert_eq!(selector.next_ceiling(10), 10);
        assert_eq!(selector.current(), 10);
    }

    #[test]
    fn escalation_never_undercuts_max_load() {
        let mut selector = CeilingSelector::new();
        selector.next_ceiling(10);
        selector.record(0);
        assert_eq!(selector.next_ceiling(50), 50);
    }

    #[test]
    fn custom_step() {
        let mut selector = CeilingSelector::with_step(3);
        selector.next_ceiling(10);
        selector.record(0);
        assert_eq!(selector.next_ceiling(10), 13);
    }

    #[test]
    fn saturates_at_max() {
        let mut selector = CeilingSelector::new();
        selector.next_ceiling(u32::MAX - 1);
        selector.record(0);
        assert!(!selector.is_saturated());
        assert_eq!(selector.next_ceiling(0), u32::MAX);

        selector.record(0);
        assert!(selector.is_saturated());
        selector.record(1);
        assert!(!selector.is_saturated());
    }
}
