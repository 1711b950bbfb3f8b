//! Shared dispatcher state handed to every component at construction.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::dispatch::DispatchView;
use crate::live::LiveView;

/// Highest connected load seen at the last reconciliation tick.
///
/// The scheduler reads it as its base eligibility ceiling.
#[derive(Debug, Clone, Default)]
pub struct Threshold {
    max_load: Arc<AtomicU32>,
}

impl Threshold {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_load(&self) -> u32 {
        self.max_load.load(Ordering::Relaxed)
    }

    pub fn set(&self, max_load: u32) {
        self.max_load.store(max_load, Ordering::Relaxed);
    }
}

/// The two registry views plus the shared threshold.
#[derive(Debug, Clone)]
pub struct DispatchContext {
    pub live: LiveView,
    pub dispatch: DispatchView,
    pub threshold: Threshold,
}

impl DispatchContext {
    /// Create empty views whose pages hold `page_capacity` records each.
    pub fn new(page_capacity: usize) -> Self {
        Self {
            live: LiveView::new(page_capacity),
            dispatch: DispatchView::new(page_capacity),
            threshold: Threshold::new(),
        }
    }
}
