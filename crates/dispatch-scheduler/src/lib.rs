//! dispatch-scheduler — worker selection and address handoff.
//!
//! # Architecture
//!
//! ```text
//! SelectionScheduler (one background task)
//!   ├── CeilingSelector (max_load, +LOAD_STEP after an empty scan)
//!   ├── DispatchView::take_below(ceiling) → eligible indices
//!   └── bounded mpsc::Sender<SlotIndex> (backpressure)
//!
//! Handoff (cloned into every client handler)
//!   └── request_address() → "address:port" or "" after the wait
//! ```

pub mod handoff;
pub mod scheduler;
pub mod selector;

pub use handoff::{DEFAULT_HANDOFF_WAIT, Handoff, channel};
pub use scheduler::{Cycle, SelectionScheduler};
pub use selector::CeilingSelector;
