//! dispatch-registry — worker state shared by the dispatcher.
//!
//! Worker sessions write the live view. A background reconciler copies it
//! into the dispatch view on a fixed interval, and the scheduler selects
//! from the dispatch view.
//!
//! # Architecture
//!
//! ```text
//! DispatchContext
//!   ├── LiveView (ConnectionRegistry + mutex, written by sessions)
//!   ├── DispatchView (ConnectionRegistry + mutex, written by Reconciler)
//!   └── Threshold (max connected load, set by Reconciler)
//! ```
//!
//! Both views are paged `ConnectionRegistry` instances. Slot indices are
//! stable for the registry's lifetime; slots are freed by clearing their
//! `connected` flag, never removed.

pub mod context;
pub mod dispatch;
pub mod live;
pub mod registry;
pub mod sync;

pub use context::{DispatchContext, Threshold};
pub use dispatch::DispatchView;
pub use live::{LiveView, SlotGuard};
pub use registry::ConnectionRegistry;
pub use sync::{Reconciler, SyncStats};
