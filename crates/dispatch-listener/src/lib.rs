//! dispatch-listener — the dispatcher's two TCP faces.
//!
//! - **`internal`**: workers register, advertise a port, and stream their
//!   load as big-endian `u32` frames.
//! - **`external`**: clients connect and receive one worker address.
//!
//! Both listeners contain per-connection failures to that connection's task;
//! only a bind failure is returned to the caller.

mod accept;
pub mod access;
pub mod error;
pub mod external;
pub mod framing;
pub mod internal;

pub use access::AccessList;
pub use error::{FrameError, ListenerError, ListenerResult};
pub use external::ExternalListener;
pub use internal::InternalListener;
