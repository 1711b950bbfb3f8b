//! Listener and framing error types.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

pub type ListenerResult<T> = Result<T, ListenerError>;

/// Errors that stop a listener before it accepts anything.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read local address: {0}")]
    LocalAddr(#[source] std::io::Error),
}

/// Why a worker frame could not be read.
#[derive(Debug, Error)]
pub enum FrameError {
    /// Peer closed the stream on a frame boundary.
    #[error("connection closed")]
    Closed,

    #[error("short frame: got {got} of 4 bytes")]
    Short { got: usize },

    #[error("no frame within {0:?}")]
    TimedOut(Duration),

    #[error("read error: {0}")]
    Io(#[from] std::io::Error),
}
