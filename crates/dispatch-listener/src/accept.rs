//! Accept loop shared by both listeners.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{error, info};

use crate::error::{ListenerError, ListenerResult};

/// Pause after a failed accept (e.g. fd exhaustion) before retrying.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

pub(crate) async fn bind(addr: SocketAddr) -> ListenerResult<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| ListenerError::Bind { addr, source })
}

/// Accept until shutdown. Accept errors are logged and retried; they never
/// end the loop.
pub(crate) async fn accept_loop<F>(
    listener: &TcpListener,
    side: &'static str,
    mut shutdown: watch::Receiver<bool>,
    mut on_accept: F,
) where
    F: FnMut(TcpStream, SocketAddr),
{
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => on_accept(stream, peer),
                Err(e) => {
                    error!(listener = side, error = %e, "accept failed");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            },
            _ = shutdown.changed() => {
                info!(listener = side, "listener shutting down");
                break;
            }
        }
    }
}
