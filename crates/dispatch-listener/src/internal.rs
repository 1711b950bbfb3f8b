//! Internal listener — accepts worker servers and ingests their load.
//!
//! Session protocol per worker:
//! 1. Claim a live slot for the peer host.
//! 2. Read the advertised listening port (one `u32` frame).
//! 3. Read load reports (`u32` frames) until the stream ends, a frame is
//!    malformed, or no frame arrives within the rolling read deadline.
//!
//! The slot is released when the session's `SlotGuard` drops, on every
//! exit path.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use dispatch_registry::{LiveView, SlotGuard};

use crate::access::AccessList;
use crate::accept::{accept_loop, bind};
use crate::error::{FrameError, ListenerError, ListenerResult};
use crate::framing::{peer_host, read_u32_within};

pub struct InternalListener {
    listener: TcpListener,
    live: LiveView,
    allow: AccessList,
    read_deadline: Duration,
}

impl InternalListener {
    /// Bind the worker-facing port.
    pub async fn bind(
        addr: SocketAddr,
        live: LiveView,
        allow: AccessList,
        read_deadline: Duration,
    ) -> ListenerResult<Self> {
        let listener = bind(addr).await?;
        if allow.is_empty() {
            warn!(%addr, "worker allow list is empty, every worker will be rejected");
        }
        Ok(Self {
            listener,
            live,
            allow,
            read_deadline,
        })
    }

    pub fn local_addr(&self) -> ListenerResult<SocketAddr> {
        self.listener.local_addr().map_err(ListenerError::LocalAddr)
    }

    /// Accept workers until shutdown, one task per session.
    pub async fn run(self, shutdown: watch::Receiver<bool>) {
        if let Ok(addr) = self.local_addr() {
            info!(%addr, "internal listener accepting workers");
        }

        let session_shutdown = shutdown.clone();
        accept_loop(&self.listener, "internal", shutdown, |stream, peer| {
            let host = peer_host(peer);
            if !self.allow.contains(&host) {
                warn!(%peer, "worker not in allow list, rejecting");
                return;
            }

            tokio::spawn(run_session(
                self.live.clone(),
                stream,
                peer,
                self.read_deadline,
                session_shutdown.clone(),
            ));
        })
        .await;
    }
}

async fn run_session(
    live: LiveView,
    mut stream: TcpStream,
    peer: SocketAddr,
    read_deadline: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let slot = live.claim(peer_host(peer));

    let outcome = tokio::select! {
        result = ingest(&mut stream, &slot, peer, read_deadline) => result,
        _ = shutdown.changed() => {
            debug!(%peer, "closing worker session for shutdown");
            return;
        }
    };

    match outcome {
        Err(FrameError::Closed) => debug!(%peer, "worker closed connection"),
        Err(FrameError::TimedOut(deadline)) => {
            info!(%peer, ?deadline, "worker idle past read deadline")
        }
        Err(e) => error!(%peer, error = %e, "invalid data from worker"),
        Ok(never) => match never {},
    }
}

/// Read the port frame, then load frames until the stream fails.
async fn ingest(
    stream: &mut TcpStream,
    slot: &SlotGuard,
    peer: SocketAddr,
    read_deadline: Duration,
) -> Result<Infallible, FrameError> {
    let port = read_u32_within(stream, read_deadline).await?;
    slot.set_port(port);
    info!(%peer, port, index = slot.index(), "worker listening port registered");

    loop {
        let load = read_u32_within(stream, read_deadline).await?;
        slot.report_load(load);
    }
}
