//! External listener — hands each client the address of a worker.
//!
//! Per client: take one address from the handoff, write it as UTF-8
//! `address:port`, and close. When no worker becomes available within the
//! handoff wait, the connection is closed with nothing written. Clients on
//! the deny list are closed immediately, also with nothing written.

use std::net::SocketAddr;

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use dispatch_scheduler::Handoff;

use crate::access::AccessList;
use crate::accept::{accept_loop, bind};
use crate::error::{ListenerError, ListenerResult};
use crate::framing::peer_host;

pub struct ExternalListener {
    listener: TcpListener,
    handoff: Handoff,
    deny: AccessList,
}

impl ExternalListener {
    /// Bind the client-facing port.
    pub async fn bind(addr: SocketAddr, handoff: Handoff, deny: AccessList) -> ListenerResult<Self> {
        let listener = bind(addr).await?;
        Ok(Self {
            listener,
            handoff,
            deny,
        })
    }

    pub fn local_addr(&self) -> ListenerResult<SocketAddr> {
        self.listener.local_addr().map_err(ListenerError::LocalAddr)
    }

    /// Accept clients until shutdown, one task per client.
    pub async fn run(self, shutdown: watch::Receiver<bool>) {
        if let Ok(addr) = self.local_addr() {
            info!(%addr, denied = self.deny.len(), "external listener accepting clients");
        }

        accept_loop(&self.listener, "external", shutdown, |stream, peer| {
            if self.deny.contains(&peer_host(peer)) {
                warn!(%peer, "client in deny list, rejecting");
                return;
            }
            tokio::spawn(serve_client(self.handoff.clone(), stream, peer));
        })
        .await;
    }
}

async fn serve_client(handoff: Handoff, mut stream: TcpStream, peer: SocketAddr) {
    let address = handoff.request_address().await;

    if address.is_empty() {
        debug!(%peer, "no worker available for client");
    } else if let Err(e) = stream.write_all(address.as_bytes()).await {
        warn!(%peer, error = %e, "failed to send worker address");
        return;
    } else {
        debug!(%peer, worker = %address, "client dispatched");
    }

    let _ = stream.shutdown().await;
}
