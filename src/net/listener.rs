//! TCP listener and accept loop.
//!
//! # Responsibilities
//! - Bind to the configured address
//! - Hand each accepted connection a fresh session and spawn its driver
//! - Stop accepting once the admission limit is reached
//! - Drain open sessions before returning

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::task::JoinSet;

use crate::net::session::{drive, Session};
use crate::net::AdmissionStatus;
use crate::tls::{RustlsEngine, TlsContext};

/// The accepting socket plus the shared, read-only per-connection inputs.
pub struct Server {
    listener: TcpListener,
    tls: Arc<TlsContext>,
    status: Arc<AdmissionStatus>,
}

impl Server {
    pub async fn bind(
        addr: SocketAddr,
        tls: Arc<TlsContext>,
        status: Arc<AdmissionStatus>,
    ) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;

        tracing::info!(
            address = %listener.local_addr()?,
            "listener bound"
        );

        Ok(Self {
            listener,
            tls,
            status,
        })
    }

    /// The bound address; useful when binding to port 0.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until the admission limit is reached, then stop
    /// accepting and wait for the remaining sessions to finish. Sessions that
    /// are already open are never terminated by the limit.
    ///
    /// Individual accept failures are logged and the loop continues; they
    /// never affect open sessions.
    pub async fn run(self) {
        let mut sessions = JoinSet::new();

        while !self.status.should_stop() {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    tracing::debug!(peer = %peer, "connection accepted");

                    let engine = RustlsEngine::new(Arc::clone(&self.tls));
                    let session = Session::new(peer, Box::new(engine));
                    sessions.spawn(drive(session, stream));

                    self.status.client_serviced();
                }
                Err(err) => {
                    tracing::warn!(error = %err, "accept failed");
                }
            }
        }

        // Close the accepting socket before draining so late connection
        // attempts are refused instead of queued.
        drop(self.listener);

        tracing::info!(
            clients_serviced = self.status.clients_serviced(),
            open_sessions = sessions.len(),
            "client limit reached, no longer accepting"
        );

        while sessions.join_next().await.is_some() {}
    }
}
