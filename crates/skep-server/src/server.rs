//! Exchange server: acceptor loop and connection lifecycle.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use skep_proto::wire::message_stream;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::session::{run_session, ExchangeServices};

/// Handle for asking a running [`ExchangeServer`] to stop accepting.
#[derive(Debug, Clone)]
pub struct ShutdownHandle(mpsc::Sender<()>);

impl ShutdownHandle {
    /// Signal the acceptor loop to stop. In-flight sessions run to
    /// completion on their own tasks.
    pub async fn shutdown(&self) {
        let _ = self.0.send(()).await;
    }
}

/// TCP server speaking one variant of the bin exchange protocol.
///
/// One task per accepted connection; the acceptor itself blocks only
/// on `accept` and the shutdown signal. Connections beyond the
/// configured cap are dropped with a warning before any exchange
/// starts.
#[derive(Debug)]
pub struct ExchangeServer {
    /// Server configuration.
    config: Arc<ServerConfig>,
    /// Shared collaborators handed to every session.
    services: ExchangeServices,
    /// Number of live connection tasks.
    active: Arc<AtomicUsize>,
    /// Shutdown signal sender, cloned into handles.
    shutdown_tx: mpsc::Sender<()>,
    /// Shutdown signal receiver, consumed by the acceptor loop.
    shutdown_rx: Option<mpsc::Receiver<()>>,
}

impl ExchangeServer {
    /// Create a server from its configuration and collaborators.
    #[must_use]
    pub fn new(config: ServerConfig, services: ExchangeServices) -> Self {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        Self {
            config: Arc::new(config),
            services,
            active: Arc::new(AtomicUsize::new(0)),
            shutdown_tx,
            shutdown_rx: Some(shutdown_rx),
        }
    }

    /// Get the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get a handle that can stop the acceptor loop.
    #[must_use]
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle(self.shutdown_tx.clone())
    }

    /// Number of connections currently being served.
    #[must_use]
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// Bind the configured address and serve until shut down.
    ///
    /// # Errors
    ///
    /// Returns an error if binding fails or the server was already
    /// started once.
    pub async fn serve(&mut self) -> ServerResult<()> {
        let addr = self.config.bind_addr;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindFailed(addr, e))?;
        info!(
            addr = %addr,
            variant = self.config.variant.as_str(),
            "Exchange server listening"
        );
        self.run(listener).await
    }

    /// Serve on an already-bound listener until shut down.
    ///
    /// # Errors
    ///
    /// Returns an error if the server was already started once.
    pub async fn run(&mut self, listener: TcpListener) -> ServerResult<()> {
        let mut shutdown_rx = self
            .shutdown_rx
            .take()
            .ok_or_else(|| ServerError::Internal("server already running".to_string()))?;

        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, peer_addr)) => self.handle_connection(stream, peer_addr),
                        Err(e) => warn!(error = %e, "Failed to accept connection"),
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        info!("Exchange server shutting down");
        Ok(())
    }

    /// Spawn a session task for a new TCP connection.
    fn handle_connection(&self, stream: TcpStream, peer_addr: SocketAddr) {
        let current = self.active.load(Ordering::Acquire);
        if current >= self.config.max_connections {
            warn!(
                peer = %peer_addr,
                current,
                max = self.config.max_connections,
                "Connection rejected: max connections reached"
            );
            return;
        }
        self.active.fetch_add(1, Ordering::AcqRel);

        let conn_id = Uuid::new_v4();
        debug!(conn = %conn_id, peer = %peer_addr, "New connection");

        let services = self.services.clone();
        let config = Arc::clone(&self.config);
        let active = Arc::clone(&self.active);

        tokio::spawn(async move {
            let framed = message_stream(stream, config.max_line_len);
            match run_session(framed, services, &config).await {
                Ok(()) => debug!(conn = %conn_id, peer = %peer_addr, "Connection closed normally"),
                Err(e) => {
                    debug!(conn = %conn_id, peer = %peer_addr, error = %e, "Connection ended with error");
                }
            }
            active.fetch_sub(1, Ordering::AcqRel);
        });
    }
}
