//! Localhost WebSocket echo server.
//!
//! Binds to localhost (port 0 for a random port), accepts any number of
//! WebSocket clients and echoes every text and binary frame back to its
//! sender. Used by the demo program, the bench and end-to-end tests.
//!
//! [`EchoServer::shutdown`] stops accepting and closes every open
//! connection from the server side.

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::error::Result;

// ============================================================================
// Constants
// ============================================================================

/// Default bind address (localhost).
const DEFAULT_BIND_IP: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

// ============================================================================
// EchoServer
// ============================================================================

/// WebSocket echo server running on background tasks.
///
/// Dropping the server shuts it down.
pub struct EchoServer {
    /// Port the server is bound to.
    port: u16,
    /// Currently open connections.
    connections: Arc<AtomicUsize>,
    /// Set to `true` on shutdown.
    shutdown: watch::Sender<bool>,
}

impl EchoServer {
    /// Binds to `localhost` on a random port and starts accepting.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`](crate::Error::Io) if binding fails.
    pub async fn bind() -> Result<Self> {
        Self::bind_to(DEFAULT_BIND_IP, 0).await
    }

    /// Binds to the given address and starts accepting.
    ///
    /// Use port 0 to let the OS assign a random available port.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`](crate::Error::Io) if binding fails.
    pub async fn bind_to(ip: IpAddr, port: u16) -> Result<Self> {
        let addr = SocketAddr::new(ip, port);
        let listener = TcpListener::bind(addr).await?;
        let actual_port = listener.local_addr()?.port();

        let connections = Arc::new(AtomicUsize::new(0));
        let (shutdown, shutdown_rx) = watch::channel(false);

        tokio::spawn(Self::accept_loop(
            listener,
            Arc::clone(&connections),
            shutdown_rx,
        ));

        info!(port = actual_port, "Echo server started");

        Ok(Self {
            port: actual_port,
            connections,
            shutdown,
        })
    }

    /// Returns the port the server is bound to.
    #[inline]
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Returns the WebSocket URL for this server.
    ///
    /// Format: `ws://127.0.0.1:{port}/`
    #[inline]
    #[must_use]
    pub fn ws_url(&self) -> String {
        format!("ws://127.0.0.1:{}/", self.port)
    }

    /// Returns the number of open connections.
    #[inline]
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Stops accepting and closes all open connections.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Accepts connections until shutdown.
    async fn accept_loop(
        listener: TcpListener,
        connections: Arc<AtomicUsize>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                _ = async { let _ = shutdown.wait_for(|stop| *stop).await; } => break,

                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        debug!(?addr, "TCP connection accepted");
                        tokio::spawn(Self::serve(
                            stream,
                            Arc::clone(&connections),
                            shutdown.clone(),
                        ));
                    }
                    Err(e) => warn!(error = %e, "Accept failed"),
                },
            }
        }

        debug!("Echo server accept loop terminated");
    }

    /// Echoes frames on one connection until either side closes.
    async fn serve(
        stream: TcpStream,
        connections: Arc<AtomicUsize>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut ws_stream = match tokio_tungstenite::accept_async(stream).await {
            Ok(ws_stream) => ws_stream,
            Err(e) => {
                warn!(error = %e, "WebSocket upgrade failed");
                return;
            }
        };

        connections.fetch_add(1, Ordering::SeqCst);

        loop {
            tokio::select! {
                _ = async { let _ = shutdown.wait_for(|stop| *stop).await; } => {
                    let _ = ws_stream.close(None).await;
                    break;
                }

                message = ws_stream.next() => match message {
                    Some(Ok(message @ (Message::Text(_) | Message::Binary(_)))) => {
                        if let Err(e) = ws_stream.send(message).await {
                            debug!(error = %e, "Echo failed");
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(error = %e, "Connection error");
                        break;
                    }
                },
            }
        }

        connections.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Drop for EchoServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ============================================================================
// Tests
// ============================================================================
