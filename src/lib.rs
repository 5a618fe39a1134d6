//! Reconnecting WebSocket client.
//!
//! This library manages the lifecycle of a single logical WebSocket
//! connection: connect with bounded retry, a background receive loop,
//! graceful teardown, and reconnect without losing the client's callbacks
//! or its ability to send.
//!
//! # Architecture
//!
//! - [`Client`] owns the connection and drives every lifecycle transition
//! - Each connection epoch runs exactly one receive loop task
//! - Disconnect closes the transport, cancels the loop and joins it before
//!   `on_close` fires
//! - Dialing and framing live behind the [`Connector`] and [`Transport`]
//!   traits
//!
//! # Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use websocket_client::{Client, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let mut client = Client::builder()
//!         .on_open(|_, reconnecting| println!("open, reconnecting={reconnecting}"))
//!         .on_message(|_, frame| println!("received {:?}", frame.as_text()))
//!         .build();
//!
//!     client.connect("ws://127.0.0.1:9001", 3, Duration::from_secs(2), false).await?;
//!     client.send(&serde_json::json!({ "message": "Hello WebSocket" })).await?;
//!
//!     client.reconnect("ws://127.0.0.1:9001", 3, Duration::from_secs(2)).await?;
//!     client.disconnect(false).await;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | [`Client`], [`ClientHandle`], builder and retry policy |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`protocol`] | [`Frame`] and JSON encoding |
//! | [`transport`] | Connector/transport traits and implementations |

// ============================================================================
// Modules
// ============================================================================

/// Connection lifecycle.
///
/// - [`Client`] - Owns the connection
/// - [`ClientHandle`] - Cloneable view passed to callbacks
/// - [`RetryPolicy`] - Dial attempts and interval
pub mod client;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Frames exchanged with the remote end.
pub mod protocol;

/// Transport layer.
///
/// The WebSocket implementation is the default; the in-memory one is for
/// tests and embedding.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{
    Client, ClientBuilder, ClientHandle, ConnectionState, LifecycleHandler, MessageHandler,
    RetryPolicy,
};

// Error types
pub use error::{Error, Result};

// Protocol types
pub use protocol::Frame;

// Transport types
pub use transport::{
    Connector, EchoServer, MemoryConnector, MemoryPeer, Transport, WebSocketConnector,
};
