//! Connection lifecycle management.
//!
//! # State Machine
//!
//! ```text
//!                 connect / reconnect
//! ┌──────────────┐ ─────────────────► ┌────────────┐  dial ok   ┌───────────┐
//! │ Disconnected │                    │ Connecting │ ─────────► │ Connected │
//! └──────────────┘ ◄───────────────── └────────────┘            └─────┬─────┘
//!        ▲            attempts exhausted                              │
//!        └────────────────────────────────────────────────────────────┘
//!                       disconnect / reconnect (teardown half)
//! ```
//!
//! Each Connected period is one epoch with its own receive loop and
//! cancellation scope. `on_open` fires before the loop starts; `on_close`
//! fires after the loop has been joined.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `builder` | [`ClientBuilder`] and callback types |
//! | `core` | [`Client`] and [`ClientHandle`] |
//! | `receive` | Receive loop and cancellation scope (internal) |
//! | `retry` | [`RetryPolicy`] |

// ============================================================================
// Submodules
// ============================================================================

/// Client builder and callback types.
pub mod builder;

/// Client lifecycle and send path.
pub mod core;

/// Receive loop.
mod receive;

/// Bounded fixed-interval retry.
pub mod retry;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::{ClientBuilder, LifecycleHandler, MessageHandler};
pub use self::core::{Client, ClientHandle, ConnectionState};
pub use retry::{DEFAULT_ATTEMPTS, DEFAULT_INTERVAL, RetryPolicy};
