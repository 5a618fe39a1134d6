//! Receive loop and its cancellation scope.
//!
//! One loop runs per connection epoch. It pulls frames from the transport
//! and hands each to the message handler on its own task, stopping when
//! the scope is cancelled or the transport fails.
//!
//! Receive errors are never reported. Closing the transport is what
//! unblocks a pending receive; the scope signal covers the gap between
//! receives.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::transport::Transport;

use super::builder::MessageHandler;
use super::core::ClientHandle;

// ============================================================================
// CancelScope
// ============================================================================

/// Cancellation signal plus join handle for one receive loop.
///
/// Created per epoch and consumed by [`retire`](Self::retire); never reused.
pub(crate) struct CancelScope {
    /// Epoch this scope belongs to.
    epoch: u64,
    /// One-shot cancellation signal.
    signal: watch::Sender<bool>,
    /// The receive loop task.
    task: Option<JoinHandle<()>>,
}

impl CancelScope {
    /// Signals cancellation without waiting.
    pub(crate) fn cancel(&self) {
        self.signal.send_replace(true);
    }

    /// Signals cancellation and waits for the loop to exit.
    pub(crate) async fn retire(mut self) {
        self.cancel();

        if let Some(task) = self.task.take()
            && let Err(e) = task.await
            && e.is_panic()
        {
            warn!(epoch = self.epoch, "Receive loop panicked");
        }

        debug!(epoch = self.epoch, "Receive loop joined");
    }
}

impl Drop for CancelScope {
    fn drop(&mut self) {
        // Only reached with a live task when the client is dropped without
        // a disconnect. Nothing may outlive the client.
        if let Some(task) = self.task.take() {
            self.cancel();
            task.abort();
        }
    }
}

// ============================================================================
// InflightGuard
// ============================================================================

/// Counts a running receive loop for as long as it lives.
struct InflightGuard {
    counter: Arc<AtomicUsize>,
}

impl InflightGuard {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self {
            counter: Arc::clone(counter),
        }
    }
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Receive Loop
// ============================================================================

/// Starts the receive loop for a new epoch.
///
/// The inflight counter is raised before this returns, so the loop counts
/// as running from the caller's point of view immediately.
pub(crate) fn spawn(
    epoch: u64,
    handle: ClientHandle,
    transport: Arc<dyn Transport>,
    on_message: Option<MessageHandler>,
) -> CancelScope {
    let (signal, cancelled) = watch::channel(false);
    let guard = InflightGuard::enter(handle.inflight());

    let task = tokio::spawn(run(epoch, handle, transport, on_message, cancelled, guard));

    CancelScope {
        epoch,
        signal,
        task: Some(task),
    }
}

async fn run(
    epoch: u64,
    handle: ClientHandle,
    transport: Arc<dyn Transport>,
    on_message: Option<MessageHandler>,
    mut cancelled: watch::Receiver<bool>,
    _guard: InflightGuard,
) {
    debug!(epoch, "Receive loop started");

    loop {
        if *cancelled.borrow_and_update() {
            debug!(epoch, "Receive loop cancelled");
            break;
        }

        let received = tokio::select! {
            biased;
            changed = cancelled.changed() => match changed {
                Ok(()) => continue,
                Err(_) => break,
            },
            received = transport.recv() => received,
        };

        match received {
            Ok(frame) => {
                trace!(epoch, len = frame.len(), "Frame received");
                if let Some(on_message) = &on_message {
                    on_message(&handle, frame);
                }
            }
            Err(e) => {
                debug!(epoch, error = %e, "Receive failed, stopping loop");
                break;
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use parking_lot::Mutex;
    use tokio::time::{sleep, timeout};
    use url::Url;

    use crate::protocol::Frame;
    use crate::transport::{Connector, MemoryConnector, MemoryPeer};

    async fn open() -> (Arc<dyn Transport>, MemoryPeer) {
        let connector = MemoryConnector::new();
        let url = Url::parse("ws://memory.test/").expect("url");
        let transport = connector.dial(&url).await.expect("dial");
        let peer = connector.last_peer().expect("peer");
        (transport, peer)
    }

    fn collecting() -> (MessageHandler, Arc<Mutex<Vec<Frame>>>) {
        let frames = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&frames);
        let handler: MessageHandler =
            Arc::new(move |_: &ClientHandle, frame: Frame| sink.lock().push(frame));
        (handler, frames)
    }

    async fn wait_idle(handle: &ClientHandle) {
        timeout(Duration::from_secs(5), async {
            while handle.active_receive_loops() != 0 {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("receive loop did not exit");
    }

    #[tokio::test]
    async fn test_delivers_in_order_until_remote_close() {
        let handle = ClientHandle::new();
        let (transport, peer) = open().await;
        let (handler, frames) = collecting();

        let scope = spawn(1, handle.clone(), transport, Some(handler));
        assert_eq!(handle.active_receive_loops(), 1);

        peer.push("one").expect("push");
        peer.push("two").expect("push");
        peer.push(vec![3u8]).expect("push");

        timeout(Duration::from_secs(5), async {
            while frames.lock().len() < 3 {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("frames not delivered");

        peer.close();
        wait_idle(&handle).await;

        assert_eq!(
            *frames.lock(),
            vec![
                Frame::from("one"),
                Frame::from("two"),
                Frame::from(vec![3u8])
            ]
        );

        scope.retire().await;
    }

    #[tokio::test]
    async fn test_retire_stops_pending_receive() {
        let handle = ClientHandle::new();
        let (transport, _peer) = open().await;

        let scope = spawn(1, handle.clone(), transport, None);
        sleep(Duration::from_millis(10)).await;
        assert_eq!(handle.active_receive_loops(), 1);

        // Transport left open; only the signal can stop the loop.
        timeout(Duration::from_secs(5), scope.retire())
            .await
            .expect("retire did not join");

        assert_eq!(handle.active_receive_loops(), 0);
    }

    #[tokio::test]
    async fn test_no_delivery_after_retire() {
        let handle = ClientHandle::new();
        let (transport, peer) = open().await;
        let (handler, frames) = collecting();

        let scope = spawn(1, handle.clone(), transport, Some(handler));
        scope.retire().await;

        let _ = peer.push("late");
        sleep(Duration::from_millis(20)).await;

        assert!(frames.lock().is_empty());
    }

    #[tokio::test]
    async fn test_drop_aborts_loop() {
        let handle = ClientHandle::new();
        let (transport, _peer) = open().await;

        let scope = spawn(1, handle.clone(), transport, None);
        drop(scope);

        wait_idle(&handle).await;
    }
}
