//! Test peers that misbehave on purpose.

use std::future::Future;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use url::Url;

use crate::error::Result;
use crate::protocol::Frame;

/// Frames sent before giving up on filling the socket buffers.
const FILL_LIMIT: usize = 256;

/// Keeps a stalled peer alive; aborts it on drop.
pub(crate) struct StalledPeer {
    task: JoinHandle<()>,
}

impl Drop for StalledPeer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Starts a peer that completes the WebSocket handshake and then never
/// reads another byte.
pub(crate) async fn stalled_peer() -> (Url, StalledPeer) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("local addr").port();

    let task = tokio::spawn(async move {
        let Ok((stream, _)) = listener.accept().await else {
            return;
        };
        let Ok(_ws_stream) = tokio_tungstenite::accept_async(stream).await else {
            return;
        };
        std::future::pending::<()>().await;
    });

    let url = Url::parse(&format!("ws://127.0.0.1:{port}/")).expect("valid url");
    (url, StalledPeer { task })
}

/// Sends 1 MiB frames until one cannot be flushed within 100ms.
///
/// Returns `true` once a send stalls, leaving unflushed data in the
/// writer.
pub(crate) async fn fill_send_buffer<F, Fut>(mut send: F) -> bool
where
    F: FnMut(Frame) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let chunk = Frame::Binary(vec![0u8; 1 << 20]);

    for _ in 0..FILL_LIMIT {
        match timeout(Duration::from_millis(100), send(chunk.clone())).await {
            Ok(result) => result.expect("send before the buffer fills"),
            Err(_) => return true,
        }
    }

    false
}
