//! Connect, send, reconnect, send, disconnect.
//!
//! Demonstrates:
//! - Binding open/close/message callbacks
//! - Connecting with retry
//! - Sending a JSON payload
//! - Reconnecting and sending again on the same client
//!
//! Without `--url` a local echo server is started and used as the endpoint.
//!
//! Usage:
//!   cargo run --example echo
//!   cargo run --example echo -- --debug
//!   cargo run --example echo -- --url ws://127.0.0.1:9001

// ============================================================================
// Imports
// ============================================================================

use std::collections::HashMap;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::EnvFilter;
use websocket_client::{Client, EchoServer, Result};

// ============================================================================
// Constants
// ============================================================================

const ATTEMPTS: u32 = 3;
const INTERVAL: Duration = Duration::from_secs(2);
const SETTLE: Duration = Duration::from_secs(2);

// ============================================================================
// Args
// ============================================================================

/// Command-line arguments.
#[derive(Debug, Clone)]
struct Args {
    debug: bool,
    url: Option<String>,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = std::env::args().collect();
        let url = args
            .iter()
            .position(|a| a == "--url")
            .and_then(|i| args.get(i + 1).cloned());

        Self {
            debug: args.iter().any(|a| a == "--debug"),
            url,
        }
    }
}

fn init_logging(debug: bool) {
    let filter = if debug {
        "websocket_client=debug,echo=debug"
    } else {
        "websocket_client=info,echo=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    // The local server must stay alive until the end of `run`.
    let (url, _server) = match args.url {
        Some(url) => (url, None),
        None => {
            let server = EchoServer::bind().await?;
            (server.ws_url(), Some(server))
        }
    };

    let mut client = Client::builder()
        .on_open(|_, reconnecting| {
            if reconnecting {
                info!("Reconnected");
            } else {
                info!("Connected");
            }
        })
        .on_close(|_, reconnecting| {
            if reconnecting {
                info!("Reconnecting...");
            } else {
                info!("Disconnected");
            }
        })
        .on_message(|_, frame| {
            info!(message = %String::from_utf8_lossy(frame.as_bytes()), "Received message");
        })
        .build();

    if let Err(e) = client.connect(&url, ATTEMPTS, INTERVAL, false).await {
        info!(error = %e, "Failed to connect");
    }

    let mut data = HashMap::new();
    data.insert("message", "Hello WebSocket");

    if let Err(e) = client.send(&data).await {
        info!(error = %e, "Failed to send message");
    }
    tokio::time::sleep(SETTLE).await;

    if let Err(e) = client.reconnect(&url, ATTEMPTS, INTERVAL).await {
        info!(error = %e, "Failed to reconnect");
    }
    if let Err(e) = client.send(&data).await {
        info!(error = %e, "Failed to send message");
    }
    tokio::time::sleep(SETTLE).await;

    client.disconnect(false).await;

    info!("Done");
    Ok(())
}
