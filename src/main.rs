//! content-ledger-client
//!
//! Connects to the configured ledger endpoints and streams the five contract
//! notifications as JSON lines on stdout until SIGINT/SIGTERM.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌───────────────────────────────────────────────┐
//!                 │                ContentClient                  │
//!                 │                                               │
//!   primary ◀─────┼──┐   ┌────────────────────┐                   │
//!                 │  ├───│ ConnectionManager  │◀── heartbeat (5s)  │
//!   secondary ◀───┼──┘   └─────────┬──────────┘                   │
//!                 │                │ install                      │
//!                 │                ▼                              │
//!                 │      ┌────────────────────┐   ┌────────────┐  │
//!                 │      │    EventRouter     │──▶│    Hub     │──┼──▶ subscribers
//!                 │      └────────────────────┘   └────────────┘  │
//!                 │                                               │
//!   writes ───────┼──▶ TransactionPipeline (nonce → sign → send)  │
//!                 └───────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::sync::broadcast;

use content_ledger_client::events::{EventNotice, RemoteEvent};
use content_ledger_client::lifecycle::{signals, startup, Shutdown, ShutdownSignal};
use content_ledger_client::ContentClient;

#[derive(Parser)]
#[command(name = "content-ledger-client")]
#[command(about = "Stream DigitalContentObject notifications from a ledger node", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "ledger.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let (_config, client) = startup::bootstrap(&cli.config)?;

    tracing::info!(contract = %client.contract(), "content-ledger-client starting");

    let shutdown = Shutdown::new();
    let printers = spawn_printers(&client, &shutdown);

    client.connect().await;

    signals::shutdown_on_signal(&shutdown).await;
    client.shutdown().await;
    for printer in printers {
        let _ = printer.await;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

fn spawn_printers(client: &ContentClient, shutdown: &Shutdown) -> Vec<tokio::task::JoinHandle<()>> {
    RemoteEvent::ALL
        .iter()
        .map(|&event| {
            tokio::spawn(print_stream(
                event,
                client.notifications().subscribe(event),
                shutdown.subscribe(),
            ))
        })
        .collect()
}

async fn print_stream(
    event: RemoteEvent,
    mut notices: broadcast::Receiver<EventNotice>,
    mut shutdown: ShutdownSignal,
) {
    loop {
        tokio::select! {
            received = notices.recv() => match received {
                Ok(notice) => match serde_json::to_string(&notice) {
                    Ok(line) => println!("{}", line),
                    Err(e) => tracing::warn!(event = %event, error = %e, "Failed to serialize notification"),
                },
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(event = %event, skipped = skipped, "Notification printer lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = shutdown.recv() => break,
        }
    }
}
