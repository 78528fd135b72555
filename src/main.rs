//! CLI for askroom
//!
//! Subcommands:
//! - `server`: run the HTTP/WebSocket server
//! - `client`: subscribe to a room and print its events (useful for smoke tests)

use std::process::ExitCode;
use std::sync::Arc;

use askroom::broker::Event;
use askroom::config::{Settings, load_config};
use askroom::storage::SledStore;
use askroom::transport::{AppState, start_server};
use askroom::utils::{Result, logging};
use chrono::Local;
use clap::Parser;
use futures_util::StreamExt;
use tokio::net::TcpListener;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "askroom", version)]
enum Command {
    /// Start the HTTP and WebSocket server
    Server,
    /// Subscribe to a room and print every event it receives
    Client {
        /// Base WebSocket URL of the server
        #[arg(long, default_value = "ws://127.0.0.1:8080")]
        url: String,
        /// Room to subscribe to
        #[arg(long)]
        room: Uuid,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cmd = Command::parse();

    let settings = match configure() {
        Ok(settings) => settings,
        Err(e) => {
            logging::init("info");
            error!("Failed to start: {e}");
            return ExitCode::FAILURE;
        }
    };

    let outcome = match cmd {
        Command::Server => run_server(settings).await,
        Command::Client { url, room } => run_client(&url, room).await,
    };
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("askroom failed: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Load settings and install the log subscriber they ask for.
fn configure() -> Result<Settings> {
    let settings = load_config()?;
    logging::init(&settings.log.level);
    Ok(settings)
}

async fn run_server(settings: Settings) -> Result<()> {
    let store = Arc::new(SledStore::open(&settings.storage.path)?);
    info!(path = %settings.storage.path, "storage opened");

    let shutdown = CancellationToken::new();
    let (state, dispatcher) = AppState::new(store.clone(), shutdown.clone());
    let dispatcher = tokio::spawn(dispatcher.run(shutdown.clone()));

    let listener = TcpListener::bind(settings.server.addr()).await?;

    let signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown signal received. Exiting gracefully.");
                signal.cancel();
            }
            Err(e) => error!("Unable to listen for shutdown signal: {e}"),
        }
    });

    start_server(listener, state).await?;

    shutdown.cancel();
    if let Err(e) = dispatcher.await {
        warn!("Notification dispatcher ended abnormally: {e}");
    }
    store.flush()?;
    Ok(())
}

async fn run_client(url: &str, room: Uuid) -> Result<()> {
    let endpoint = format!("{}/subscribe/{room}", url.trim_end_matches('/'));
    let (mut ws_stream, _response) = connect_async(endpoint.as_str()).await?;
    info!("Subscribed to room {room}");

    while let Some(msg) = ws_stream.next().await {
        match msg? {
            WsMessage::Text(text) => {
                let now = Local::now().format("%H:%M:%S");
                match serde_json::from_str::<Event>(&text) {
                    Ok(event) => println!("[{now}] {}: {text}", event.kind()),
                    Err(_) => println!("[{now}] {text}"),
                }
            }
            WsMessage::Close(_) => break,
            _ => {}
        }
    }

    info!("Connection closed");
    Ok(())
}
