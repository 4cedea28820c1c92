//! CLI for topic-relay
//!
//! Subcommands:
//! - `server` (default): run the relay
//! - `client`: connect to a running relay and exercise the protocol

use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use topic_relay::broker::TopicRegistry;
use topic_relay::config::load_config;
use topic_relay::discovery::ServiceRegistration;
use topic_relay::transport::websocket::SessionConfig;
use topic_relay::transport::{self, http, websocket};
use topic_relay::utils::logging;

#[derive(Parser)]
#[command(name = "topic-relay", version, about = "Topic-based WebSocket relay")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the relay
    Server {
        /// Override the configured WebSocket port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run a smoke-test client (subscribe, ping, publish)
    Client {
        /// WebSocket server URL to connect to
        #[arg(long, default_value = "ws://127.0.0.1:4444")]
        url: String,
        /// Topic to subscribe and publish to
        #[arg(long, default_value = "demo")]
        topic: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let result = match cli.command.unwrap_or(Command::Server { port: None }) {
        Command::Server { port } => run_server(port).await,
        Command::Client { url, topic } => {
            logging::init("info");
            run_client(&url, &topic).await
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run_server(port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut settings = match load_config() {
        Ok(settings) => settings,
        Err(e) => {
            logging::init("info");
            return Err(e.into());
        }
    };
    logging::init(&settings.log.level);
    if let Some(port) = port {
        settings.server.port = port;
    }

    let registry = TopicRegistry::new().into_shared();
    let session_config = SessionConfig::from_settings(&settings);
    let ws_listener = transport::bind(&settings.server.ws_addr()).await?;
    let http_listener = transport::bind(&settings.server.http_addr()).await?;

    let registration = ServiceRegistration::from_settings(&settings)?;
    if let Some(registration) = registration.clone() {
        tokio::spawn(async move { registration.announce().await });
    }

    tokio::select! {
        _ = websocket::serve(ws_listener, registry, session_config) => {
            error!("WebSocket relay exited unexpectedly.");
        }
        res = http::serve(http_listener) => {
            if let Err(e) = res {
                error!("HTTP facade failed: {e}");
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }

    if let Some(registration) = &registration {
        registration.withdraw().await;
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

async fn run_client(url: &str, topic: &str) -> Result<(), Box<dyn std::error::Error>> {
    use futures_util::{SinkExt, StreamExt};
    use serde_json::json;
    use tokio_tungstenite::connect_async;
    use tokio_tungstenite::tungstenite::Message as WsMessage;

    let (mut ws_stream, _response) = connect_async(url).await?;

    // 1. Subscribe
    let subscribe = json!({ "type": "subscribe", "topics": [topic] });
    ws_stream
        .send(WsMessage::Text(subscribe.to_string().into()))
        .await?;

    // 2. Ping, so the subscription is in place before publishing
    let ping = json!({ "type": "ping" });
    ws_stream.send(WsMessage::Text(ping.to_string().into())).await?;

    // 3. Publish
    let publish = json!({ "type": "publish", "topic": topic, "data": "Hello from topic-relay client" });
    ws_stream
        .send(WsMessage::Text(publish.to_string().into()))
        .await?;

    // Print what comes back: the pong, then our own publication
    let mut seen = 0;
    while seen < 2 {
        match tokio::time::timeout(Duration::from_secs(5), ws_stream.next()).await {
            Ok(Some(Ok(WsMessage::Text(msg)))) => {
                println!("Incoming: {msg}");
                seen += 1;
            }
            Ok(Some(Ok(_))) => {}
            Ok(Some(Err(e))) => return Err(e.into()),
            Ok(None) => break,
            Err(_) => {
                println!("No further messages within 5s");
                break;
            }
        }
    }

    ws_stream.close(None).await?;
    Ok(())
}
