//! WebSocket transport
//!
//! Accepts TCP connections, performs the WebSocket handshake and runs two
//! tasks per session. The session task reads inbound frames, drives the
//! heartbeat and watches for eviction by the registry. A separate writer
//! task owns the sink and drains the bounded outbound queue plus a small
//! control queue for heartbeat Pings, so a peer that stops reading stalls
//! only its own writer. Whatever ends the session (peer close, read error,
//! failed write, missed Pong, eviction) leads to the same cleanup.

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_tungstenite::accept_async;
use tracing::{debug, info, warn};
use tungstenite::protocol::Message as WsMessage;
use uuid::Uuid;

use crate::broker::registry::{SharedRegistry, lock};
use crate::broker::router;
use crate::client::{Connection, ConnectionId, ConnectionState, Heartbeat, HeartbeatAction};
use crate::config::Settings;

/// Heartbeat Pings waiting for the writer. One outstanding Ping is all the
/// heartbeat ever needs.
const CONTROL_CAPACITY: usize = 4;

/// How long a closing session waits for its writer to flush and close.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Per-session tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub heartbeat_interval: Duration,
    /// Frames buffered for a connection before it is disconnected.
    pub outbound_capacity: usize,
}

impl SessionConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            heartbeat_interval: settings.heartbeat.interval(),
            outbound_capacity: settings.server.outbound_queue,
        }
    }
}

/// Why a session ended.
#[derive(Debug)]
pub(crate) enum CloseReason {
    PeerClosed,
    ReadFailed(tungstenite::Error),
    WriteFailed(tungstenite::Error),
    HeartbeatTimeout,
    Evicted,
    WriterStopped,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::PeerClosed => write!(f, "closed by peer"),
            CloseReason::ReadFailed(e) => write!(f, "read failed: {e}"),
            CloseReason::WriteFailed(e) => write!(f, "write failed: {e}"),
            CloseReason::HeartbeatTimeout => write!(f, "heartbeat timeout"),
            CloseReason::Evicted => write!(f, "evicted by registry"),
            CloseReason::WriterStopped => write!(f, "writer task stopped"),
        }
    }
}

/// How the writer task finished.
#[derive(Debug)]
pub(crate) enum WriterExit {
    /// The session dropped the control queue.
    Shutdown,
    /// The registry dropped the outbound queue.
    Evicted,
    Failed(tungstenite::Error),
}

pub(crate) struct Session {
    id: ConnectionId,
    state: ConnectionState,
}

impl Session {
    pub(crate) fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            state: ConnectionState::Connecting,
        }
    }

    pub(crate) fn id(&self) -> &ConnectionId {
        &self.id
    }

    pub(crate) fn state(&self) -> ConnectionState {
        self.state
    }

    fn transition(&mut self, next: ConnectionState) {
        debug!(connection = %self.id, from = ?self.state, to = ?next, "state change");
        self.state = next;
    }
}

/// Accept connections forever, spawning a session task for each.
pub async fn serve(listener: TcpListener, registry: SharedRegistry, config: SessionConfig) {
    match listener.local_addr() {
        Ok(addr) => info!("WebSocket relay listening on ws://{addr}"),
        Err(_) => info!("WebSocket relay listening"),
    }

    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                tokio::spawn(handle_connection(stream, peer, registry.clone(), config));
            }
            Err(e) => warn!(error = %e, "failed to accept connection"),
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    registry: SharedRegistry,
    config: SessionConfig,
) {
    let mut session = Session::new();
    debug!(connection = %session.id, %peer, "handshake started");

    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            debug!(connection = %session.id, %peer, error = %e, "WebSocket handshake error");
            session.transition(ConnectionState::Closed);
            return;
        }
    };
    let (sink, inbound) = ws_stream.split();

    info!(connection = %session.id(), %peer, "connection opened");
    let reason = run_session(&mut session, sink, inbound, &registry, config).await;
    info!(
        connection = %session.id(),
        %peer,
        reason = %reason,
        state = ?session.state(),
        "connection ended"
    );
}

/// Drive one open session until it ends, then unwind it from the registry.
pub(crate) async fn run_session<S, R>(
    session: &mut Session,
    sink: S,
    mut inbound: R,
    registry: &SharedRegistry,
    config: SessionConfig,
) -> CloseReason
where
    S: Sink<WsMessage, Error = tungstenite::Error> + Unpin + Send + 'static,
    R: Stream<Item = Result<WsMessage, tungstenite::Error>> + Unpin,
{
    let (outbound_tx, outbound_rx) = mpsc::channel(config.outbound_capacity);
    let (control_tx, control_rx) = mpsc::channel(CONTROL_CAPACITY);
    let (closed_tx, mut closed_rx) = oneshot::channel();

    let conn = Connection::with_id(session.id.clone(), outbound_tx).notify_on_close(closed_tx);
    lock(registry).register(conn);
    let mut writer = tokio::spawn(write_loop(sink, outbound_rx, control_rx));
    session.transition(ConnectionState::Open);

    let mut heartbeat = Heartbeat::new(config.heartbeat_interval);
    let mut ticker = heartbeat.ticker();
    let mut writer_done = false;

    let reason = loop {
        tokio::select! {
            frame = inbound.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => {
                    router::handle_text(registry, &session.id, text.as_str());
                }
                Some(Ok(WsMessage::Pong(_))) => heartbeat.on_ack(),
                Some(Ok(WsMessage::Close(_))) | None => break CloseReason::PeerClosed,
                // binary frames carry nothing for us; pings are answered by tungstenite
                Some(Ok(_)) => {}
                Some(Err(e)) => break CloseReason::ReadFailed(e),
            },
            _ = ticker.tick() => match heartbeat.on_tick() {
                HeartbeatAction::SendProbe => {
                    if let Err(e) = control_tx.try_send(WsMessage::Ping(Default::default())) {
                        // writer is backed up; without a Pong the next tick terminates
                        debug!(connection = %session.id, error = %e, "heartbeat ping not queued");
                    }
                }
                HeartbeatAction::Terminate => break CloseReason::HeartbeatTimeout,
            },
            _ = &mut closed_rx => break CloseReason::Evicted,
            exit = &mut writer => {
                writer_done = true;
                break match exit {
                    Ok(WriterExit::Failed(e)) => CloseReason::WriteFailed(e),
                    Ok(WriterExit::Evicted | WriterExit::Shutdown) => CloseReason::Evicted,
                    Err(e) => {
                        warn!(connection = %session.id, error = %e, "writer task failed");
                        CloseReason::WriterStopped
                    }
                };
            }
        }
    };

    session.transition(ConnectionState::Closing);
    drop(ticker);
    lock(registry).close(&session.id);
    drop(control_tx);

    if !writer_done && timeout(CLOSE_GRACE, &mut writer).await.is_err() {
        debug!(connection = %session.id, "writer did not finish in time");
        writer.abort();
    }
    session.transition(ConnectionState::Closed);
    reason
}

/// Write queued frames until a queue closes or the sink fails. Heartbeat
/// Pings go ahead of queued messages.
pub(crate) async fn write_loop<S>(
    mut sink: S,
    mut outbound: mpsc::Receiver<WsMessage>,
    mut control: mpsc::Receiver<WsMessage>,
) -> WriterExit
where
    S: Sink<WsMessage, Error = tungstenite::Error> + Unpin,
{
    let exit = loop {
        let msg = tokio::select! {
            biased;
            ping = control.recv() => match ping {
                Some(ping) => ping,
                None => break WriterExit::Shutdown,
            },
            msg = outbound.recv() => match msg {
                Some(msg) => msg,
                None => break WriterExit::Evicted,
            },
        };
        if let Err(e) = sink.send(msg).await {
            break WriterExit::Failed(e);
        }
    };

    if !matches!(exit, WriterExit::Failed(_)) {
        // best effort: the peer may already be gone
        let _ = sink.close().await;
    }
    exit
}
