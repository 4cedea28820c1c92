//! Connection representation
//!
//! `Connection` holds the sending side of a bounded per-connection queue.
//! The transport's writer task drains the other side onto the socket.
//! Queueing never waits: a full queue means the peer is not keeping up, and
//! the send fails so the registry can close the connection.
//!
//! The `topics` set is the inverse of the registry's topic index. Only the
//! registry mutates it, under the same lock as the topic map.

use std::collections::HashSet;

use tokio::sync::mpsc::Sender;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::oneshot;
use tungstenite::protocol::Message as WsMessage;
use uuid::Uuid;

use crate::utils::RelayError;

pub type ConnectionId = String;

/// Lifecycle of the underlying WebSocket session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closing,
    Closed,
}

#[derive(Debug)]
pub struct Connection {
    pub id: ConnectionId,
    sender: Sender<WsMessage>,
    topics: HashSet<String>,
    closed: bool,
    on_close: Option<oneshot::Sender<()>>,
}

impl Connection {
    /// Create a new connection around an outbound queue. The `id` is a
    /// UUID used to identify the connection across registry operations.
    pub fn new(sender: Sender<WsMessage>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), sender)
    }

    pub fn with_id(id: ConnectionId, sender: Sender<WsMessage>) -> Self {
        Self {
            id,
            sender,
            topics: HashSet::new(),
            closed: false,
            on_close: None,
        }
    }

    /// Fire `notify` once this connection is closed or dropped.
    pub fn notify_on_close(mut self, notify: oneshot::Sender<()>) -> Self {
        self.on_close = Some(notify);
        self
    }

    pub fn topics(&self) -> &HashSet<String> {
        &self.topics
    }

    pub fn is_subscribed(&self, topic: &str) -> bool {
        self.topics.contains(topic)
    }

    /// True once the connection was closed or its writer went away.
    pub fn is_closed(&self) -> bool {
        self.closed || self.sender.is_closed()
    }

    /// Queue a frame for the writer task.
    ///
    /// Fails without queueing when the connection is closed or its queue is
    /// full; the caller is expected to close it in response.
    pub fn send(&self, msg: WsMessage) -> Result<(), RelayError> {
        if self.is_closed() {
            return Err(RelayError::ConnectionClosed(self.id.clone()));
        }
        self.sender.try_send(msg).map_err(|e| match e {
            TrySendError::Full(_) => RelayError::QueueFull(self.id.clone()),
            TrySendError::Closed(_) => RelayError::ConnectionClosed(self.id.clone()),
        })
    }

    pub(crate) fn join(&mut self, topic: &str) -> bool {
        self.topics.insert(topic.to_string())
    }

    pub(crate) fn leave(&mut self, topic: &str) -> bool {
        self.topics.remove(topic)
    }

    /// Mark closed and hand back the joined topics, leaving the set empty.
    /// Returns `None` if the connection was already closed.
    pub(crate) fn close(&mut self) -> Option<HashSet<String>> {
        if self.closed {
            return None;
        }
        self.closed = true;
        if let Some(notify) = self.on_close.take() {
            let _ = notify.send(());
        }
        Some(std::mem::take(&mut self.topics))
    }
}
