//! Error types used within the relay.
//!
//! `RelayError` covers faults that stop an operation (binding, sending,
//! talking to the service directory). `ProtocolError` describes why an
//! inbound frame was rejected; the router discards those frames without
//! closing the connection.

use thiserror::Error;

use crate::client::ConnectionId;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("connection {0} is closed")]
    ConnectionClosed(ConnectionId),

    #[error("outbound queue of connection {0} is full")]
    QueueFull(ConnectionId),

    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] config::ConfigError),

    #[error("service directory request failed: {0}")]
    Discovery(#[from] reqwest::Error),

    #[error("service directory responded with status {0}")]
    DiscoveryStatus(reqwest::StatusCode),

    #[error("http server error: {0}")]
    Http(#[source] std::io::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("payload is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("payload is not a JSON object")]
    NotAnObject,

    #[error("message has no string `type` field")]
    MissingType,

    #[error("unknown message type `{0}`")]
    UnknownType(String),
}
