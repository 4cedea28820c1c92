//! Wire protocol
//!
//! Every WebSocket text frame carries one JSON object with a `type` field.
//! Frames are parsed once into `ClientMessage`; anything that does not fit
//! is rejected with a `ProtocolError` before it reaches the registry.
//!
//! `publish` keeps the whole incoming object because subscribers receive it
//! verbatim, plus a `clients` field holding the receiver count.

use std::str::FromStr;

use serde::Serialize;
use serde_json::{Map, Value};
use tungstenite::protocol::Message as WsMessage;

use crate::utils::{ProtocolError, RelayError};

#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    Subscribe {
        topics: Vec<String>,
    },
    Unsubscribe {
        topics: Vec<String>,
    },
    /// `topic` is `None` when the field is missing, empty or not a string.
    Publish {
        topic: Option<String>,
        message: Map<String, Value>,
    },
    Ping,
}

impl FromStr for ClientMessage {
    type Err = ProtocolError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| ProtocolError::InvalidJson(e.to_string()))?;
        let Value::Object(object) = value else {
            return Err(ProtocolError::NotAnObject);
        };

        let kind = object
            .get("type")
            .and_then(Value::as_str)
            .ok_or(ProtocolError::MissingType)?;

        match kind {
            "subscribe" => Ok(ClientMessage::Subscribe {
                topics: topic_list(&object),
            }),
            "unsubscribe" => Ok(ClientMessage::Unsubscribe {
                topics: topic_list(&object),
            }),
            "publish" => {
                let topic = object
                    .get("topic")
                    .and_then(Value::as_str)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string);
                Ok(ClientMessage::Publish {
                    topic,
                    message: object,
                })
            }
            "ping" => Ok(ClientMessage::Ping),
            other => Err(ProtocolError::UnknownType(other.to_string())),
        }
    }
}

/// String entries of the `topics` array. Other entries are skipped and a
/// missing or non-array field yields an empty list.
fn topic_list(object: &Map<String, Value>) -> Vec<String> {
    object
        .get("topics")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    Pong,
}

impl ServerMessage {
    pub fn to_frame(&self) -> Result<WsMessage, RelayError> {
        Ok(WsMessage::text(serde_json::to_string(self)?))
    }
}

/// Encode a publish payload for fan-out, stamping the receiver count.
pub fn publication_frame(
    message: &mut Map<String, Value>,
    clients: usize,
) -> Result<WsMessage, RelayError> {
    message.insert("clients".to_string(), Value::from(clients));
    Ok(WsMessage::text(serde_json::to_string(message)?))
}
