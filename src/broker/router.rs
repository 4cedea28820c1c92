//! Message router
//!
//! Turns inbound text frames into registry operations. Frames that fail to
//! parse are logged and dropped; the connection stays open.

use tracing::debug;

use crate::broker::message::{ClientMessage, ServerMessage};
use crate::broker::registry::{SharedRegistry, TopicRegistry, lock};
use crate::client::ConnectionId;

/// Parse one text frame from `id` and apply it.
pub fn handle_text(registry: &SharedRegistry, id: &ConnectionId, text: &str) {
    match text.parse::<ClientMessage>() {
        Ok(message) => {
            let mut registry = lock(registry);
            route(&mut registry, id, message);
        }
        Err(err) => {
            debug!(
                connection = %id,
                error = %err,
                frame = %text.chars().take(100).collect::<String>(),
                "discarding client message"
            );
        }
    }
}

/// Apply a parsed message on behalf of connection `id`.
///
/// Messages for connections that are no longer registered are dropped.
pub fn route(registry: &mut TopicRegistry, id: &ConnectionId, message: ClientMessage) {
    if !registry.is_registered(id) {
        debug!(connection = %id, "dropping message for closed connection");
        return;
    }

    match message {
        ClientMessage::Subscribe { topics } => {
            for topic in &topics {
                registry.subscribe(topic, id);
            }
            debug!(connection = %id, ?topics, "subscribed");
        }
        ClientMessage::Unsubscribe { topics } => {
            for topic in &topics {
                registry.unsubscribe(topic, id);
            }
            debug!(connection = %id, ?topics, "unsubscribed");
        }
        ClientMessage::Publish {
            topic: Some(topic),
            message,
        } => {
            let delivered = registry.publish(&topic, message);
            debug!(connection = %id, topic = %topic, delivered, "published");
        }
        ClientMessage::Publish { topic: None, .. } => {
            debug!(connection = %id, "publish without topic ignored");
        }
        ClientMessage::Ping => {
            if let Err(e) = registry.send_to(id, ServerMessage::Pong) {
                debug!(connection = %id, error = %e, "failed to answer ping");
            }
        }
    }
}
