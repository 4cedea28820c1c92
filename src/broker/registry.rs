//! Topic registry
//!
//! Maps topic names to subscriber sets and keeps the registered
//! connections, each of which records the topics it joined. Every mutation
//! updates both sides, so `conn ∈ subscribers(topic)` holds exactly when
//! `topic ∈ conn.topics()`, and a topic only exists while it has subscribers.
//!
//! Concurrency notes:
//! - The API is synchronous and meant to sit behind one lock
//!   (`SharedRegistry`). Delivery only queues frames on per-connection
//!   channels, so nothing here waits on the network while the lock is held.
//! - Connections whose queue is gone are closed on the spot when a send to
//!   them fails.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::broker::message::{ServerMessage, publication_frame};
use crate::broker::topic::Topic;
use crate::client::{Connection, ConnectionId};
use crate::utils::RelayError;

pub type SharedRegistry = Arc<Mutex<TopicRegistry>>;

/// Lock the shared registry. A panic in another holder does not leave the
/// maps half-updated in a way later calls cannot cope with, so poisoning is
/// ignored.
pub fn lock(registry: &SharedRegistry) -> MutexGuard<'_, TopicRegistry> {
    registry
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Default)]
pub struct TopicRegistry {
    topics: HashMap<String, Topic>,
    connections: HashMap<ConnectionId, Connection>,
}

impl TopicRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_shared(self) -> SharedRegistry {
        Arc::new(Mutex::new(self))
    }

    pub fn register(&mut self, conn: Connection) {
        debug!(connection = %conn.id, "connection registered");
        self.connections.insert(conn.id.clone(), conn);
    }

    pub fn is_registered(&self, id: &ConnectionId) -> bool {
        self.connections.contains_key(id)
    }

    /// Subscribes a connection to a topic, creating the topic if needed.
    /// Returns `false` for repeat subscriptions and unknown connections.
    pub fn subscribe(&mut self, topic: &str, id: &ConnectionId) -> bool {
        let Some(conn) = self.connections.get_mut(id) else {
            return false;
        };
        if conn.is_closed() {
            return false;
        }
        conn.join(topic);

        self.topics
            .entry(topic.to_string())
            .or_insert_with(|| Topic::new(topic))
            .subscribe(id.clone())
    }

    /// Unsubscribes a connection from a topic. Unknown topics or
    /// non-members are a no-op.
    pub fn unsubscribe(&mut self, topic: &str, id: &ConnectionId) -> bool {
        if let Some(conn) = self.connections.get_mut(id) {
            conn.leave(topic);
        }
        self.detach(topic, id)
    }

    fn detach(&mut self, topic: &str, id: &ConnectionId) -> bool {
        let Some(entry) = self.topics.get_mut(topic) else {
            return false;
        };
        let removed = entry.unsubscribe(id);
        if entry.is_empty() {
            debug!(topic = %entry.name, "topic dropped");
            self.topics.remove(topic);
        }
        removed
    }

    /// Publishes `message` to every current subscriber of `topic` and
    /// returns the number of connections it was queued for.
    ///
    /// Each copy carries `clients`, the subscriber count at publish time.
    /// A topic without subscribers is a silent no-op.
    pub fn publish(&mut self, topic: &str, mut message: Map<String, Value>) -> usize {
        let Some(entry) = self.topics.get(topic) else {
            debug!(topic, "publish to topic without subscribers");
            return 0;
        };

        let frame = match publication_frame(&mut message, entry.len()) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(topic, error = %e, "failed to encode publication");
                return 0;
            }
        };

        let mut delivered = 0;
        let mut failed = Vec::new();
        for sub_id in &entry.subscribers {
            let sent = match self.connections.get(sub_id) {
                Some(conn) => conn.send(frame.clone()),
                None => Err(RelayError::ConnectionClosed(sub_id.clone())),
            };
            match sent {
                Ok(()) => delivered += 1,
                Err(e) => {
                    debug!(topic, error = %e, "delivery failed");
                    failed.push(sub_id.clone());
                }
            }
        }

        for sub_id in failed {
            if !self.close(&sub_id) {
                self.detach(topic, &sub_id);
            }
        }

        delivered
    }

    /// Sends a reply to one connection, closing it if the send fails.
    pub fn send_to(&mut self, id: &ConnectionId, msg: ServerMessage) -> Result<(), RelayError> {
        let frame = msg.to_frame()?;
        let sent = match self.connections.get(id) {
            Some(conn) => conn.send(frame),
            None => Err(RelayError::ConnectionClosed(id.clone())),
        };
        if sent.is_err() {
            self.close(id);
        }
        sent
    }

    /// Closes a connection and removes it from every topic it joined.
    ///
    /// Safe to call repeatedly; returns `true` only the first time.
    pub fn close(&mut self, id: &ConnectionId) -> bool {
        let Some(mut conn) = self.connections.remove(id) else {
            return false;
        };
        let topics = conn.close().unwrap_or_default();
        for topic in &topics {
            self.detach(topic, id);
        }
        info!(connection = %id, topics = topics.len(), "connection closed");
        true
    }

    pub fn subscribers(&self, topic: &str) -> Option<&HashSet<ConnectionId>> {
        self.topics.get(topic).map(|t| &t.subscribers)
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics.get(topic).map_or(0, Topic::len)
    }

    pub fn topics_of(&self, id: &ConnectionId) -> Option<&HashSet<String>> {
        self.connections.get(id).map(Connection::topics)
    }

    pub fn contains_topic(&self, topic: &str) -> bool {
        self.topics.contains_key(topic)
    }

    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Checks the two-way membership invariant across the whole registry.
    pub fn is_consistent(&self) -> bool {
        let forward = self.topics.iter().all(|(name, topic)| {
            !topic.is_empty()
                && topic.subscribers.iter().all(|id| {
                    self.connections
                        .get(id)
                        .is_some_and(|conn| conn.is_subscribed(name))
                })
        });
        let backward = self.connections.iter().all(|(id, conn)| {
            conn.topics().iter().all(|name| {
                self.topics
                    .get(name)
                    .is_some_and(|topic| topic.subscribers.contains(id))
            })
        });
        forward && backward
    }
}
