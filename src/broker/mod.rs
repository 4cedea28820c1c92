//! The broker owns topic membership and message routing.
//!
//! - `registry`: the `TopicRegistry`, the single shared mutable structure.
//! - `router`: applies parsed client messages to the registry.
//! - `message`: the JSON wire protocol.
//! - `topic`: the subscriber set of one topic.

pub mod message;
pub mod registry;
pub mod router;
pub mod topic;

pub use message::{ClientMessage, ServerMessage};
pub use registry::{SharedRegistry, TopicRegistry};
