//! The `client` module models one connected peer.
//!
//! `Connection` is the registry-side record of a session: its outbound queue,
//! closed flag and the topics it has joined. `Heartbeat` is the per-session
//! liveness state machine driven by the transport's connection task.

pub mod connection;
pub mod heartbeat;

pub use connection::{Connection, ConnectionId, ConnectionState};
pub use heartbeat::{Heartbeat, HeartbeatAction, HeartbeatState};

#[cfg(test)]
mod tests;
