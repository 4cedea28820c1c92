//! # topic-relay
//!
//! `topic-relay` is a real-time WebSocket relay: clients subscribe to named
//! topics and every message published to a topic is fanned out to all of
//! its subscribers. It is meant as a lightweight rendezvous channel, for
//! example for WebRTC signaling before peers connect directly.
//!
//! ## Core Modules
//!
//! - `broker`: the topic registry, the message router and the wire protocol.
//! - `client`: per-connection state and the heartbeat state machine.
//! - `config`: layered configuration loading.
//! - `discovery`: optional registration with an external service directory.
//! - `transport`: the WebSocket acceptor and the HTTP health facade.
//! - `utils`: error types and logging setup.

pub mod broker;
pub mod client;
pub mod config;
pub mod discovery;
pub mod transport;
pub mod utils;
