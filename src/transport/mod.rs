//! The `transport` module handles network I/O.
//!
//! `websocket` accepts relay connections and runs one event loop per
//! session; `http` serves the plain HTTP health facade.

pub mod http;
pub mod websocket;

use tokio::net::TcpListener;

use crate::utils::RelayError;

/// Bind a TCP listener. Failing to bind is the relay's only fatal error.
pub async fn bind(addr: &str) -> Result<TcpListener, RelayError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| RelayError::Bind {
            addr: addr.to_string(),
            source,
        })
}
