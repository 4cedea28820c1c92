//! The `utils` module provides the shared pieces used across the relay:
//! error types and logging initialisation.

pub mod error;
pub mod logging;

pub use error::{ProtocolError, RelayError};
