//! The `discovery` module announces this relay instance to an external
//! service directory (a Consul-compatible agent) and withdraws it on
//! shutdown. Nothing here is fatal: failures are logged and ignored.

pub mod registration;

pub use registration::{HealthCheck, ServiceDefinition, ServiceRegistration};
