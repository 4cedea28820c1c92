use std::time::Duration;

use serde::Deserialize;

/// Top-level configuration settings for the relay.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Settings {
    pub server: ServerSettings,
    pub heartbeat: HeartbeatSettings,
    pub discovery: DiscoverySettings,
    pub log: LogSettings,
}

/// Where the relay listens.
///
/// The relay uses two listeners on `host`: `port` (default 4444) carries
/// the WebSocket protocol and `http_port` (default 4445) serves `/` and
/// `/health`. The service directory is told about both: `Port` is the
/// relay port, the health check and the `http_port` metadata entry point
/// at the facade.
///
/// `outbound_queue` caps the frames buffered per connection; a peer that
/// falls further behind is disconnected.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub http_port: u16,
    pub outbound_queue: usize,
}

impl ServerSettings {
    pub fn ws_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.host, self.http_port)
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct HeartbeatSettings {
    pub interval_secs: u64,
}

impl HeartbeatSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Service-directory registration. Disabled while `registry_url` is unset.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DiscoverySettings {
    pub registry_url: Option<String>,
    pub service_name: String,
    pub advertise_address: String,
    pub check_interval_secs: u64,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LogSettings {
    pub level: String,
}

/// Partial configuration settings loaded from files or environment.
///
/// Missing values are filled from `Settings::default()`.
#[derive(Debug, Default, Deserialize)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub heartbeat: Option<PartialHeartbeatSettings>,
    pub discovery: Option<PartialDiscoverySettings>,
    pub log: Option<PartialLogSettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub http_port: Option<u16>,
    pub outbound_queue: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct PartialHeartbeatSettings {
    pub interval_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct PartialDiscoverySettings {
    pub registry_url: Option<String>,
    pub service_name: Option<String>,
    pub advertise_address: Option<String>,
    pub check_interval_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct PartialLogSettings {
    pub level: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "0.0.0.0".to_string(),
                port: 4444,
                http_port: 4445,
                outbound_queue: 256,
            },
            heartbeat: HeartbeatSettings { interval_secs: 30 },
            discovery: DiscoverySettings {
                registry_url: None,
                service_name: "topic-relay".to_string(),
                advertise_address: "127.0.0.1".to_string(),
                check_interval_secs: 10,
            },
            log: LogSettings {
                level: "info".to_string(),
            },
        }
    }
}
