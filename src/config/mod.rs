mod settings;

use config::{Config, ConfigError, Environment, File};

use settings::PartialSettings;

pub use settings::{
    DiscoverySettings, HeartbeatSettings, LogSettings, ServerSettings, Settings,
};

/// Loads the configuration from `config/default.*` and the environment,
/// then merges it over the defaults.
///
/// Environment keys use the `RELAY` prefix and `__` as separator, e.g.
/// `RELAY__SERVER__PORT`. A bare, non-empty `PORT` variable overrides
/// `server.port`.
pub fn load_config() -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(
            Environment::with_prefix("RELAY")
                .prefix_separator("__")
                .separator("__"),
        )
        .set_override_option(
            "server.port",
            std::env::var("PORT").ok().filter(|port| !port.is_empty()),
        )?;

    let config = builder.build()?;
    let partial: PartialSettings = config.try_deserialize()?;
    let settings = merge(partial, Settings::default());

    if settings.heartbeat.interval_secs == 0 {
        return Err(ConfigError::Message(
            "heartbeat.interval_secs must be greater than zero".to_string(),
        ));
    }
    if settings.server.outbound_queue == 0 {
        return Err(ConfigError::Message(
            "server.outbound_queue must be greater than zero".to_string(),
        ));
    }

    Ok(settings)
}

fn merge(partial: PartialSettings, default: Settings) -> Settings {
    let server = partial.server;
    let heartbeat = partial.heartbeat;
    let discovery = partial.discovery;
    let log = partial.log;

    Settings {
        server: ServerSettings {
            host: server
                .as_ref()
                .and_then(|s| s.host.clone())
                .unwrap_or(default.server.host),
            port: server
                .as_ref()
                .and_then(|s| s.port)
                .unwrap_or(default.server.port),
            http_port: server
                .as_ref()
                .and_then(|s| s.http_port)
                .unwrap_or(default.server.http_port),
            outbound_queue: server
                .as_ref()
                .and_then(|s| s.outbound_queue)
                .unwrap_or(default.server.outbound_queue),
        },
        heartbeat: HeartbeatSettings {
            interval_secs: heartbeat
                .as_ref()
                .and_then(|h| h.interval_secs)
                .unwrap_or(default.heartbeat.interval_secs),
        },
        discovery: DiscoverySettings {
            registry_url: discovery
                .as_ref()
                .and_then(|d| d.registry_url.clone())
                .filter(|url| !url.is_empty())
                .or(default.discovery.registry_url),
            service_name: discovery
                .as_ref()
                .and_then(|d| d.service_name.clone())
                .unwrap_or(default.discovery.service_name),
            advertise_address: discovery
                .as_ref()
                .and_then(|d| d.advertise_address.clone())
                .unwrap_or(default.discovery.advertise_address),
            check_interval_secs: discovery
                .as_ref()
                .and_then(|d| d.check_interval_secs)
                .unwrap_or(default.discovery.check_interval_secs),
        },
        log: LogSettings {
            level: log
                .as_ref()
                .and_then(|l| l.level.clone())
                .unwrap_or(default.log.level),
        },
    }
}

#[cfg(test)]
mod tests;
