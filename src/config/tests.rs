use super::settings::Settings;
use super::load_config;
use serial_test::serial;
use std::env;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

const ENV_KEYS: [&str; 7] = [
    "PORT",
    "RELAY__SERVER__PORT",
    "RELAY__SERVER__HOST",
    "RELAY__HEARTBEAT__INTERVAL_SECS",
    "RELAY__DISCOVERY__REGISTRY_URL",
    "RELAY__LOG__LEVEL",
    "RELAY__SERVER__OUTBOUND_QUEUE",
];

fn with_clean_env<F: FnOnce()>(vars: &[(&str, &str)], f: F) {
    let mut all: Vec<(&str, Option<&str>)> = ENV_KEYS.iter().map(|k| (*k, None)).collect();
    for (key, value) in vars {
        all.retain(|(k, _)| k != key);
        all.push((*key, Some(*value)));
    }
    temp_env::with_vars(all, f);
}

#[test]
fn test_default_settings() {
    let settings = Settings::default();
    assert_eq!(settings.server.host, "0.0.0.0");
    assert_eq!(settings.server.port, 4444);
    assert_eq!(settings.server.ws_addr(), "0.0.0.0:4444");
    assert_eq!(settings.server.http_addr(), "0.0.0.0:4445");
    assert_eq!(settings.server.outbound_queue, 256);
    assert_eq!(settings.heartbeat.interval(), Duration::from_secs(30));
    assert!(settings.discovery.registry_url.is_none());
    assert_eq!(settings.discovery.service_name, "topic-relay");
    assert_eq!(settings.log.level, "info");
}

#[test]
#[serial]
fn load_config_without_sources_uses_defaults() {
    with_clean_env(&[], || {
        let cfg = load_config().expect("load_config failed");
        assert_eq!(cfg, Settings::default());
    });
}

#[test]
#[serial]
fn load_config_reads_prefixed_environment() {
    with_clean_env(
        &[
            ("RELAY__SERVER__PORT", "5000"),
            ("RELAY__HEARTBEAT__INTERVAL_SECS", "5"),
            ("RELAY__DISCOVERY__REGISTRY_URL", "http://consul:8500"),
        ],
        || {
            let cfg = load_config().expect("load_config failed");
            assert_eq!(cfg.server.port, 5000);
            assert_eq!(cfg.heartbeat.interval_secs, 5);
            assert_eq!(
                cfg.discovery.registry_url.as_deref(),
                Some("http://consul:8500")
            );
            assert_eq!(cfg.server.host, "0.0.0.0");
        },
    );
}

#[test]
#[serial]
fn bare_port_variable_wins() {
    with_clean_env(&[("RELAY__SERVER__PORT", "5000"), ("PORT", "6000")], || {
        let cfg = load_config().expect("load_config failed");
        assert_eq!(cfg.server.port, 6000);
    });
}

#[test]
#[serial]
fn empty_port_variable_is_ignored() {
    with_clean_env(&[("PORT", "")], || {
        let cfg = load_config().expect("load_config failed");
        assert_eq!(cfg.server.port, 4444);
    });
    with_clean_env(&[("RELAY__SERVER__PORT", "5000"), ("PORT", "")], || {
        let cfg = load_config().expect("load_config failed");
        assert_eq!(cfg.server.port, 5000);
    });
}

#[test]
#[serial]
fn outbound_queue_from_environment() {
    with_clean_env(&[("RELAY__SERVER__OUTBOUND_QUEUE", "16")], || {
        let cfg = load_config().expect("load_config failed");
        assert_eq!(cfg.server.outbound_queue, 16);
    });
    with_clean_env(&[("RELAY__SERVER__OUTBOUND_QUEUE", "0")], || {
        assert!(load_config().is_err());
    });
}

#[test]
#[serial]
fn zero_heartbeat_interval_is_rejected() {
    with_clean_env(&[("RELAY__HEARTBEAT__INTERVAL_SECS", "0")], || {
        assert!(load_config().is_err());
    });
}

#[test]
#[serial]
fn load_config_from_file_overrides_defaults() {
    with_clean_env(&[], || {
        // load_config picks up config/default.toml relative to the cwd
        let tmp = TempDir::new().expect("create tempdir");
        let orig = env::current_dir().expect("current_dir");
        env::set_current_dir(tmp.path()).expect("set current dir");

        fs::create_dir_all("config").expect("create config dir");
        let toml = r#"
            [server]
            host = "127.0.0.1"
            port = 9000

            [heartbeat]
            interval_secs = 12

            [discovery]
            service_name = "signaling"
        "#;
        fs::write("config/default.toml", toml).expect("write config file");

        let cfg = load_config();
        env::set_current_dir(orig).expect("restore cwd");

        let cfg = cfg.expect("load_config failed");
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.server.http_port, 4445);
        assert_eq!(cfg.heartbeat.interval_secs, 12);
        assert_eq!(cfg.discovery.service_name, "signaling");
    });
}
