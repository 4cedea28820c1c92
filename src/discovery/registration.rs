use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Settings;
use crate::utils::RelayError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Body of `PUT /v1/agent/service/register`.
///
/// `Port` is the WebSocket relay port. The health facade listens on its
/// own port, which the check URL and the `http_port` metadata entry name.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ServiceDefinition {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Address")]
    pub address: String,
    #[serde(rename = "Port")]
    pub port: u16,
    #[serde(rename = "Meta")]
    pub meta: BTreeMap<String, String>,
    #[serde(rename = "Check")]
    pub check: HealthCheck,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HealthCheck {
    #[serde(rename = "HTTP")]
    pub http: String,
    #[serde(rename = "Interval")]
    pub interval: String,
}

#[derive(Debug, Clone)]
pub struct ServiceRegistration {
    client: reqwest::Client,
    registry_url: String,
    service: ServiceDefinition,
}

impl ServiceRegistration {
    /// Builds the registration for this instance, or `None` when no
    /// registry is configured.
    pub fn from_settings(settings: &Settings) -> Result<Option<Self>, RelayError> {
        let Some(registry_url) = settings.discovery.registry_url.as_deref() else {
            return Ok(None);
        };

        let discovery = &settings.discovery;
        let service = ServiceDefinition {
            id: format!("{}-{}", discovery.service_name, Uuid::new_v4()),
            name: discovery.service_name.clone(),
            address: discovery.advertise_address.clone(),
            port: settings.server.port,
            meta: BTreeMap::from([(
                "http_port".to_string(),
                settings.server.http_port.to_string(),
            )]),
            check: HealthCheck {
                http: format!(
                    "http://{}:{}/health",
                    discovery.advertise_address, settings.server.http_port
                ),
                interval: format!("{}s", discovery.check_interval_secs),
            },
        };

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Some(Self {
            client,
            registry_url: registry_url.trim_end_matches('/').to_string(),
            service,
        }))
    }

    pub fn service(&self) -> &ServiceDefinition {
        &self.service
    }

    pub async fn register(&self) -> Result<(), RelayError> {
        let url = format!("{}/v1/agent/service/register", self.registry_url);
        let response = self.client.put(url).json(&self.service).send().await?;
        if !response.status().is_success() {
            return Err(RelayError::DiscoveryStatus(response.status()));
        }
        Ok(())
    }

    pub async fn deregister(&self) -> Result<(), RelayError> {
        let url = format!(
            "{}/v1/agent/service/deregister/{}",
            self.registry_url, self.service.id
        );
        let response = self.client.put(url).send().await?;
        if !response.status().is_success() {
            return Err(RelayError::DiscoveryStatus(response.status()));
        }
        Ok(())
    }

    /// `register`, reporting the outcome instead of returning it.
    pub async fn announce(&self) {
        match self.register().await {
            Ok(()) => info!(service = %self.service.id, "registered with service directory"),
            Err(e) => warn!(service = %self.service.id, error = %e, "service registration failed"),
        }
    }

    /// `deregister`, reporting the outcome instead of returning it.
    pub async fn withdraw(&self) {
        match self.deregister().await {
            Ok(()) => info!(service = %self.service.id, "deregistered from service directory"),
            Err(e) => warn!(service = %self.service.id, error = %e, "service deregistration failed"),
        }
    }
}
