//! Health probing of the local gateway.

use crate::{LifecycleError, LifecycleResult};

use std::panic::Location;
use std::time::Duration;

use async_trait::async_trait;
use error_location::ErrorLocation;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

const PROTOCOL: &str = "http";
const HEALTH_ENDPOINT: &str = "health";

/// A single bounded health request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthRequest {
    /// Loopback host name, `127.0.0.1` or `localhost`.
    pub host: String,
    pub port: u16,
    pub timeout: Duration,
    pub auth_token: Option<String>,
}

/// Liveness snapshot returned by the gateway's health endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthSnapshot {
    pub web: WebHealth,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebHealth {
    #[serde(default)]
    pub linked: bool,
    #[serde(default)]
    pub auth_age_ms: Option<u64>,
}

impl HealthSnapshot {
    pub fn link_label(&self) -> &'static str {
        if self.web.linked { "linked" } else { "not linked" }
    }

    /// Auth age rounded down to whole seconds, e.g. `auth 5m 3s`.
    pub fn auth_label(&self) -> Option<String> {
        self.web.auth_age_ms.map(|ms| {
            let age = Duration::from_secs(ms / 1000);
            format!("auth {}", humantime::format_duration(age))
        })
    }
}

/// Bounded-timeout liveness check against the gateway.
///
/// `Ok(None)` means the gateway answered but the body could not be decoded
/// into a [`HealthSnapshot`]; that still counts as a successful probe.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn probe(&self, request: &HealthRequest) -> LifecycleResult<Option<HealthSnapshot>>;
}

/// HTTP implementation calling `GET http://{host}:{port}/health`.
pub struct HttpHealthProbe {
    client: reqwest::Client,
}

impl HttpHealthProbe {
    pub fn new() -> LifecycleResult<Self> {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(1)
            .build()?;

        Ok(Self { client })
    }

    pub(crate) fn url(request: &HealthRequest) -> String {
        format!(
            "{PROTOCOL}://{}:{}/{HEALTH_ENDPOINT}",
            request.host, request.port
        )
    }
}

#[async_trait]
impl HealthProbe for HttpHealthProbe {
    async fn probe(&self, request: &HealthRequest) -> LifecycleResult<Option<HealthSnapshot>> {
        let port = request.port;
        let mut builder = self
            .client
            .get(Self::url(request))
            .timeout(request.timeout);

        if let Some(ref token) = request.auth_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                LifecycleError::HealthTimeout {
                    port,
                    timeout_ms: request.timeout.as_millis() as u64,
                    location: ErrorLocation::from(Location::caller()),
                }
            } else if e.is_connect() {
                LifecycleError::HealthConnection {
                    port,
                    message: e.to_string(),
                    location: ErrorLocation::from(Location::caller()),
                }
            } else {
                LifecycleError::from(e)
            }
        })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(LifecycleError::AuthMismatch {
                port,
                status: status.as_u16(),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        if !status.is_success() {
            return Err(LifecycleError::HealthStatus {
                port,
                status: status.as_u16(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let snapshot = match response.bytes().await {
            Ok(body) => match serde_json::from_slice::<HealthSnapshot>(&body) {
                Ok(snapshot) => Some(snapshot),
                Err(e) => {
                    debug!("Health snapshot on port {port} not decodable: {e}");
                    None
                }
            },
            Err(e) => {
                debug!("Health body on port {port} unreadable: {e}");
                None
            }
        };

        Ok(snapshot)
    }
}
