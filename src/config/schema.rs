//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Root configuration for a service process.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Endpoint wrapper settings (timeouts, thresholds, prefixes).
    pub http: HttpConfig,

    /// Service identity overrides.
    pub service: ServiceSection,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Outbound client settings.
    pub clients: ClientConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Settings consumed by the endpoint wrapper.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Process-wide handler timeout in seconds, used when an endpoint has no
    /// valid override.
    pub timeout_secs: f64,

    /// Calls slower than this (seconds) are logged at elevated severity.
    pub slow_api_threshold_secs: f64,

    /// Prefix prepended to the paths of internal endpoints.
    pub internal_prefix: String,

    /// Upper bound on buffered request bodies.
    pub max_body_bytes: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60.0,
            slow_api_threshold_secs: 1.0,
            internal_prefix: "/__onlyinternal".to_string(),
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

impl HttpConfig {
    /// Reloadable subset of this section.
    pub fn settings(&self) -> HttpSettings {
        HttpSettings {
            default_timeout: Duration::try_from_secs_f64(self.timeout_secs)
                .unwrap_or(Duration::from_secs(60)),
            slow_threshold: Duration::try_from_secs_f64(self.slow_api_threshold_secs)
                .unwrap_or(Duration::from_secs(1)),
        }
    }
}

/// Values read by every invocation; swapped atomically on reload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HttpSettings {
    pub default_timeout: Duration,
    pub slow_threshold: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        HttpConfig::default().settings()
    }
}

/// Service identity overrides.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceSection {
    /// Service name reported in stats; discovered from the process name if unset.
    pub name: Option<String>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default `EnvFilter` directive, overridden by `RUST_LOG`.
    pub log_filter: String,

    /// Emit JSON log lines instead of the human-readable format.
    pub json_logs: bool,

    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Prometheus exporter bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: "duplex_endpoint=info,stats=info,exceptions=info,tower_http=info"
                .to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Outbound client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// App used when a call does not name one.
    pub default_app: Option<String>,

    /// Base URL per target app (e.g., `users = "http://10.0.0.5:8080"`).
    pub apps: HashMap<String, String>,

    /// Whole-request timeout enforced by the client transport, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            default_app: None,
            apps: HashMap::new(),
            request_timeout_secs: 30,
        }
    }
}
