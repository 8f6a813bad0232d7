//! Configuration data structures for the downstream requester.
//!
//! These types map directly to YAML / JSON / TOML configuration files. They are
//! serde‑friendly and include defaults so that minimal configs remain concise.
//! Durations are humantime strings ("90s", "24h") parsed on demand.
use std::{collections::HashMap, time::Duration};

use serde::{Deserialize, Serialize};

use crate::core::{DEFAULT_CLIENT_NAME, RequesterSettings};

/// Per-route downstream policy consumed when building an outbound client.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct DownstreamRoute {
    /// Upstream (inbound) path template, used for diagnostics
    pub upstream_path_template: String,
    /// Downstream (backend) path template, used for diagnostics
    pub downstream_path_template: String,
    /// Accept any server certificate, including invalid ones
    pub accept_any_server_certificate: bool,
    /// Give each client its own cookie store
    pub use_cookie_container: bool,
    /// Follow redirects returned by the downstream
    pub allow_auto_redirect: bool,
    /// Client timeout in milliseconds (0 = use the default)
    pub timeout_ms: u64,
    /// Logical client name (falls back to the default name)
    pub service_name: Option<String>,
    /// Route-specific delegating handlers, outermost first
    pub delegating_handlers: Vec<String>,
}

/// Idle client pool configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct PoolConfig {
    /// Expiry tag recorded when a client is returned to the pool
    pub expiry: String,
    /// Interval of the background eviction sweep (disabled when unset)
    pub sweep_interval: Option<String>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            expiry: "24h".to_string(),
            sweep_interval: None,
        }
    }
}

impl PoolConfig {
    pub fn expiry(&self) -> Result<Duration, humantime::DurationError> {
        humantime::parse_duration(&self.expiry)
    }

    pub fn sweep_interval(&self) -> Result<Option<Duration>, humantime::DurationError> {
        self.sweep_interval
            .as_deref()
            .map(humantime::parse_duration)
            .transpose()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct RequesterConfig {
    /// Timeout applied when a route leaves `timeout_ms` at 0
    pub default_timeout: String,
    /// Client name applied when a route has no service name
    pub default_client_name: String,
    pub pool: PoolConfig,
    /// Handlers applied to every route, outermost first
    pub global_handlers: Vec<String>,
    /// Headers added by the `request_headers` handler
    pub request_headers: HashMap<String, String>,
    /// Named downstream routes
    pub routes: HashMap<String, DownstreamRoute>,
}

impl Default for RequesterConfig {
    fn default() -> Self {
        Self {
            default_timeout: "90s".to_string(),
            default_client_name: DEFAULT_CLIENT_NAME.to_string(),
            pool: PoolConfig::default(),
            global_handlers: Vec::new(),
            request_headers: HashMap::new(),
            routes: HashMap::new(),
        }
    }
}

impl RequesterConfig {
    pub fn default_timeout(&self) -> Result<Duration, humantime::DurationError> {
        humantime::parse_duration(&self.default_timeout)
    }

    /// Resolve the runtime settings shared by every client builder.
    pub fn settings(&self) -> Result<RequesterSettings, humantime::DurationError> {
        Ok(RequesterSettings {
            default_timeout: self.default_timeout()?,
            default_client_name: self.default_client_name.clone(),
            pool_expiry: self.pool.expiry()?,
        })
    }
}
