//! Client configuration.

use std::path::Path;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use lokapi_rest::TransportConfig;
use lokapi_sdk::{FanOutMode, LokapiError};
use serde::{Deserialize, Serialize};

use crate::odoo::API_VERSION;

/// Prefix of environment overrides (`LOKAPI__TRANSPORT__TIMEOUT_MS=5000`).
pub const ENV_PREFIX: &str = "LOKAPI__";

/// Configuration of a [`LokApi`](crate::LokApi) client.
///
/// ```yaml
/// host: odoo.example.org
/// db_name: lokavaluto
/// fan_out: parallel
/// transport:
///   timeout_ms: 30000
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LokApiConfig {
    /// Odoo server (`host`, `host/path` or `proto://host/path`)
    pub host: String,

    /// Odoo database name sent with the login request
    pub db_name: String,

    /// API version announced to the Odoo server (default: 12)
    pub api_version: u32,

    /// How aggregated calls await backends and owners (default: parallel)
    pub fan_out: FanOutMode,

    pub transport: TransportConfig,
}

impl Default for LokApiConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            db_name: String::new(),
            api_version: API_VERSION,
            fan_out: FanOutMode::default(),
            transport: TransportConfig::default(),
        }
    }
}

impl LokApiConfig {
    #[must_use]
    pub fn new(host: impl Into<String>, db_name: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            db_name: db_name.into(),
            ..Self::default()
        }
    }

    /// Layered load: defaults, then the YAML file (when given), then
    /// `LOKAPI__*` environment variables (`__` separates nested keys).
    ///
    /// # Errors
    ///
    /// Returns [`LokapiError::Config`] when the file is missing or a value
    /// does not fit the schema.
    pub fn load(path: Option<&Path>) -> Result<Self, LokapiError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            if !path.is_file() {
                return Err(LokapiError::Config(format!(
                    "config file does not exist: {}",
                    path.display()
                )));
            }
            figment = figment.merge(Yaml::file(path));
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Self = figment
            .extract()
            .map_err(|e| LokapiError::Config(e.to_string()))?;
        tracing::debug!(
            host = %config.host,
            db_name = %config.db_name,
            fan_out = ?config.fan_out,
            "lokapi configuration loaded"
        );
        Ok(config)
    }
}
