use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default user agent sent by [`HyperTransport`](crate::HyperTransport).
pub const DEFAULT_USER_AGENT: &str = concat!("lokapi-rs/", env!("CARGO_PKG_VERSION"));

/// Configuration of the default hyper transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransportConfig {
    /// Per-request timeout in milliseconds (default: 30 000)
    pub timeout_ms: u64,

    /// Maximum accepted response body size in bytes (default: 10 MiB)
    pub max_body_size: usize,

    /// Allow plain `http://` targets (default: false)
    ///
    /// Only meant for local mock servers.
    pub allow_insecure_http: bool,

    /// `User-Agent` header value
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            max_body_size: 10 * 1024 * 1024,
            allow_insecure_http: false,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

impl TransportConfig {
    /// Configuration for local mock servers (plain HTTP, short timeout).
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            timeout_ms: 10_000,
            max_body_size: 1024 * 1024,
            allow_insecure_http: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
