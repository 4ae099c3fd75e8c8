use std::time::Duration;

use async_trait::async_trait;
use http::{HeaderMap, Method, StatusCode};
use serde_json::Value;
use thiserror::Error;

/// Fully resolved request handed to an [`HttpTransport`].
///
/// `path` already carries the connection base path and, for GET requests,
/// the encoded query string. `body` is `None` whenever the query string is
/// used so a request never carries both.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub protocol: String,
    pub host: String,
    pub path: String,
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

impl TransportRequest {
    /// Absolute URL of the request (`protocol://host/path?query`).
    #[must_use]
    pub fn url(&self) -> String {
        format!("{}://{}{}", self.protocol, self.host, self.path)
    }

    /// Path without the query string.
    #[must_use]
    pub fn path_only(&self) -> &str {
        self.path.split_once('?').map_or(self.path.as_str(), |(p, _)| p)
    }

    /// Raw query string, if any.
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.path.split_once('?').map(|(_, q)| q)
    }
}

/// Failure reported by the wire transport.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// The server answered with a non-2xx status.
    #[error("HTTP {status}")]
    Status {
        status: StatusCode,
        /// Response body as received (may be HTML or JSON)
        body: String,
    },

    /// The request did not complete within the configured timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The response body exceeded the configured size limit.
    #[error("response body too large: limit {limit} bytes")]
    BodyTooLarge { limit: usize },

    /// Network, TLS or protocol failure.
    #[error("transport error: {0}")]
    Io(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl TransportError {
    /// HTTP status code, when the failure carries one.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Wire capability performing exactly one HTTP request.
///
/// Implementations own timeout policy; the client layers above never retry.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Perform the request and return the raw response text.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Status`] for non-2xx responses and other
    /// variants for network-level failures.
    async fn request(&self, request: TransportRequest) -> Result<String, TransportError>;
}
