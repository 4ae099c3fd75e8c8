use http::StatusCode;
use thiserror::Error;

use crate::transport::TransportError;

/// Maximum number of payload characters kept in an [`RestError::InvalidJson`]
/// preview.
pub const PREVIEW_LIMIT: usize = 200;

/// Errors raised by the REST client layers.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RestError {
    /// Host failed hostname validation; the transport was not invoked.
    #[error("Invalid value for host: {host}")]
    InvalidConnectionDetails { host: String },

    /// Response body is not JSON.
    ///
    /// `preview` holds at most [`PREVIEW_LIMIT`] characters of the payload,
    /// followed by `..` when truncated.
    #[error("Data is not parseable JSON: {preview}")]
    InvalidJson { preview: String },

    /// Authenticated call without a token, or the backend answered 401.
    #[error("Authentication required")]
    AuthenticationRequired {
        /// Original HTTP status when translated from a transport failure
        status: Option<StatusCode>,
        /// Original response payload when translated from a transport failure
        body: Option<String>,
    },

    /// Authentication header name or value is not a valid HTTP header.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// Request data cannot be encoded for the chosen method.
    #[error("Invalid request parameters: {0}")]
    InvalidParameters(String),

    /// Unclassified transport failure.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl RestError {
    /// `AuthenticationRequired` raised before any network access.
    #[must_use]
    pub fn authentication_required() -> Self {
        RestError::AuthenticationRequired {
            status: None,
            body: None,
        }
    }

    /// HTTP status carried by the error, if any.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            RestError::AuthenticationRequired { status, .. } => *status,
            RestError::Transport(e) => e.status(),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_authentication_required(&self) -> bool {
        matches!(self, RestError::AuthenticationRequired { .. })
    }

    /// Translate a transport-level 401 into `AuthenticationRequired`,
    /// keeping the original status and payload. Other errors pass through.
    #[must_use]
    pub fn into_authentication_required(self) -> Self {
        match self {
            RestError::Transport(TransportError::Status { status, body })
                if status == StatusCode::UNAUTHORIZED =>
            {
                RestError::AuthenticationRequired {
                    status: Some(status),
                    body: Some(body),
                }
            }
            other => other,
        }
    }
}

/// Bounded preview of a payload for diagnostics.
#[must_use]
pub fn json_preview(raw: &str) -> String {
    let mut chars = raw.chars();
    let head: String = chars.by_ref().take(PREVIEW_LIMIT).collect();
    if chars.next().is_some() {
        format!("{head}..")
    } else {
        head
    }
}
