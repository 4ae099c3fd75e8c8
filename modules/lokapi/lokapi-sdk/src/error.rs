//! Error types for lokapi backends and the aggregation facade.

use http::StatusCode;
use lokapi_rest::RestError;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors surfaced by backend connections and the facade.
///
/// Nothing is retried or swallowed: an aggregated call fails as a whole when
/// any backend or owner sub-call fails.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LokapiError {
    /// Failure of the REST layer (invalid host, invalid JSON, authentication
    /// required, transport).
    #[error(transparent)]
    Rest(#[from] RestError),

    /// The backend explicitly rejected the login credentials.
    #[error("{0}")]
    InvalidCredentials(String),

    /// The backend reported any other non-success response. Carries the
    /// backend's error text.
    #[error("{0}")]
    ApiRequestFailed(String),

    /// No payment type is available towards the recipient.
    #[error("No payment types available between selected accounts (recipient: {recipient})")]
    NoPaymentRoute { recipient: String },

    /// Several payment types are available; choosing one is not supported.
    #[error(
        "More than one payment types available between selected accounts ({count}); not supported"
    )]
    AmbiguousPaymentRoute { count: usize },

    /// No factory is registered for the descriptor kind.
    #[error("unsupported backend kind: {0}")]
    UnsupportedBackend(String),

    /// A factory for this kind is already registered.
    #[error("backend kind already registered: {0}")]
    DuplicateBackend(String),

    /// Backend descriptor does not have the expected shape.
    #[error("invalid backend descriptor: {0}")]
    InvalidDescriptor(String),

    /// Well-formed JSON with an unexpected shape.
    #[error("unexpected response: {0}")]
    InvalidResponse(String),

    /// Transfer source account is not owned by any known backend or owner.
    #[error("no backend owns account {0}")]
    UnknownAccount(String),

    /// Transfer amount must be strictly positive.
    #[error("invalid amount: {0}")]
    InvalidAmount(Decimal),

    /// Facade operation called before a successful login.
    #[error("not logged in")]
    NotLoggedIn,

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
}

impl LokapiError {
    #[must_use]
    pub fn is_authentication_required(&self) -> bool {
        matches!(self, LokapiError::Rest(e) if e.is_authentication_required())
    }

    /// HTTP status carried by the underlying REST error, if any.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            LokapiError::Rest(e) => e.status(),
            _ => None,
        }
    }
}
