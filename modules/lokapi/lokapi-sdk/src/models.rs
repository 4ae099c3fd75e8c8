//! Records, descriptors and internal identifiers.

use std::fmt;

use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::LokapiError;

/// Composite identifier naming a record across the whole aggregation.
///
/// Shape: `<kind>:<host>[/<owner>][/<record>]`. Child identifiers extend
/// their parent with `/segment`, so the owning backend or user-account of any
/// record is found by prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InternalId(String);

impl InternalId {
    /// `<kind>:<host>`
    #[must_use]
    pub fn backend(kind: &str, host: &str) -> Self {
        Self(format!("{kind}:{host}"))
    }

    /// `<self>/<segment>`
    #[must_use]
    pub fn child(&self, segment: &str) -> Self {
        Self(format!("{}/{segment}", self.0))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Backend kind (text before the first `:`).
    #[must_use]
    pub fn kind(&self) -> &str {
        self.0.split_once(':').map_or(self.0.as_str(), |(kind, _)| kind)
    }

    /// `true` when `self` equals `ancestor` or is one of its descendants.
    ///
    /// Matches whole segments: `cyclos:a.org/1` is not within `cyclos:a.org/10`.
    #[must_use]
    pub fn is_within(&self, ancestor: &InternalId) -> bool {
        match self.0.strip_prefix(ancestor.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}

impl fmt::Display for InternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for InternalId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Secondary backend entry of the primary login manifest:
/// `{ "type": "<kind>", ...credentials }`.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendDescriptor {
    /// Registry lookup key
    #[serde(rename = "type")]
    pub kind: String,

    /// Every other member of the entry
    #[serde(flatten)]
    pub credentials: Map<String, Value>,
}

impl BackendDescriptor {
    /// Deserialize the credentials into a backend-specific shape.
    ///
    /// # Errors
    ///
    /// Returns [`LokapiError::InvalidDescriptor`] when the credentials do not
    /// match `T`.
    pub fn credentials_as<T: DeserializeOwned>(&self) -> Result<T, LokapiError> {
        serde_json::from_value(Value::Object(self.credentials.clone()))
            .map_err(|e| LokapiError::InvalidDescriptor(format!("{} backend: {e}", self.kind)))
    }
}

// Credentials carry session tokens; only the keys are shown.
impl fmt::Debug for BackendDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendDescriptor")
            .field("kind", &self.kind)
            .field("credentials", &self.credentials.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Account held by one owner on one backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Account {
    /// `<kind>:<host>/<owner>/<account id>`
    pub internal_id: InternalId,
    pub id: String,
    pub owner_id: String,
    pub balance: Option<Decimal>,
    pub currency_symbol: Option<String>,
    /// Backend payload as received
    pub raw: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    /// `<kind>:<host>/<owner>/<transaction id>`
    pub internal_id: InternalId,
    pub id: String,
    pub owner_id: String,
    pub raw: Value,
}

/// Result of a successful transfer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Payment {
    pub internal_id: InternalId,
    pub id: String,
    pub owner_id: String,
    pub amount: Decimal,
    pub raw: Value,
}

/// Transfer target on a given backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recipient {
    /// `<kind>:<host>/<owner>`
    pub internal_id: InternalId,
    /// Backend the recipient was built for
    pub backend_id: InternalId,
    pub owner_id: String,
    pub name: Option<String>,
    /// Contact payload the recipient was derived from
    pub raw: Value,
}
