//! Cyclos entry of the login manifest.

use secrecy::SecretString;
use serde::{Deserialize, Deserializer};

/// Credentials of a `cyclos` backend descriptor.
#[derive(Debug, Clone, Deserialize)]
pub struct CyclosCredentials {
    /// Owners reachable through this backend, in manifest order.
    pub user_accounts: Vec<UserAccountConfig>,
}

/// One owner on a Cyclos server.
#[derive(Debug, Clone, Deserialize)]
pub struct UserAccountConfig {
    /// Server URL (`https://host/path`).
    pub url: String,

    /// Session token issued by the primary backend.
    #[serde(default)]
    pub token: Option<SecretString>,

    /// Cyclos owner identifier.
    #[serde(deserialize_with = "string_or_number")]
    pub owner_id: String,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}
