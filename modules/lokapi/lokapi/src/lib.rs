//! Lokavaluto client
//!
//! Logs in to the Odoo server of a local-currency network, discovers the
//! user's secondary backends from the login response and exposes merged
//! operations over all of them.
//!
//! ```no_run
//! # async fn run() -> Result<(), lokapi_sdk::LokapiError> {
//! use lokapi::{LokApi, LokApiConfig};
//! use lokapi_rest::SecretString;
//!
//! let config = LokApiConfig::load(None)?;
//! let client = LokApi::from_config(&config)?;
//! client
//!     .login("alice@example.org", &SecretString::from("secret".to_owned()))
//!     .await?;
//! let accounts = client.get_accounts().await?;
//! # let _ = accounts;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

use std::sync::Arc;

use cyclos_plugin::CyclosBackendFactory;
use lokapi_sdk::{BackendRegistry, LokapiError};

pub mod client;
pub mod config;
pub mod contact;
pub mod odoo;

pub use client::LokApi;
pub use config::LokApiConfig;
pub use contact::Contact;
pub use odoo::{ConnectionData, OdooClient};

/// Registry holding every backend kind shipped with this crate.
///
/// # Errors
///
/// Returns [`LokapiError::DuplicateBackend`] if two bundled factories share
/// a kind.
pub fn default_registry() -> Result<BackendRegistry, LokapiError> {
    let registry = BackendRegistry::new();
    registry.register(Arc::new(CyclosBackendFactory))?;
    Ok(registry)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn default_registry_knows_cyclos() {
        let registry = default_registry().unwrap();
        assert_eq!(registry.kinds(), vec![cyclos_plugin::KIND]);
    }
}
