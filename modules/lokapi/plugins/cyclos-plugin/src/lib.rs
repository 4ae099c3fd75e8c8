//! Cyclos backend plugin
//!
//! Implements [`lokapi_sdk::BackendConnection`] for Cyclos community-currency
//! servers. A single connection may expose several owners; each one gets its
//! own session client (`Session-token` header) while transport and store are
//! shared.
//!
//! ## Manifest entry
//!
//! ```json
//! {
//!   "type": "cyclos",
//!   "user_accounts": [
//!     { "url": "https://cyclos.example.org/api", "token": "...", "owner_id": "alice" },
//!     { "url": "https://cyclos.example.org/api", "token": "...", "owner_id": "bob" }
//!   ]
//! }
//! ```
//!
//! Internal ids: `cyclos:<host>` for the connection, `cyclos:<host>/<owner>`
//! for an owner and `cyclos:<host>/<owner>/<record id>` for its records.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod config;
pub mod domain;
pub mod factory;

pub use config::{CyclosCredentials, UserAccountConfig};
pub use domain::{AUTH_HEADER, CyclosBackend, CyclosUserAccount, KIND, token_key};
pub use factory::CyclosBackendFactory;
