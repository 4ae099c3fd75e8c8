#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! JSON REST client layers for Lokavaluto backends
//!
//! This crate provides the layered client used by every backend connection:
//! - [`HttpTransport`] - the wire capability (one request in, raw text out)
//! - [`RestClient`] - stateless JSON client: host validation, URL building,
//!   header merging, query encoding and bounded JSON error previews
//! - [`SessionClient`] - adds a session token whose setter is the only place
//!   the authentication header is recomputed, plus authenticated verbs
//! - [`PersistentStore`] - key-value capability used to persist tokens
//! - [`HyperTransport`] - default transport built on hyper + rustls
//!
//! # Example
//!
//! ```ignore
//! use lokapi_rest::{HyperTransport, RestClient, SessionClient, TransportConfig};
//! use std::sync::Arc;
//!
//! let transport = Arc::new(HyperTransport::new(&TransportConfig::default())?);
//! let session = SessionClient::new(
//!     RestClient::new("https://cyclos.example.org/api", transport),
//!     "Session-token",
//! )?;
//! session.set_token(Some("abc"))?;
//! let accounts = session.auth_get("/self/accounts", None, None).await?;
//! ```

mod client;
mod config;
mod connection;
mod error;
mod hyper_transport;
mod session;
mod store;
mod transport;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use client::{COMMON_HEADERS, RequestOptions, RestClient};
pub use config::TransportConfig;
pub use connection::{Connection, is_valid_host};
pub use error::{PREVIEW_LIMIT, RestError, json_preview};
pub use hyper_transport::HyperTransport;
pub use session::SessionClient;
pub use store::{MemoryStore, PersistentStore};
pub use transport::{HttpTransport, TransportError, TransportRequest};

pub use secrecy::{ExposeSecret, SecretString};
