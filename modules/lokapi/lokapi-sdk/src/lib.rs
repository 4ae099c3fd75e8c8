#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! lokapi SDK
//!
//! Contracts shared by the aggregation facade and the backend plugins:
//!
//! - [`BackendConnection`] - trait implemented by every secondary backend
//! - [`BackendFactory`], [`BackendRegistry`] - kind-keyed construction of
//!   connections from login manifest entries
//! - [`Capabilities`], [`FanOutMode`] - shared transport/store bundle and
//!   order-preserving fan-out
//! - [`InternalId`], [`Account`], [`Transaction`], [`Payment`],
//!   [`Recipient`], [`BackendDescriptor`] - records and identifiers
//! - [`LokapiError`] - error taxonomy
//!
//! ## Usage
//!
//! ```ignore
//! let registry = BackendRegistry::new();
//! registry.register(Arc::new(CyclosBackendFactory))?;
//!
//! let backend = registry.create(&descriptor, &capabilities)?;
//! let accounts = backend.get_accounts().await?;
//! ```

pub mod api;
pub mod capabilities;
pub mod error;
pub mod models;
pub mod registry;

pub use api::BackendConnection;
pub use capabilities::{Capabilities, FanOutMode};
pub use error::LokapiError;
pub use models::{Account, BackendDescriptor, InternalId, Payment, Recipient, Transaction};
pub use registry::{BackendFactory, BackendRegistry};
