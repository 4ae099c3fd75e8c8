//! Backend connection trait implemented by every backend plugin.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::error::LokapiError;
use crate::models::{Account, InternalId, Payment, Recipient, Transaction};

/// One secondary backend bound to one [`BackendDescriptor`].
///
/// Created by a [`BackendFactory`] at login and kept for the session. Every
/// record it returns carries an internal id prefixed by
/// [`BackendConnection::internal_id`], which is how the facade routes
/// follow-up operations back to it.
///
/// [`BackendDescriptor`]: crate::BackendDescriptor
/// [`BackendFactory`]: crate::BackendFactory
#[async_trait]
pub trait BackendConnection: Send + Sync {
    /// Registry kind (`cyclos`, ...).
    fn kind(&self) -> &str;

    /// `<kind>:<host>`
    fn internal_id(&self) -> &InternalId;

    /// Accounts of every owner, in owner manifest order then response order.
    ///
    /// Refreshes the per-owner account caches.
    ///
    /// # Errors
    ///
    /// Fails as a whole if any owner's fetch fails.
    async fn get_accounts(&self) -> Result<Vec<Account>, LokapiError>;

    /// Transactions of every owner, same ordering as
    /// [`BackendConnection::get_accounts`].
    ///
    /// # Errors
    ///
    /// Fails as a whole if any owner's fetch fails.
    async fn get_transactions(&self) -> Result<Vec<Transaction>, LokapiError>;

    /// Accounts from the last successful `get_accounts` of each owner.
    fn cached_accounts(&self) -> Vec<Account>;

    /// Pay `amount` from `from` to `recipient`.
    ///
    /// # Errors
    ///
    /// - [`LokapiError::InvalidAmount`] for a non-positive amount
    /// - [`LokapiError::UnknownAccount`] when `from` is not held on this backend
    /// - [`LokapiError::NoPaymentRoute`] / [`LokapiError::AmbiguousPaymentRoute`]
    ///   depending on the available payment types
    async fn transfer(
        &self,
        from: &Account,
        recipient: &Recipient,
        amount: Decimal,
        description: &str,
    ) -> Result<Payment, LokapiError>;

    /// Recipients on this backend for a contact payload.
    ///
    /// # Errors
    ///
    /// Returns [`LokapiError::InvalidResponse`] when the contact's backend
    /// entry has an unexpected shape.
    fn make_recipients(&self, contact: &Value) -> Result<Vec<Recipient>, LokapiError>;

    /// Drop cached state; the next call rebuilds it on demand.
    fn invalidate(&self);

    /// End the session: drop cached state and forget any session token this
    /// connection persisted.
    ///
    /// # Errors
    ///
    /// Implementations fail when a token cannot be cleared.
    fn logout(&self) -> Result<(), LokapiError> {
        self.invalidate();
        Ok(())
    }
}
