use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use lokapi_rest::Connection;
use lokapi_sdk::{
    Account, BackendConnection, Capabilities, InternalId, LokapiError, Payment, Recipient,
    Transaction,
};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::config::CyclosCredentials;
use crate::domain::user_account::{CyclosUserAccount, ensure_positive, token_key};

pub const KIND: &str = "cyclos";

type UserAccounts = Arc<[Arc<CyclosUserAccount>]>;

/// Cyclos connection: one server, one or more owners.
///
/// The owner table is built on first use from the manifest and kept until
/// [`CyclosBackend::reset_user_accounts`]. Operations fan out over the owners
/// according to [`Capabilities::fan_out`] and keep manifest order.
pub struct CyclosBackend {
    internal_id: InternalId,
    credentials: CyclosCredentials,
    capabilities: Capabilities,
    user_accounts: RwLock<Option<UserAccounts>>,
}

impl CyclosBackend {
    /// # Errors
    ///
    /// Returns [`LokapiError::InvalidDescriptor`] when the manifest lists no
    /// user account.
    pub fn new(
        credentials: CyclosCredentials,
        capabilities: Capabilities,
    ) -> Result<Self, LokapiError> {
        let first = credentials.user_accounts.first().ok_or_else(|| {
            LokapiError::InvalidDescriptor("cyclos backend without user accounts".to_owned())
        })?;
        let internal_id = InternalId::backend(KIND, Connection::parse(&first.url).host());

        Ok(Self {
            internal_id,
            credentials,
            capabilities,
            user_accounts: RwLock::new(None),
        })
    }

    /// Owner clients in manifest order, built on first call.
    ///
    /// Entries repeating an owner already listed are skipped.
    ///
    /// # Errors
    ///
    /// Errors of [`CyclosUserAccount::new`]; nothing is cached in that case.
    pub fn user_accounts(&self) -> Result<UserAccounts, LokapiError> {
        if let Some(cached) = self.user_accounts.read().as_ref() {
            return Ok(Arc::clone(cached));
        }

        let mut slot = self.user_accounts.write();
        if let Some(cached) = slot.as_ref() {
            return Ok(Arc::clone(cached));
        }

        let mut seen = HashSet::new();
        let mut built = Vec::with_capacity(self.credentials.user_accounts.len());
        for entry in &self.credentials.user_accounts {
            if !seen.insert(entry.owner_id.as_str()) {
                tracing::warn!(
                    backend = %self.internal_id,
                    owner_id = %entry.owner_id,
                    "duplicate owner in manifest, skipped"
                );
                continue;
            }
            built.push(Arc::new(CyclosUserAccount::new(
                &self.internal_id,
                entry,
                &self.capabilities,
            )?));
        }

        let built: UserAccounts = built.into();
        tracing::debug!(
            backend = %self.internal_id,
            count = built.len(),
            "cyclos user accounts built"
        );
        *slot = Some(Arc::clone(&built));
        Ok(built)
    }

    /// Drop the owner table; the next operation rebuilds it and restores
    /// tokens again.
    pub fn reset_user_accounts(&self) {
        *self.user_accounts.write() = None;
    }

    fn owner_of(&self, account: &Account) -> Result<Arc<CyclosUserAccount>, LokapiError> {
        self.user_accounts()?
            .iter()
            .find(|ua| account.internal_id.is_within(ua.internal_id()))
            .cloned()
            .ok_or_else(|| LokapiError::UnknownAccount(account.internal_id.to_string()))
    }
}

#[async_trait]
impl BackendConnection for CyclosBackend {
    fn kind(&self) -> &str {
        KIND
    }

    fn internal_id(&self) -> &InternalId {
        &self.internal_id
    }

    async fn get_accounts(&self) -> Result<Vec<Account>, LokapiError> {
        let user_accounts = self.user_accounts()?;
        self.capabilities
            .fan_out
            .gather(
                user_accounts
                    .iter()
                    .cloned()
                    .map(|ua| async move { ua.get_accounts().await }),
            )
            .await
    }

    async fn get_transactions(&self) -> Result<Vec<Transaction>, LokapiError> {
        let user_accounts = self.user_accounts()?;
        self.capabilities
            .fan_out
            .gather(
                user_accounts
                    .iter()
                    .cloned()
                    .map(|ua| async move { ua.get_transactions().await }),
            )
            .await
    }

    fn cached_accounts(&self) -> Vec<Account> {
        let Some(user_accounts) = self.user_accounts.read().clone() else {
            return Vec::new();
        };
        user_accounts
            .iter()
            .filter_map(|ua| ua.cached_accounts())
            .flatten()
            .collect()
    }

    async fn transfer(
        &self,
        from: &Account,
        recipient: &Recipient,
        amount: Decimal,
        description: &str,
    ) -> Result<Payment, LokapiError> {
        ensure_positive(amount)?;
        if !recipient.internal_id.is_within(&self.internal_id) {
            return Err(LokapiError::NoPaymentRoute {
                recipient: recipient.internal_id.to_string(),
            });
        }
        let owner = self.owner_of(from)?;
        owner.transfer(recipient, amount, description).await
    }

    fn make_recipients(&self, contact: &Value) -> Result<Vec<Recipient>, LokapiError> {
        let owners = match contact
            .get("monujo_backends")
            .and_then(|backends| backends.get(self.internal_id.as_str()))
        {
            None | Some(Value::Null) => return Ok(Vec::new()),
            Some(Value::Array(owners)) => owners,
            Some(_) => {
                return Err(LokapiError::InvalidResponse(format!(
                    "monujo_backends entry for {} is not a list",
                    self.internal_id
                )));
            }
        };
        let name = contact
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_owned);

        owners
            .iter()
            .map(|owner| {
                let owner_id = match owner {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    _ => {
                        return Err(LokapiError::InvalidResponse(format!(
                            "invalid owner id in monujo_backends for {}",
                            self.internal_id
                        )));
                    }
                };
                Ok(Recipient {
                    internal_id: self.internal_id.child(&owner_id),
                    backend_id: self.internal_id.clone(),
                    owner_id,
                    name: name.clone(),
                    raw: contact.clone(),
                })
            })
            .collect()
    }

    fn invalidate(&self) {
        if let Some(user_accounts) = self.user_accounts.read().as_ref() {
            for ua in user_accounts.iter() {
                ua.invalidate();
            }
        }
    }

    /// Clears every owner's token, including owners not built yet, and drops
    /// the owner table.
    fn logout(&self) -> Result<(), LokapiError> {
        let built = self.user_accounts.write().take();
        if let Some(user_accounts) = built {
            for ua in user_accounts.iter() {
                ua.logout()?;
            }
        }
        if let Some(store) = &self.capabilities.store {
            for entry in &self.credentials.user_accounts {
                store.delete(&token_key(&self.internal_id.child(&entry.owner_id)));
            }
        }
        tracing::debug!(backend = %self.internal_id, "cyclos backend logged out");
        Ok(())
    }
}
