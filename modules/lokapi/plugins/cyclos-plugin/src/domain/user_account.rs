use lokapi_rest::{ExposeSecret, RestClient, RestError, SessionClient};
use lokapi_sdk::{
    Account, Capabilities, InternalId, LokapiError, Payment, Recipient, Transaction,
};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde_json::{Value, json};

use crate::config::UserAccountConfig;

/// Session header used by Cyclos.
pub const AUTH_HEADER: &str = "Session-token";

/// One owner on a Cyclos connection.
///
/// Owns its own session client; transport and store are the parent's,
/// shared by reference.
pub struct CyclosUserAccount {
    internal_id: InternalId,
    owner_id: String,
    session: SessionClient,
    accounts: RwLock<Option<Vec<Account>>>,
}

impl CyclosUserAccount {
    /// Build the owner client under `backend_id` and install its token
    /// (manifest token when given, persisted value otherwise).
    ///
    /// # Errors
    ///
    /// Returns [`LokapiError::Rest`] if the token is not a valid header
    /// value.
    pub fn new(
        backend_id: &InternalId,
        entry: &UserAccountConfig,
        capabilities: &Capabilities,
    ) -> Result<Self, LokapiError> {
        let internal_id = backend_id.child(&entry.owner_id);
        let rest = RestClient::new(&entry.url, capabilities.transport.clone());
        let mut session = SessionClient::new(rest, AUTH_HEADER)?;
        if let Some(store) = &capabilities.store {
            session = session.with_store(store.clone(), token_key(&internal_id));
        }
        let restored =
            session.restore_token(entry.token.as_ref().map(ExposeSecret::expose_secret))?;
        tracing::debug!(
            user_account = %internal_id,
            restored_from_store = restored,
            "cyclos user account constructed"
        );

        Ok(Self {
            internal_id,
            owner_id: entry.owner_id.clone(),
            session,
            accounts: RwLock::new(None),
        })
    }

    /// `cyclos:<host>/<owner>`
    #[must_use]
    pub fn internal_id(&self) -> &InternalId {
        &self.internal_id
    }

    #[must_use]
    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    #[must_use]
    pub fn session(&self) -> &SessionClient {
        &self.session
    }

    /// Fetch this owner's accounts and refresh the cache.
    ///
    /// # Errors
    ///
    /// REST failures, or [`LokapiError::InvalidResponse`] when the payload is
    /// not a list of accounts.
    pub async fn get_accounts(&self) -> Result<Vec<Account>, LokapiError> {
        let payload = self
            .session
            .auth_get(&format!("/{}/accounts", self.owner_id), None, None)
            .await
            .map_err(authentication_required)?;
        let accounts = into_list(payload, "accounts")?
            .into_iter()
            .map(|raw| self.make_account(raw))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            user_account = %self.internal_id,
            count = accounts.len(),
            "cyclos accounts fetched"
        );
        *self.accounts.write() = Some(accounts.clone());
        Ok(accounts)
    }

    /// Accounts from the last successful [`CyclosUserAccount::get_accounts`].
    #[must_use]
    pub fn cached_accounts(&self) -> Option<Vec<Account>> {
        self.accounts.read().clone()
    }

    pub fn invalidate(&self) {
        *self.accounts.write() = None;
    }

    /// Clear the session token (and its persisted copy) and the cache.
    ///
    /// # Errors
    ///
    /// Same as [`SessionClient::set_token`].
    pub fn logout(&self) -> Result<(), LokapiError> {
        self.session.set_token(None)?;
        self.invalidate();
        Ok(())
    }

    /// # Errors
    ///
    /// REST failures, or [`LokapiError::InvalidResponse`] when the payload is
    /// not a list of transactions.
    pub async fn get_transactions(&self) -> Result<Vec<Transaction>, LokapiError> {
        let payload = self
            .session
            .auth_get(&format!("/{}/transactions", self.owner_id), None, None)
            .await
            .map_err(authentication_required)?;
        into_list(payload, "transactions")?
            .into_iter()
            .map(|raw| {
                let id = record_id(&raw, "transaction")?;
                Ok(Transaction {
                    internal_id: self.internal_id.child(&id),
                    id,
                    owner_id: self.owner_id.clone(),
                    raw,
                })
            })
            .collect()
    }

    /// Pay `recipient` from this owner.
    ///
    /// Asks the server which payment types are available towards the
    /// recipient and submits the payment only when exactly one is.
    ///
    /// # Errors
    ///
    /// - [`LokapiError::InvalidAmount`] when `amount` is not positive
    /// - [`LokapiError::NoPaymentRoute`] when no payment type is available
    /// - [`LokapiError::AmbiguousPaymentRoute`] when several are
    /// - REST failures
    pub async fn transfer(
        &self,
        recipient: &Recipient,
        amount: Decimal,
        description: &str,
    ) -> Result<Payment, LokapiError> {
        ensure_positive(amount)?;

        let data = self
            .session
            .auth_get(
                "/self/payments/data-for-perform",
                Some(json!({ "to": recipient.owner_id })),
                None,
            )
            .await
            .map_err(authentication_required)?;
        let payment_types = data
            .get("paymentTypes")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                LokapiError::InvalidResponse("missing paymentTypes in data-for-perform".to_owned())
            })?;

        let payment_type = match payment_types.as_slice() {
            [] => {
                return Err(LokapiError::NoPaymentRoute {
                    recipient: recipient.internal_id.to_string(),
                });
            }
            [single] => single,
            many => {
                return Err(LokapiError::AmbiguousPaymentRoute { count: many.len() });
            }
        };

        let mut body = json!({
            "amount": amount.to_string(),
            "description": description,
            "subject": recipient.owner_id,
        });
        if let Some(type_id) = payment_type.get("id") {
            body["type"] = type_id.clone();
        }

        let raw = self
            .session
            .auth_post("/self/payments", Some(body), None)
            .await
            .map_err(authentication_required)?;
        let id = record_id(&raw, "payment")?;
        tracing::info!(
            user_account = %self.internal_id,
            recipient = %recipient.internal_id,
            payment_id = %id,
            "cyclos payment performed"
        );

        Ok(Payment {
            internal_id: self.internal_id.child(&id),
            id,
            owner_id: self.owner_id.clone(),
            amount,
            raw,
        })
    }

    fn make_account(&self, raw: Value) -> Result<Account, LokapiError> {
        let id = record_id(&raw, "account")?;
        let balance = raw.pointer("/status/balance").and_then(parse_decimal);
        let currency_symbol = raw
            .pointer("/currency/symbol")
            .and_then(Value::as_str)
            .map(str::to_owned);

        Ok(Account {
            internal_id: self.internal_id.child(&id),
            id,
            owner_id: self.owner_id.clone(),
            balance,
            currency_symbol,
            raw,
        })
    }
}

/// Store key of an owner's session token.
#[must_use]
pub fn token_key(user_account: &InternalId) -> String {
    format!("lokapi:token:{user_account}")
}

/// # Errors
///
/// Returns [`LokapiError::InvalidAmount`] unless `amount > 0`.
pub fn ensure_positive(amount: Decimal) -> Result<(), LokapiError> {
    if amount > Decimal::ZERO {
        Ok(())
    } else {
        Err(LokapiError::InvalidAmount(amount))
    }
}

fn authentication_required(err: RestError) -> LokapiError {
    err.into_authentication_required().into()
}

fn into_list(payload: Value, what: &str) -> Result<Vec<Value>, LokapiError> {
    match payload {
        Value::Array(items) => Ok(items),
        _ => Err(LokapiError::InvalidResponse(format!("expected a list of {what}"))),
    }
}

fn record_id(raw: &Value, what: &str) -> Result<String, LokapiError> {
    match raw.get("id") {
        Some(Value::String(id)) => Ok(id.clone()),
        Some(Value::Number(id)) => Ok(id.to_string()),
        _ => Err(LokapiError::InvalidResponse(format!("{what} without id"))),
    }
}

fn parse_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.to_string().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use std::sync::Arc;

    use http::{Method, StatusCode};
    use lokapi_rest::testing::{MockResponse, MockTransport};
    use lokapi_rest::{MemoryStore, PersistentStore};

    fn entry(token: Option<&str>) -> UserAccountConfig {
        serde_json::from_value(json!({
            "url": "https://cyclos.example.org/api",
            "token": token,
            "owner_id": "alice",
        }))
        .unwrap()
    }

    fn backend_id() -> InternalId {
        InternalId::backend("cyclos", "cyclos.example.org")
    }

    #[test]
    fn account_fields_are_extracted() {
        let caps = Capabilities::new(Arc::new(MockTransport::new()));
        let ua = CyclosUserAccount::new(&backend_id(), &entry(Some("t")), &caps).unwrap();

        let account = ua
            .make_account(json!({
                "id": "acc-1",
                "status": {"balance": "12.50"},
                "currency": {"symbol": "LEM"},
            }))
            .unwrap();

        assert_eq!(account.internal_id.as_str(), "cyclos:cyclos.example.org/alice/acc-1");
        assert_eq!(account.balance, Some(Decimal::new(1250, 2)));
        assert_eq!(account.currency_symbol.as_deref(), Some("LEM"));
    }

    #[test]
    fn numeric_ids_and_balances_are_accepted() {
        assert_eq!(record_id(&json!({"id": 12}), "x").unwrap(), "12");
        assert_eq!(parse_decimal(&json!(3.5)), Some(Decimal::new(35, 1)));
        assert!(record_id(&json!({}), "x").is_err());
    }

    #[test]
    fn manifest_token_replaces_persisted_one() {
        let store = Arc::new(MemoryStore::new());
        let key = token_key(&backend_id().child("alice"));
        store.set(&key, "old-expired");
        let caps = Capabilities::new(Arc::new(MockTransport::new())).with_store(store.clone());

        let ua = CyclosUserAccount::new(&backend_id(), &entry(Some("fresh")), &caps).unwrap();

        assert_eq!(ua.session().token().unwrap().expose_secret(), "fresh");
        assert_eq!(store.get(&key).as_deref(), Some("fresh"));
    }

    #[test]
    fn persisted_token_is_used_when_manifest_has_none() {
        let store = Arc::new(MemoryStore::new());
        store.set(&token_key(&backend_id().child("alice")), "persisted");
        let caps = Capabilities::new(Arc::new(MockTransport::new())).with_store(store);

        let ua = CyclosUserAccount::new(&backend_id(), &entry(None), &caps).unwrap();
        assert_eq!(ua.session().token().unwrap().expose_secret(), "persisted");
    }

    #[test]
    fn logout_deletes_persisted_token() {
        let store = Arc::new(MemoryStore::new());
        let key = token_key(&backend_id().child("alice"));
        let caps = Capabilities::new(Arc::new(MockTransport::new())).with_store(store.clone());
        let ua = CyclosUserAccount::new(&backend_id(), &entry(Some("t")), &caps).unwrap();
        assert!(store.get(&key).is_some());

        ua.logout().unwrap();

        assert!(!ua.session().has_token());
        assert!(store.get(&key).is_none());
    }

    #[tokio::test]
    async fn expired_session_is_authentication_required() {
        let transport = Arc::new(MockTransport::new());
        transport.on(
            Method::GET,
            "/api/alice/accounts",
            MockResponse::Status(StatusCode::UNAUTHORIZED, r#"{"code":"loggedOut"}"#.to_owned()),
        );
        let caps = Capabilities::new(transport);
        let ua = CyclosUserAccount::new(&backend_id(), &entry(Some("expired")), &caps).unwrap();

        let err = ua.get_accounts().await.unwrap_err();

        assert!(err.is_authentication_required());
        assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
        match err {
            LokapiError::Rest(RestError::AuthenticationRequired { body, .. }) => {
                assert_eq!(body.as_deref(), Some(r#"{"code":"loggedOut"}"#));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn owner_without_token_cannot_fetch() {
        let transport = Arc::new(MockTransport::new());
        let caps = Capabilities::new(transport.clone());
        let ua = CyclosUserAccount::new(&backend_id(), &entry(None), &caps).unwrap();

        let err = ua.get_accounts().await.unwrap_err();
        assert!(err.is_authentication_required());
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn cache_follows_fetch_and_invalidation() {
        let transport = Arc::new(MockTransport::new());
        transport.on(
            Method::GET,
            "/api/alice/accounts",
            MockResponse::Json(json!([{"id": "a1"}])),
        );
        let caps = Capabilities::new(transport);
        let ua = CyclosUserAccount::new(&backend_id(), &entry(Some("t")), &caps).unwrap();

        assert!(ua.cached_accounts().is_none());
        ua.get_accounts().await.unwrap();
        assert_eq!(ua.cached_accounts().unwrap().len(), 1);
        ua.invalidate();
        assert!(ua.cached_accounts().is_none());
    }

    #[test]
    fn non_positive_amounts_are_rejected() {
        assert!(ensure_positive(Decimal::ONE).is_ok());
        assert!(matches!(
            ensure_positive(Decimal::ZERO),
            Err(LokapiError::InvalidAmount(_))
        ));
        assert!(ensure_positive(Decimal::NEGATIVE_ONE).is_err());
    }
}
