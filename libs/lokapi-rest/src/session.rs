use std::sync::Arc;

use http::HeaderName;
use parking_lot::RwLock;
use secrecy::SecretString;
use serde_json::Value;

use crate::client::{RequestOptions, RestClient, verbs};
use crate::error::RestError;
use crate::store::PersistentStore;

/// [`RestClient`] owning a session token.
///
/// [`SessionClient::set_token`] is the only place the token changes, and every
/// change recomputes the authentication header named at construction
/// (`Session-token`, `API-KEY`, ...). When a store is attached the token is
/// written through on every change.
///
/// The handshake that produces the token is backend-specific and lives in the
/// backend clients.
pub struct SessionClient {
    rest: RestClient,
    auth_header: HeaderName,
    token: RwLock<Option<SecretString>>,
    store: Option<(Arc<dyn PersistentStore>, String)>,
}

impl SessionClient {
    /// Wrap `rest`, sending the token under `auth_header`.
    ///
    /// # Errors
    ///
    /// Returns [`RestError::InvalidHeader`] if `auth_header` is not a valid
    /// header name.
    pub fn new(rest: RestClient, auth_header: &str) -> Result<Self, RestError> {
        let auth_header = HeaderName::try_from(auth_header)
            .map_err(|e| RestError::InvalidHeader(format!("{auth_header}: {e}")))?;
        Ok(Self {
            rest,
            auth_header,
            token: RwLock::new(None),
            store: None,
        })
    }

    /// Persist the token under `key` in `store`.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn PersistentStore>, key: impl Into<String>) -> Self {
        self.store = Some((store, key.into()));
        self
    }

    #[must_use]
    pub fn rest(&self) -> &RestClient {
        &self.rest
    }

    #[must_use]
    pub fn auth_header(&self) -> &HeaderName {
        &self.auth_header
    }

    #[must_use]
    pub fn token(&self) -> Option<SecretString> {
        self.token.read().clone()
    }

    #[must_use]
    pub fn has_token(&self) -> bool {
        self.token.read().is_some()
    }

    /// Set or clear the session token.
    ///
    /// An empty value clears it. The authentication header follows the token
    /// and the attached store, if any, is updated (set or delete).
    ///
    /// # Errors
    ///
    /// Returns [`RestError::InvalidHeader`] if the token is not a valid header
    /// value; the previous token is kept in that case.
    pub fn set_token(&self, token: Option<&str>) -> Result<(), RestError> {
        let token = token.filter(|t| !t.is_empty());
        let mut current = self.token.write();
        self.rest
            .set_auth_header_value(self.auth_header.clone(), token)?;
        *current = token.map(|t| SecretString::from(t.to_owned()));
        drop(current);

        if let Some((store, key)) = &self.store {
            match token {
                Some(t) => store.set(key, t),
                None => store.delete(key),
            }
        }
        tracing::debug!(
            header = %self.auth_header,
            host = %self.rest.connection().host(),
            has_token = token.is_some(),
            "session token updated"
        );
        Ok(())
    }

    /// Install `issued` when one is given, otherwise restore the persisted
    /// token.
    ///
    /// A non-empty `issued` token replaces the stored one. Returns `true`
    /// when the persisted token was used.
    ///
    /// # Errors
    ///
    /// Same as [`SessionClient::set_token`].
    pub fn restore_token(&self, issued: Option<&str>) -> Result<bool, RestError> {
        if let Some(token) = issued.filter(|t| !t.is_empty()) {
            self.set_token(Some(token))?;
            return Ok(false);
        }

        let persisted = self
            .store
            .as_ref()
            .and_then(|(store, key)| store.get(key))
            .filter(|t| !t.is_empty());
        let restored = persisted.is_some();
        self.set_token(persisted.as_deref())?;
        Ok(restored)
    }

    /// Unauthenticated request.
    ///
    /// # Errors
    ///
    /// Same as [`RestClient::request`].
    pub async fn request(&self, path: &str, options: RequestOptions) -> Result<Value, RestError> {
        self.rest.request(path, options).await
    }

    /// Authenticated request.
    ///
    /// # Errors
    ///
    /// Returns [`RestError::AuthenticationRequired`] without any network
    /// access when no token is set, otherwise the same errors as
    /// [`RestClient::request`].
    pub async fn auth_request(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<Value, RestError> {
        if !self.has_token() {
            return Err(RestError::authentication_required());
        }
        self.rest.auth_request(path, options).await
    }

    verbs! { request:
        /// Unauthenticated `GET`.
        get => GET;
        /// Unauthenticated `POST`.
        post => POST;
        /// Unauthenticated `PUT`.
        put => PUT;
        /// Unauthenticated `DELETE`.
        delete => DELETE;
    }

    verbs! { auth_request:
        /// Authenticated `GET`.
        auth_get => GET;
        /// Authenticated `POST`.
        auth_post => POST;
        /// Authenticated `PUT`.
        auth_put => PUT;
        /// Authenticated `DELETE`.
        auth_delete => DELETE;
    }
}
