//! Odoo primary backend client.

use base64::{Engine as _, engine::general_purpose};
use http::header::AUTHORIZATION;
use http::{HeaderMap, HeaderValue, Method};
use lokapi_rest::{
    ExposeSecret, RequestOptions, RestClient, RestError, SecretString, SessionClient,
};
use lokapi_sdk::{BackendDescriptor, Capabilities, LokapiError};
use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::{Value, json};
use zeroize::Zeroizing;

use crate::contact::Contact;

/// API version this client speaks.
pub const API_VERSION: u32 = 12;

/// Session header used by the Odoo API.
pub const AUTH_HEADER: &str = "API-KEY";

/// Store key of the Odoo session token.
pub const TOKEN_KEY: &str = "lokapi:token:odoo";

const PUBLIC_PREFIX: &str = "/lokavaluto_api/public";
const PRIVATE_PREFIX: &str = "/lokavaluto_api/private";

/// Backend error text meaning the login/password pair was refused.
const ACCESS_DENIED: &str = "Access denied";

/// Body of a `POST /auth/authenticate` response.
#[derive(Debug, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error: Option<Value>,
    #[serde(default)]
    pub api_version: Option<u64>,
    #[serde(default)]
    pub uid: Option<i64>,
    #[serde(default)]
    pub api_token: Option<SecretString>,
    #[serde(default)]
    pub prefetch: Prefetch,
    /// Secondary backends, in manifest order
    #[serde(default)]
    pub backends: Vec<BackendDescriptor>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Prefetch {
    #[serde(default)]
    pub partner: Option<Value>,
}

/// Session metadata captured at login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionData {
    pub server_api_version: Option<u64>,
    pub login: String,
    pub uid: Option<i64>,
}

macro_rules! namespaced_verbs {
    ($dispatch:ident: $($(#[$meta:meta])* $name:ident => $method:ident;)+) => {
        $(
            $(#[$meta])*
            ///
            /// # Errors
            ///
            /// Same as the underlying dispatch method.
            pub async fn $name(
                &self,
                path: &str,
                data: Option<Value>,
                headers: Option<HeaderMap>,
            ) -> Result<Value, LokapiError> {
                self.$dispatch(
                    path,
                    RequestOptions {
                        method: Method::$method,
                        headers: headers.unwrap_or_default(),
                        data,
                    },
                )
                .await
            }
        )+
    };
}

/// Client of the Lokavaluto Odoo API.
///
/// Unauthenticated calls go to `/lokavaluto_api/public`, authenticated ones
/// to `/lokavaluto_api/private`; callers pass the path below the namespace.
/// A `401` from the server surfaces as `AuthenticationRequired` with the
/// original status and body.
pub struct OdooClient {
    session: SessionClient,
    db_name: String,
    api_version: u32,
    connection_data: RwLock<Option<ConnectionData>>,
    contact: RwLock<Option<Contact>>,
}

impl OdooClient {
    /// Build the client and restore a persisted session token, if any.
    ///
    /// # Errors
    ///
    /// Returns [`LokapiError::Rest`] if a persisted token is not a valid
    /// header value.
    pub fn new(
        host: &str,
        db_name: &str,
        api_version: u32,
        capabilities: &Capabilities,
    ) -> Result<Self, LokapiError> {
        let rest = RestClient::new(host, capabilities.transport.clone());
        let mut session = SessionClient::new(rest, AUTH_HEADER)?;
        if let Some(store) = &capabilities.store {
            session = session.with_store(store.clone(), TOKEN_KEY);
            session.restore_token(None)?;
        }

        Ok(Self {
            session,
            db_name: db_name.to_owned(),
            api_version,
            connection_data: RwLock::new(None),
            contact: RwLock::new(None),
        })
    }

    #[must_use]
    pub fn session(&self) -> &SessionClient {
        &self.session
    }

    #[must_use]
    pub fn connection_data(&self) -> Option<ConnectionData> {
        self.connection_data.read().clone()
    }

    /// Request under the public namespace.
    ///
    /// # Errors
    ///
    /// REST errors, with `401` translated to `AuthenticationRequired`.
    pub async fn request(&self, path: &str, options: RequestOptions) -> Result<Value, LokapiError> {
        self.session
            .request(&format!("{PUBLIC_PREFIX}{path}"), options)
            .await
            .map_err(translate_unauthorized)
    }

    /// Request under the private namespace, carrying the `API-KEY` header.
    ///
    /// # Errors
    ///
    /// `AuthenticationRequired` without network access when no token is set,
    /// otherwise the same errors as [`OdooClient::request`].
    pub async fn auth_request(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<Value, LokapiError> {
        self.session
            .auth_request(&format!("{PRIVATE_PREFIX}{path}"), options)
            .await
            .map_err(translate_unauthorized)
    }

    namespaced_verbs! { request:
        /// Public `GET`.
        get => GET;
        /// Public `POST`.
        post => POST;
        /// Public `PUT`.
        put => PUT;
        /// Public `DELETE`.
        delete => DELETE;
    }

    namespaced_verbs! { auth_request:
        /// Private `GET`.
        auth_get => GET;
        /// Private `POST`.
        auth_post => POST;
        /// Private `PUT`.
        auth_put => PUT;
        /// Private `DELETE`.
        auth_delete => DELETE;
    }

    /// Login handshake: obtain and store the session token.
    ///
    /// A server API version different from the client's is logged and
    /// otherwise ignored. Any failure clears the token.
    ///
    /// # Errors
    ///
    /// - [`LokapiError::InvalidCredentials`] when the server answers
    ///   `Access denied`
    /// - [`LokapiError::ApiRequestFailed`] for any other error status or a
    ///   missing token
    /// - REST errors
    pub async fn authenticate(
        &self,
        login: &str,
        password: &SecretString,
    ) -> Result<AuthResponse, LokapiError> {
        let result = self.try_authenticate(login, password).await;
        if let Err(err) = &result {
            tracing::warn!(
                host = %self.session.rest().connection().host(),
                login = %login,
                error = %err,
                "odoo authentication failed"
            );
            if let Err(clear_err) = self.session.set_token(None) {
                tracing::warn!(error = %clear_err, "failed to clear odoo session token");
            }
        }
        result
    }

    async fn try_authenticate(
        &self,
        login: &str,
        password: &SecretString,
    ) -> Result<AuthResponse, LokapiError> {
        let credentials = Zeroizing::new(format!("{login}:{}", password.expose_secret()));
        let encoded = Zeroizing::new(general_purpose::STANDARD.encode(credentials.as_bytes()));
        let header_value = Zeroizing::new(format!("Basic {}", &*encoded));
        let mut authorization = HeaderValue::try_from(header_value.as_str())
            .map_err(|_| RestError::InvalidHeader("authorization".to_owned()))?;
        authorization.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, authorization);

        let raw = self
            .post(
                "/auth/authenticate",
                Some(json!({
                    "api_version": self.api_version,
                    "db": self.db_name,
                    "params": ["lcc_app"],
                })),
                Some(headers),
            )
            .await?;
        let response: AuthResponse = serde_json::from_value(raw)
            .map_err(|e| LokapiError::InvalidResponse(format!("authenticate: {e}")))?;

        if response.status.as_deref() == Some("Error") {
            let error = match &response.error {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => String::new(),
            };
            return Err(if error == ACCESS_DENIED {
                LokapiError::InvalidCredentials(error)
            } else {
                LokapiError::ApiRequestFailed(format!("Could not obtain token: {error}"))
            });
        }

        if response.api_version != Some(u64::from(self.api_version)) {
            tracing::warn!(
                client_version = self.api_version,
                server_version = ?response.api_version,
                "API version mismatch between client and server"
            );
        }

        let token = response.api_token.as_ref().ok_or_else(|| {
            LokapiError::ApiRequestFailed("Could not obtain token: no api_token".to_owned())
        })?;
        self.session.set_token(Some(token.expose_secret()))?;
        Ok(response)
    }

    /// Authenticate and keep the session metadata and prefetched contact.
    ///
    /// # Errors
    ///
    /// Same as [`OdooClient::authenticate`].
    pub async fn login(
        &self,
        login: &str,
        password: &SecretString,
    ) -> Result<AuthResponse, LokapiError> {
        let auth = self.authenticate(login, password).await?;
        *self.connection_data.write() = Some(ConnectionData {
            server_api_version: auth.api_version,
            login: login.to_owned(),
            uid: auth.uid,
        });
        *self.contact.write() = auth.prefetch.partner.clone().map(Contact::from_partner);
        tracing::info!(
            host = %self.session.rest().connection().host(),
            login = %login,
            uid = ?auth.uid,
            "odoo login succeeded"
        );
        Ok(auth)
    }

    /// Current user's contact: the login prefetch, or `/partner/0`.
    ///
    /// # Errors
    ///
    /// Errors of [`OdooClient::auth_request`] when the contact is fetched.
    pub async fn get_my_contact(&self) -> Result<Contact, LokapiError> {
        let cached = self.contact.read().clone();
        if let Some(contact) = cached {
            return Ok(contact);
        }
        let contact = Contact::from_partner(self.auth_get("/partner/0", None, None).await?);
        *self.contact.write() = Some(contact.clone());
        Ok(contact)
    }

    /// # Errors
    ///
    /// Errors of [`OdooClient::auth_request`].
    pub async fn get_user_profile(&self, partner_id: i64) -> Result<Contact, LokapiError> {
        let raw = self
            .auth_get(&format!("/partner/{partner_id}"), None, None)
            .await?;
        Ok(Contact::from_partner(raw))
    }

    /// Forget token, session metadata and cached contact.
    ///
    /// # Errors
    ///
    /// Never fails in practice; kept fallible for symmetry with
    /// [`SessionClient::set_token`].
    pub fn logout(&self) -> Result<(), LokapiError> {
        self.session.set_token(None)?;
        *self.connection_data.write() = None;
        *self.contact.write() = None;
        Ok(())
    }
}

fn translate_unauthorized(err: RestError) -> LokapiError {
    let err = err.into_authentication_required();
    if err.is_authentication_required() && err.status().is_some() {
        tracing::warn!("odoo access denied: authentication required");
    }
    err.into()
}
