//! Aggregation facade over the Odoo primary backend and its secondary
//! backends.

use std::sync::Arc;

use lokapi_rest::{HyperTransport, MemoryStore, RestError, SecretString};
use lokapi_sdk::{
    Account, BackendConnection, BackendRegistry, Capabilities, LokapiError, Payment, Recipient,
    Transaction,
};
use parking_lot::RwLock;
use rust_decimal::Decimal;

use crate::config::LokApiConfig;
use crate::contact::Contact;
use crate::odoo::{ConnectionData, OdooClient};

type Backends = Arc<[Arc<dyn BackendConnection>]>;

/// Top-level client.
///
/// `login` authenticates against Odoo and builds one connection per backend
/// descriptor it returns, in manifest order. Aggregated operations fan out
/// over those connections and concatenate the results in the same order.
pub struct LokApi {
    odoo: OdooClient,
    capabilities: Capabilities,
    registry: Arc<BackendRegistry>,
    backends: RwLock<Option<Backends>>,
}

impl LokApi {
    /// # Errors
    ///
    /// Errors of [`OdooClient::new`].
    pub fn new(
        config: &LokApiConfig,
        capabilities: Capabilities,
        registry: Arc<BackendRegistry>,
    ) -> Result<Self, LokapiError> {
        let odoo = OdooClient::new(
            &config.host,
            &config.db_name,
            config.api_version,
            &capabilities,
        )?;
        Ok(Self {
            odoo,
            capabilities,
            registry,
            backends: RwLock::new(None),
        })
    }

    /// Client with the default capabilities: hyper transport, in-memory
    /// token store, the configured fan-out mode and the default registry.
    ///
    /// # Errors
    ///
    /// Fails when the TLS transport cannot be initialized.
    pub fn from_config(config: &LokApiConfig) -> Result<Self, LokapiError> {
        let transport = HyperTransport::new(&config.transport).map_err(RestError::from)?;
        let capabilities = Capabilities::new(Arc::new(transport))
            .with_store(Arc::new(MemoryStore::new()))
            .with_fan_out(config.fan_out);
        Self::new(config, capabilities, Arc::new(crate::default_registry()?))
    }

    #[must_use]
    pub fn odoo(&self) -> &OdooClient {
        &self.odoo
    }

    #[must_use]
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.backends.read().is_some()
    }

    #[must_use]
    pub fn connection_data(&self) -> Option<ConnectionData> {
        self.odoo.connection_data()
    }

    /// Authenticate and build every backend connection.
    ///
    /// Backends are only installed when all of them could be built; on any
    /// failure the client ends up logged out.
    ///
    /// # Errors
    ///
    /// Errors of [`OdooClient::login`] and of [`BackendRegistry::create`]
    /// (for instance [`LokapiError::UnsupportedBackend`]).
    pub async fn login(&self, login: &str, password: &SecretString) -> Result<(), LokapiError> {
        *self.backends.write() = None;

        match self.try_login(login, password).await {
            Ok(backends) => {
                tracing::info!(
                    login = %login,
                    backends = backends.len(),
                    "lokapi login completed"
                );
                *self.backends.write() = Some(backends);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(login = %login, error = %err, "lokapi login failed");
                if let Err(logout_err) = self.odoo.logout() {
                    tracing::warn!(error = %logout_err, "odoo logout after failed login failed");
                }
                Err(err)
            }
        }
    }

    async fn try_login(
        &self,
        login: &str,
        password: &SecretString,
    ) -> Result<Backends, LokapiError> {
        let auth = self.odoo.login(login, password).await?;
        let backends = auth
            .backends
            .iter()
            .map(|descriptor| self.registry.create(descriptor, &self.capabilities))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(backends.into())
    }

    /// Connections built at login, in manifest order.
    ///
    /// # Errors
    ///
    /// Returns [`LokapiError::NotLoggedIn`] before a successful login.
    pub fn backends(&self) -> Result<Backends, LokapiError> {
        self.backends
            .read()
            .as_ref()
            .map(Arc::clone)
            .ok_or(LokapiError::NotLoggedIn)
    }

    /// Accounts of every backend, flattened in manifest order.
    ///
    /// # Errors
    ///
    /// [`LokapiError::NotLoggedIn`], or the first backend failure.
    pub async fn get_accounts(&self) -> Result<Vec<Account>, LokapiError> {
        let backends = self.backends()?;
        self.capabilities
            .fan_out
            .gather(
                backends
                    .iter()
                    .cloned()
                    .map(|backend| async move { backend.get_accounts().await })
                    .collect::<Vec<_>>(),
            )
            .await
    }

    /// Accounts of the first backend only.
    ///
    /// # Errors
    ///
    /// [`LokapiError::NotLoggedIn`], or the backend failure.
    pub async fn get_primary_accounts(&self) -> Result<Vec<Account>, LokapiError> {
        let backends = self.backends()?;
        match backends.first() {
            Some(backend) => backend.get_accounts().await,
            None => Ok(Vec::new()),
        }
    }

    /// Transactions of every backend, flattened in manifest order.
    ///
    /// # Errors
    ///
    /// [`LokapiError::NotLoggedIn`], or the first backend failure.
    pub async fn get_transactions(&self) -> Result<Vec<Transaction>, LokapiError> {
        let backends = self.backends()?;
        self.capabilities
            .fan_out
            .gather(
                backends
                    .iter()
                    .cloned()
                    .map(|backend| async move { backend.get_transactions().await })
                    .collect::<Vec<_>>(),
            )
            .await
    }

    /// Accounts from the last `get_accounts` of each backend, no request.
    #[must_use]
    pub fn cached_accounts(&self) -> Vec<Account> {
        let Some(backends) = self.backends.read().clone() else {
            return Vec::new();
        };
        backends
            .iter()
            .flat_map(|backend| backend.cached_accounts())
            .collect()
    }

    /// Pay from `from` through the backend holding it.
    ///
    /// # Errors
    ///
    /// - [`LokapiError::NotLoggedIn`]
    /// - [`LokapiError::UnknownAccount`] when no backend holds `from`
    /// - errors of [`BackendConnection::transfer`]
    pub async fn transfer(
        &self,
        from: &Account,
        recipient: &Recipient,
        amount: Decimal,
        description: &str,
    ) -> Result<Payment, LokapiError> {
        let backends = self.backends()?;
        let backend = backends
            .iter()
            .find(|backend| from.internal_id.is_within(backend.internal_id()))
            .ok_or_else(|| LokapiError::UnknownAccount(from.internal_id.to_string()))?;
        tracing::debug!(
            backend = %backend.internal_id(),
            from = %from.internal_id,
            recipient = %recipient.internal_id,
            "routing transfer"
        );
        backend.transfer(from, recipient, amount, description).await
    }

    /// Recipients for `contact` on every backend, in manifest order.
    ///
    /// # Errors
    ///
    /// [`LokapiError::NotLoggedIn`], or the first malformed backend entry.
    pub fn make_recipients(&self, contact: &Contact) -> Result<Vec<Recipient>, LokapiError> {
        let mut recipients = Vec::new();
        for backend in self.backends()?.iter() {
            recipients.extend(backend.make_recipients(&contact.raw)?);
        }
        Ok(recipients)
    }

    /// # Errors
    ///
    /// Errors of [`OdooClient::get_my_contact`].
    pub async fn get_my_contact(&self) -> Result<Contact, LokapiError> {
        self.odoo.get_my_contact().await
    }

    /// # Errors
    ///
    /// Errors of [`OdooClient::get_user_profile`].
    pub async fn get_user_profile(&self, partner_id: i64) -> Result<Contact, LokapiError> {
        self.odoo.get_user_profile(partner_id).await
    }

    /// Drop cached accounts of every backend.
    pub fn invalidate(&self) {
        if let Some(backends) = self.backends.read().as_ref() {
            for backend in backends.iter() {
                backend.invalidate();
            }
        }
    }

    /// Forget the Odoo session and every backend connection, including the
    /// session tokens they persisted.
    ///
    /// # Errors
    ///
    /// Errors of [`BackendConnection::logout`] and [`OdooClient::logout`].
    pub fn logout(&self) -> Result<(), LokapiError> {
        let backends = self.backends.write().take();
        if let Some(backends) = backends {
            for backend in backends.iter() {
                backend.logout()?;
            }
        }
        self.odoo.logout()?;
        tracing::info!("lokapi logout");
        Ok(())
    }
}
