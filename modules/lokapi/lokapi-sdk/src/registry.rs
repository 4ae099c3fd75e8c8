//! Backend factory registry.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::api::BackendConnection;
use crate::capabilities::Capabilities;
use crate::error::LokapiError;
use crate::models::BackendDescriptor;

/// Builds a [`BackendConnection`] from a login manifest entry.
///
/// Construction performs no network access; per-owner clients are built on
/// first use.
pub trait BackendFactory: Send + Sync {
    /// Descriptor `type` this factory handles.
    fn kind(&self) -> &'static str;

    /// # Errors
    ///
    /// Returns [`LokapiError::InvalidDescriptor`] when the descriptor does
    /// not carry what the backend needs.
    fn create(
        &self,
        descriptor: &BackendDescriptor,
        capabilities: &Capabilities,
    ) -> Result<Arc<dyn BackendConnection>, LokapiError>;
}

/// Mapping from backend kind to factory.
///
/// Injected into the facade. Each kind may be registered once; resolving an
/// unknown kind fails with [`LokapiError::UnsupportedBackend`].
#[derive(Default)]
pub struct BackendRegistry {
    factories: RwLock<HashMap<&'static str, Arc<dyn BackendFactory>>>,
}

impl BackendRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    ///
    /// Returns [`LokapiError::DuplicateBackend`] if the kind is taken.
    pub fn register(&self, factory: Arc<dyn BackendFactory>) -> Result<(), LokapiError> {
        let kind = factory.kind();
        let mut factories = self.factories.write();
        if factories.contains_key(kind) {
            return Err(LokapiError::DuplicateBackend(kind.to_owned()));
        }
        factories.insert(kind, factory);
        tracing::debug!(kind, "backend factory registered");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`LokapiError::UnsupportedBackend`] for an unknown kind.
    pub fn resolve(&self, kind: &str) -> Result<Arc<dyn BackendFactory>, LokapiError> {
        self.factories
            .read()
            .get(kind)
            .cloned()
            .ok_or_else(|| LokapiError::UnsupportedBackend(kind.to_owned()))
    }

    /// Resolve the descriptor's kind and build the connection.
    ///
    /// # Errors
    ///
    /// Errors of [`BackendRegistry::resolve`] and [`BackendFactory::create`].
    pub fn create(
        &self,
        descriptor: &BackendDescriptor,
        capabilities: &Capabilities,
    ) -> Result<Arc<dyn BackendConnection>, LokapiError> {
        self.resolve(&descriptor.kind)?
            .create(descriptor, capabilities)
    }

    /// Registered kinds, sorted.
    #[must_use]
    pub fn kinds(&self) -> Vec<&'static str> {
        let mut kinds: Vec<_> = self.factories.read().keys().copied().collect();
        kinds.sort_unstable();
        kinds
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::models::{Account, InternalId, Payment, Recipient, Transaction};
    use async_trait::async_trait;
    use lokapi_rest::testing::MockTransport;
    use rust_decimal::Decimal;
    use serde_json::{Value, json};

    struct Dummy(InternalId);

    #[async_trait]
    impl BackendConnection for Dummy {
        fn kind(&self) -> &str {
            "dummy"
        }
        fn internal_id(&self) -> &InternalId {
            &self.0
        }
        async fn get_accounts(&self) -> Result<Vec<Account>, LokapiError> {
            Ok(Vec::new())
        }
        async fn get_transactions(&self) -> Result<Vec<Transaction>, LokapiError> {
            Ok(Vec::new())
        }
        fn cached_accounts(&self) -> Vec<Account> {
            Vec::new()
        }
        async fn transfer(
            &self,
            from: &Account,
            _recipient: &Recipient,
            _amount: Decimal,
            _description: &str,
        ) -> Result<Payment, LokapiError> {
            Err(LokapiError::UnknownAccount(from.internal_id.to_string()))
        }
        fn make_recipients(&self, _contact: &Value) -> Result<Vec<Recipient>, LokapiError> {
            Ok(Vec::new())
        }
        fn invalidate(&self) {}
    }

    struct DummyFactory;

    impl BackendFactory for DummyFactory {
        fn kind(&self) -> &'static str {
            "dummy"
        }
        fn create(
            &self,
            descriptor: &BackendDescriptor,
            _capabilities: &Capabilities,
        ) -> Result<Arc<dyn BackendConnection>, LokapiError> {
            let host = descriptor
                .credentials
                .get("host")
                .and_then(Value::as_str)
                .ok_or_else(|| LokapiError::InvalidDescriptor("missing host".to_owned()))?;
            Ok(Arc::new(Dummy(InternalId::backend("dummy", host))))
        }
    }

    fn capabilities() -> Capabilities {
        Capabilities::new(Arc::new(MockTransport::new()))
    }

    fn descriptor(value: Value) -> BackendDescriptor {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn register_and_create() {
        let registry = BackendRegistry::new();
        registry.register(Arc::new(DummyFactory)).unwrap();

        let descriptor = descriptor(json!({"type": "dummy", "host": "d.example.org"}));
        let conn = registry.create(&descriptor, &capabilities()).unwrap();
        assert_eq!(conn.internal_id().as_str(), "dummy:d.example.org");
        assert_eq!(registry.kinds(), vec!["dummy"]);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let registry = BackendRegistry::new();
        registry.register(Arc::new(DummyFactory)).unwrap();
        let err = registry.register(Arc::new(DummyFactory)).unwrap_err();
        assert!(matches!(err, LokapiError::DuplicateBackend(ref k) if k == "dummy"));
    }

    #[test]
    fn unknown_kind_fails_loudly() {
        let registry = BackendRegistry::new();
        let err = registry
            .create(&descriptor(json!({"type": "comchain"})), &capabilities())
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "unsupported backend kind: comchain");
    }

    #[test]
    fn factory_errors_propagate() {
        let registry = BackendRegistry::new();
        registry.register(Arc::new(DummyFactory)).unwrap();
        let err = registry
            .create(&descriptor(json!({"type": "dummy"})), &capabilities())
            .err()
            .unwrap();
        assert!(matches!(err, LokapiError::InvalidDescriptor(_)));
    }
}
