//! Registry entry for the `cyclos` backend kind.

use std::sync::Arc;

use lokapi_sdk::{
    BackendConnection, BackendDescriptor, BackendFactory, Capabilities, LokapiError,
};

use crate::config::CyclosCredentials;
use crate::domain::{CyclosBackend, KIND};

/// Builds [`CyclosBackend`]s from `cyclos` manifest entries.
#[derive(Debug, Default, Clone, Copy)]
pub struct CyclosBackendFactory;

impl BackendFactory for CyclosBackendFactory {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn create(
        &self,
        descriptor: &BackendDescriptor,
        capabilities: &Capabilities,
    ) -> Result<Arc<dyn BackendConnection>, LokapiError> {
        let credentials: CyclosCredentials = descriptor.credentials_as()?;
        let backend = CyclosBackend::new(credentials, capabilities.clone())?;
        tracing::info!(
            backend = %backend.internal_id(),
            "cyclos backend created"
        );
        Ok(Arc::new(backend))
    }
}
