//! Capability bundle handed to backend factories.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::try_join_all;
use lokapi_rest::{HttpTransport, PersistentStore};
use serde::{Deserialize, Serialize};

/// How a fan-out over backends or owners awaits its sub-operations.
///
/// Both modes issue sub-operations in manifest order and return results in
/// manifest order, never completion order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FanOutMode {
    /// Await all sub-operations concurrently.
    #[default]
    Parallel,
    /// Await each sub-operation before issuing the next.
    Sequential,
}

impl FanOutMode {
    /// Run `tasks` and concatenate their results in iteration order.
    ///
    /// # Errors
    ///
    /// Returns the first error; in parallel mode the remaining
    /// sub-operations are dropped.
    pub async fn gather<I, F, T, E>(self, tasks: I) -> Result<Vec<T>, E>
    where
        I: IntoIterator<Item = F>,
        F: Future<Output = Result<Vec<T>, E>>,
    {
        let batches = match self {
            FanOutMode::Parallel => try_join_all(tasks).await?,
            FanOutMode::Sequential => {
                let mut batches = Vec::new();
                for task in tasks {
                    batches.push(task.await?);
                }
                batches
            }
        };
        Ok(batches.into_iter().flatten().collect())
    }
}

/// Shared capabilities, passed by reference to every backend and owner
/// client so all of them use the same transport pool and store.
#[derive(Clone)]
pub struct Capabilities {
    pub transport: Arc<dyn HttpTransport>,
    pub store: Option<Arc<dyn PersistentStore>>,
    pub fan_out: FanOutMode,
}

impl Capabilities {
    #[must_use]
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            store: None,
            fan_out: FanOutMode::default(),
        }
    }

    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn PersistentStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn with_fan_out(mut self, fan_out: FanOutMode) -> Self {
        self.fan_out = fan_out;
        self
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("store", &self.store.is_some())
            .field("fan_out", &self.fan_out)
            .finish_non_exhaustive()
    }
}
