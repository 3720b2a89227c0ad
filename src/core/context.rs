//! Per-process wiring: configuration plus this process's own connections.
//!
//! Connections are opened by each process for itself. A worker never reuses
//! a handle inherited from the boss across the spawn boundary; it builds a
//! fresh context right after it starts, and the context dies with the
//! process.

use crate::config::{DaemonConfig, StoreBackendConfig};
use crate::core::SchedulerError;
use crate::infra::{
    InMemorySource, InMemoryStore, PostgresSource, PostgresStore, QueueStore, WorkItemSource,
};

/// Everything one process owns for itself.
pub struct ProcessContext {
    /// The configuration this process started with.
    pub config: DaemonConfig,
    /// This process's own queue store connection.
    pub store: Box<dyn QueueStore>,
    /// This process's own payload source connection.
    pub source: Box<dyn WorkItemSource>,
}

impl ProcessContext {
    /// Open this process's own store and source per `config`.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::StoreConnect`] when the configured backend cannot
    /// be opened. A worker that hits this exits with the matching code
    /// before any task logic runs.
    pub fn open(config: DaemonConfig) -> Result<Self, SchedulerError> {
        let (store, source): (Box<dyn QueueStore>, Box<dyn WorkItemSource>) = match &config.store {
            StoreBackendConfig::Memory => (
                Box::new(InMemoryStore::new()),
                Box::new(InMemorySource::new()),
            ),
            StoreBackendConfig::Postgres { url } => (
                Box::new(PostgresStore::new(url.clone())),
                Box::new(PostgresSource::new(url.clone())),
            ),
        };
        Ok(Self {
            config,
            store,
            source,
        })
    }
}
