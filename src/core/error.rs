//! Error types for scheduler operations.

use thiserror::Error;

use crate::core::outcome::WorkerOutcome;

/// Errors produced by scheduler components.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// A store connection could not be established.
    #[error("store connect: {0}")]
    StoreConnect(String),
    /// A store query or conditional update failed.
    #[error("store query: {0}")]
    StoreQuery(String),
    /// Backend-specific failure with context.
    #[error("backend error: {0}")]
    Backend(String),
    /// A worker process could not be spawned.
    #[error("worker spawn: {0}")]
    Spawn(String),
    /// Sandbox entry failed in the calling process.
    #[error("sandbox setup: {0}")]
    Sandbox(String),
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SchedulerError {
    /// The typed exit outcome a worker process reports when this error is
    /// what stopped it.
    #[must_use]
    pub const fn worker_outcome(&self) -> WorkerOutcome {
        match self {
            Self::StoreConnect(_) => WorkerOutcome::StoreConnect,
            Self::StoreQuery(_) | Self::Backend(_) => WorkerOutcome::StoreQuery,
            Self::Spawn(_) => WorkerOutcome::SpawnFailed,
            Self::Sandbox(_) => WorkerOutcome::SandboxSetup,
            Self::InvalidConfig(_) => WorkerOutcome::Unknown,
        }
    }
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_store_outcomes() {
        let connect = SchedulerError::StoreConnect("refused".into());
        assert_eq!(connect.worker_outcome(), WorkerOutcome::StoreConnect);

        let query = SchedulerError::StoreQuery("syntax".into());
        assert_eq!(query.worker_outcome(), WorkerOutcome::StoreQuery);

        let sandbox = SchedulerError::Sandbox("rlimit".into());
        assert_eq!(sandbox.worker_outcome(), WorkerOutcome::SandboxSetup);
    }
}

