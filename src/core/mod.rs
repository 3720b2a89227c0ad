//! Core scheduling abstractions: queue model, dispatch loop, worker contract.

pub mod context;
pub mod dispatcher;
pub mod entry;
pub mod error;
pub mod outcome;
pub mod worker;

pub use context::ProcessContext;
pub use dispatcher::{DispatchStats, Dispatcher, WorkerHandle, WorkerLauncher};
pub use entry::{NewQueueEntry, QueueEntry, QueueState, WorkType, TRACK_NORMAL};
pub use error::{AppResult, SchedulerError};
pub use outcome::WorkerOutcome;
pub use worker::{execute_in_sandbox, WorkerFunction};
