//! Worker-side execution contract.
//!
//! A worker process is handed exactly one claimed entry. It opens its own
//! store connection, walls itself in with [`crate::sandbox::enter`], runs
//! the work function, and exits with a typed code. Nothing about the run
//! flows back to the boss except that exit code.

use tracing::error;

use crate::core::{QueueEntry, WorkerOutcome};
use crate::sandbox::{self, SandboxProfile, TaskClass};

/// One kind of work a daemon's workers perform.
pub trait WorkerFunction {
    /// The class whose resource ceilings this work runs under.
    fn task_class(&self) -> TaskClass;

    /// Do the work for one claimed entry.
    ///
    /// Called inside the sandbox, so resource faults surface as signals and
    /// terminate the process with their own codes; they never return through
    /// here. All other failures are encoded in the returned outcome.
    fn execute(&self, entry: &QueueEntry) -> WorkerOutcome;
}

/// Run one entry under this worker's sandbox and report the exit outcome.
///
/// The sandbox is entered after the process owns its external connections
/// but before any work logic. A sandbox that cannot be entered means the
/// work must not run at all.
pub fn execute_in_sandbox<W: WorkerFunction>(worker: &W, entry: &QueueEntry) -> WorkerOutcome {
    let profile = SandboxProfile::for_class(worker.task_class());
    if let Err(err) = sandbox::enter(&profile) {
        error!(entry_id = entry.id, %err, "sandbox entry failed; work will not run");
        return WorkerOutcome::SandboxSetup;
    }
    worker.execute(entry)
}
