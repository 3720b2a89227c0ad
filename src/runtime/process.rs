//! OS-process launcher: one worker process per claimed entry.
//!
//! The boss re-invokes its own binary with a `worker` subcommand and the
//! claimed entry serialized onto the command line. The child shares nothing
//! with the boss beyond the binary image and that payload: it opens its own
//! connections and walls itself in before touching the work.

use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

use crate::core::{QueueEntry, SchedulerError, WorkerHandle, WorkerLauncher, WorkerOutcome};

/// Subcommand that switches a daemon binary into worker mode.
pub const WORKER_MODE_ARG: &str = "worker";

/// Flag carrying the claimed entry into the worker.
pub const ENTRY_FLAG: &str = "--entry";

/// Encode the worker-mode argument vector for `entry`.
///
/// # Errors
///
/// Entry serialization failures.
pub fn worker_args(entry: &QueueEntry) -> Result<[String; 3], SchedulerError> {
    let payload = serde_json::to_string(entry)
        .map_err(|e| SchedulerError::Spawn(format!("encoding entry: {e}")))?;
    Ok([WORKER_MODE_ARG.into(), ENTRY_FLAG.into(), payload])
}

/// Recognize a worker-mode invocation and decode its entry.
///
/// `argv` is the full argument vector, program name included. `Ok(None)`
/// means a plain daemon start.
///
/// # Errors
///
/// A worker invocation whose payload is missing or does not decode. The
/// caller must exit rather than fall back to daemon mode.
pub fn parse_worker_invocation(argv: &[String]) -> Result<Option<QueueEntry>, SchedulerError> {
    if argv.get(1).map(String::as_str) != Some(WORKER_MODE_ARG) {
        return Ok(None);
    }
    let payload = match (argv.get(2).map(String::as_str), argv.get(3)) {
        (Some(ENTRY_FLAG), Some(payload)) => payload,
        _ => {
            return Err(SchedulerError::Spawn(
                "worker invocation is missing the --entry payload".into(),
            ))
        }
    };
    let entry = serde_json::from_str(payload)
        .map_err(|e| SchedulerError::Spawn(format!("decoding entry: {e}")))?;
    Ok(Some(entry))
}

/// Launches workers by invoking a binary in worker mode.
pub struct ProcessLauncher {
    program: PathBuf,
}

impl ProcessLauncher {
    /// Launch workers through the given binary.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Launch workers by re-invoking the current executable, the normal
    /// arrangement for the daemons.
    ///
    /// # Errors
    ///
    /// When the current executable path cannot be resolved.
    pub fn current_exe() -> Result<Self, SchedulerError> {
        let program = std::env::current_exe()
            .map_err(|e| SchedulerError::Spawn(format!("resolving current executable: {e}")))?;
        Ok(Self { program })
    }
}

impl WorkerLauncher for ProcessLauncher {
    type Handle = ProcessHandle;

    fn launch(&mut self, entry: &QueueEntry) -> Result<ProcessHandle, SchedulerError> {
        let args = worker_args(entry)?;
        let child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .spawn()
            .map_err(|e| SchedulerError::Spawn(format!("spawning worker: {e}")))?;
        Ok(ProcessHandle { child })
    }
}

/// Handle to a spawned worker process.
pub struct ProcessHandle {
    child: Child,
}

impl WorkerHandle for ProcessHandle {
    fn poll_exit(&mut self) -> Result<Option<WorkerOutcome>, SchedulerError> {
        match self.child.try_wait() {
            Ok(Some(status)) => Ok(Some(WorkerOutcome::from_exit_status(status))),
            Ok(None) => Ok(None),
            Err(e) => Err(SchedulerError::Spawn(format!("probing worker: {e}"))),
        }
    }

    fn pid(&self) -> Option<u32> {
        Some(self.child.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{QueueState, WorkType, TRACK_NORMAL};

    fn entry() -> QueueEntry {
        QueueEntry {
            id: 11,
            work_item_id: 7,
            work_type: WorkType::OutboundDelivery,
            state: QueueState::Processing,
            owner_id: 3,
            group_id: 2,
            track: TRACK_NORMAL,
        }
    }

    #[test]
    fn worker_argv_round_trips() {
        let args = worker_args(&entry()).unwrap();
        let mut argv = vec!["deliveryd".to_owned()];
        argv.extend(args);

        let decoded = parse_worker_invocation(&argv).unwrap().unwrap();
        assert_eq!(decoded, entry());
    }

    #[test]
    fn plain_start_is_not_worker_mode() {
        assert!(parse_worker_invocation(&["deliveryd".to_owned()])
            .unwrap()
            .is_none());
        assert!(
            parse_worker_invocation(&["deliveryd".to_owned(), "--help".to_owned()])
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn mangled_payload_is_rejected() {
        let argv = vec![
            "deliveryd".to_owned(),
            WORKER_MODE_ARG.to_owned(),
            ENTRY_FLAG.to_owned(),
            "{not json".to_owned(),
        ];
        assert!(parse_worker_invocation(&argv).is_err());

        let argv = vec!["deliveryd".to_owned(), WORKER_MODE_ARG.to_owned()];
        assert!(parse_worker_invocation(&argv).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn launch_and_reap_a_real_process() {
        use std::time::Duration;

        let mut launcher = ProcessLauncher::new("true");
        let mut handle = launcher.launch(&entry()).unwrap();
        assert!(handle.pid().is_some());

        let outcome = loop {
            if let Some(outcome) = handle.poll_exit().unwrap() {
                break outcome;
            }
            std::thread::sleep(Duration::from_millis(5));
        };
        assert_eq!(outcome, WorkerOutcome::Success);
    }

    #[cfg(unix)]
    #[test]
    fn unrecognized_exit_code_decodes_to_unknown() {
        use std::time::Duration;

        let mut launcher = ProcessLauncher::new("false");
        let mut handle = launcher.launch(&entry()).unwrap();

        let outcome = loop {
            if let Some(outcome) = handle.poll_exit().unwrap() {
                break outcome;
            }
            std::thread::sleep(Duration::from_millis(5));
        };
        assert_eq!(outcome, WorkerOutcome::Unknown);
    }

    #[test]
    fn missing_binary_is_a_spawn_error() {
        let mut launcher = ProcessLauncher::new("/nonexistent/piecework-worker");
        assert!(matches!(
            launcher.launch(&entry()),
            Err(SchedulerError::Spawn(_))
        ));
    }
}
