//! Outbound delivery through a transport subprocess.
//!
//! A delivery worker loads the stored message, assembles the complete wire
//! bytes, and only then spawns the transport. The transport reads the
//! message from stdin; recipients come from the message headers themselves.
//! Closing stdin is the handoff, and a clean transport exit means the
//! message now belongs to the mail system.

use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use thiserror::Error;
use tracing::error;

use crate::config::TransportConfig;
use crate::core::{QueueEntry, SchedulerError, WorkerFunction, WorkerOutcome};
use crate::infra::{MessageError, WorkItemSource};
use crate::sandbox::TaskClass;

/// A delivery attempt that did not hand the message to the transport.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The queue entry references a message the source does not have.
    #[error("no outbound message for work item {0}")]
    MessageMissing(i64),
    /// The stored message cannot be assembled into wire bytes.
    #[error(transparent)]
    Message(#[from] MessageError),
    /// Loading the message from the source failed.
    #[error("loading message: {0}")]
    Source(#[from] SchedulerError),
    /// The transport process could not be spawned.
    #[error("spawning transport: {0}")]
    Spawn(std::io::Error),
    /// The transport came up without a writable stdin.
    #[error("transport has no stdin pipe")]
    PipeCreate,
    /// Writing the message into the transport failed.
    #[error("writing to transport: {0}")]
    PipeWrite(std::io::Error),
    /// Waiting for the transport failed.
    #[error("waiting for transport: {0}")]
    Wait(std::io::Error),
    /// The transport exited with a failure status.
    #[error("transport exited with status {0}")]
    TransportStatus(i32),
}

impl DeliveryError {
    /// The exit code a worker reports for this failure.
    #[must_use]
    pub const fn worker_outcome(&self) -> WorkerOutcome {
        match self {
            Self::MessageMissing(_) => WorkerOutcome::MessageBuild,
            Self::Message(err) => err.worker_outcome(),
            Self::Source(err) => err.worker_outcome(),
            Self::Spawn(_) | Self::Wait(_) => WorkerOutcome::SpawnFailed,
            Self::PipeCreate => WorkerOutcome::PipeCreate,
            Self::PipeWrite(_) => WorkerOutcome::PipeWrite,
            Self::TransportStatus(_) => WorkerOutcome::TransportExec,
        }
    }
}

/// The transport subprocess a delivery worker feeds.
#[derive(Debug, Clone)]
pub struct MailTransport {
    program: PathBuf,
    args: Vec<OsString>,
}

impl MailTransport {
    /// Sendmail-compatible invocation: recipients from the message headers
    /// (`-t`), lone dots are not terminators (`-i`), ordinary mail
    /// submission (`-bm`), envelope sender set to `return_address` (`-r`).
    pub fn sendmail(program: impl Into<PathBuf>, return_address: &str) -> Self {
        Self {
            program: program.into(),
            args: vec![
                "-t".into(),
                "-i".into(),
                "-bm".into(),
                "-r".into(),
                return_address.into(),
            ],
        }
    }

    /// The sendmail invocation described by `config`.
    #[must_use]
    pub fn from_config(config: &TransportConfig) -> Self {
        Self::sendmail(&config.program, &config.return_address)
    }

    /// An arbitrary program with explicit arguments. Tests substitute
    /// shell utilities for the real mailer through this.
    pub fn custom(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// The transport binary.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// The argument vector handed to the transport.
    #[must_use]
    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    /// Feed `wire` to one transport process and wait for it to finish.
    ///
    /// # Errors
    ///
    /// Spawn, pipe, wait, and transport-status failures, each carrying its
    /// own worker outcome.
    pub fn deliver(&self, wire: &[u8]) -> Result<(), DeliveryError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(DeliveryError::Spawn)?;

        let Some(mut stdin) = child.stdin.take() else {
            return Err(DeliveryError::PipeCreate);
        };
        if let Err(err) = stdin.write_all(wire) {
            // The transport may already be dead; reap it before reporting.
            drop(stdin);
            let _ = child.wait();
            return Err(DeliveryError::PipeWrite(err));
        }
        // EOF on stdin is the handoff.
        drop(stdin);

        let status = child.wait().map_err(DeliveryError::Wait)?;
        if !status.success() {
            return Err(DeliveryError::TransportStatus(status.code().unwrap_or(-1)));
        }
        Ok(())
    }
}

/// Worker function for the outbound delivery work type.
pub struct DeliveryWorker<Src> {
    source: Src,
    transport: MailTransport,
}

impl<Src: WorkItemSource> DeliveryWorker<Src> {
    /// Build a delivery worker over this process's own source connection.
    pub const fn new(source: Src, transport: MailTransport) -> Self {
        Self { source, transport }
    }

    fn deliver(&self, entry: &QueueEntry) -> Result<(), DeliveryError> {
        let message = self
            .source
            .outbound_message(entry.work_item_id)?
            .ok_or(DeliveryError::MessageMissing(entry.work_item_id))?;
        let wire = message.to_wire()?;
        self.transport.deliver(wire.as_bytes())
    }
}

impl<Src: WorkItemSource> WorkerFunction for DeliveryWorker<Src> {
    fn task_class(&self) -> TaskClass {
        TaskClass::Delivery
    }

    fn execute(&self, entry: &QueueEntry) -> WorkerOutcome {
        match self.deliver(entry) {
            Ok(()) => WorkerOutcome::Success,
            Err(err) => {
                error!(
                    entry_id = entry.id,
                    work_item_id = entry.work_item_id,
                    %err,
                    "delivery failed"
                );
                err.worker_outcome()
            }
        }
    }
}
