//! Typed worker outcomes and their process exit-code encoding.
//!
//! A worker process reports exactly one outcome, encoded as its exit code:
//! `0` for success, values `>= 100` for the fixed failure enumeration. The
//! dispatcher decodes the exit status on reap; a worker killed by a signal
//! (rather than exiting) decodes to [`WorkerOutcome::Killed`].

use std::fmt;
use std::process::ExitStatus;

/// Outcome of one worker-function execution.
///
/// Discriminants are the wire values: stable, and `<= 255` so they survive
/// the platform exit-status truncation. Gaps in the numbering are historical
/// and codes are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum WorkerOutcome {
    /// The worker function completed its side effect.
    Success = 0,
    /// The worker could not establish its own store connection.
    StoreConnect = 103,
    /// A store query failed inside the worker.
    StoreQuery = 105,
    /// A subprocess could not be spawned or awaited.
    SpawnFailed = 107,
    /// The transport stdin pipe could not be created or bound.
    PipeCreate = 108,
    /// Writing into the transport pipe failed.
    PipeWrite = 109,
    /// The CPU-seconds ceiling was exceeded (SIGXCPU).
    CpuExceeded = 110,
    /// The memory ceiling was exceeded or memory was accessed invalidly.
    MemoryExceeded = 111,
    /// The file-size ceiling was exceeded (SIGXFSZ).
    FileSizeExceeded = 112,
    /// Floating-point fault (SIGFPE).
    FloatingPointFault = 113,
    /// Illegal instruction (SIGILL).
    IllegalInstruction = 114,
    /// Misaligned or unreachable memory access (SIGBUS).
    BusFault = 115,
    /// The worker was killed by a signal it never handled.
    Killed = 116,
    /// The outbound message could not be assembled for delivery.
    MessageBuild = 117,
    /// A required message header was missing or empty.
    HeaderMissing = 118,
    /// Sandbox entry failed; no task code was run.
    SandboxSetup = 120,
    /// The transport subprocess reported a non-zero exit.
    TransportExec = 121,
    /// Any exit code outside the enumeration.
    Unknown = 127,
}

impl WorkerOutcome {
    /// Exit code a worker process uses to report this outcome.
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        self as i32
    }

    /// True only for [`Self::Success`].
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }

    /// Decode an exit code; anything outside the enumeration is `Unknown`.
    #[must_use]
    pub const fn from_exit_code(code: i32) -> Self {
        match code {
            0 => Self::Success,
            103 => Self::StoreConnect,
            105 => Self::StoreQuery,
            107 => Self::SpawnFailed,
            108 => Self::PipeCreate,
            109 => Self::PipeWrite,
            110 => Self::CpuExceeded,
            111 => Self::MemoryExceeded,
            112 => Self::FileSizeExceeded,
            113 => Self::FloatingPointFault,
            114 => Self::IllegalInstruction,
            115 => Self::BusFault,
            116 => Self::Killed,
            117 => Self::MessageBuild,
            118 => Self::HeaderMissing,
            120 => Self::SandboxSetup,
            121 => Self::TransportExec,
            _ => Self::Unknown,
        }
    }

    /// Decode a reaped exit status.
    ///
    /// A normal exit carries its typed code; termination by signal is the
    /// fixed `Killed` outcome regardless of which signal did it.
    #[must_use]
    pub fn from_exit_status(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return Self::from_exit_code(code);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if status.signal().is_some() {
                return Self::Killed;
            }
        }
        Self::Unknown
    }
}

impl fmt::Display for WorkerOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::Success => "success",
            Self::StoreConnect => "store connection failed",
            Self::StoreQuery => "store query failed",
            Self::SpawnFailed => "subprocess spawn or wait failed",
            Self::PipeCreate => "pipe creation failed",
            Self::PipeWrite => "pipe write failed",
            Self::CpuExceeded => "CPU-time ceiling exceeded",
            Self::MemoryExceeded => "memory ceiling exceeded",
            Self::FileSizeExceeded => "file-size ceiling exceeded",
            Self::FloatingPointFault => "floating-point fault",
            Self::IllegalInstruction => "illegal instruction",
            Self::BusFault => "bus fault",
            Self::Killed => "killed by signal",
            Self::MessageBuild => "outbound message assembly failed",
            Self::HeaderMissing => "required message header missing",
            Self::SandboxSetup => "sandbox setup failed",
            Self::TransportExec => "transport exited non-zero",
            Self::Unknown => "unknown failure",
        };
        f.write_str(msg)
    }
}
