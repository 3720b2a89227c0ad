//! Resource sandbox: OS-enforced ceilings and fault-signal mapping.
//!
//! A worker process calls [`enter`] on itself before running any task code.
//! Entry installs handlers for the recognized fault signals (each handler
//! exits immediately with the matching typed code), then applies the six
//! resource ceilings of the task class's [`SandboxProfile`]. From that point
//! a runaway task terminates with a deterministic [`WorkerOutcome`] the
//! dispatcher can tell apart from an ordinary crash.
//!
//! Privilege-dropping deployments additionally call [`drop_privileges`] at
//! daemon startup: confine the filesystem root and switch to an unprivileged
//! user/group. That step failing aborts the whole program rather than
//! running unconfined.
//!
//! Limits are fixed per task class, not per job. Rule execution gets the
//! tight profile (no child processes, no file writes); delivery gets room
//! for the transport subprocess tree.

#[cfg(unix)]
mod unix;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(unix)]
pub use unix::fault_signal_outcome;

/// Task classes with distinct resource profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskClass {
    /// Untrusted group rule scripts.
    RuleExecution,
    /// Outbound delivery through a transport subprocess.
    Delivery,
}

/// OS resources the sandbox puts a ceiling on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// CPU seconds consumed by the process.
    CpuSeconds,
    /// Total address-space size in bytes.
    AddressSpace,
    /// Largest file the process may create, in bytes.
    FileSize,
    /// Number of open file descriptors.
    OpenFiles,
    /// Number of processes the worker may create.
    Processes,
    /// Core-dump size in bytes.
    CoreSize,
}

/// One resolved ceiling: the resource plus its soft and hard values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ceiling {
    /// Which resource this bounds.
    pub resource: ResourceKind,
    /// Soft limit; the signal-raising threshold.
    pub soft: u64,
    /// Hard limit; the kernel's kill threshold.
    pub hard: u64,
}

/// Static resource ceilings for one task class. Never mutated at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SandboxProfile {
    /// CPU seconds before SIGXCPU.
    pub cpu_seconds: u64,
    /// Address-space ceiling in bytes.
    pub memory_bytes: u64,
    /// Maximum created-file size in bytes.
    pub file_size_bytes: u64,
    /// Maximum open file descriptors.
    pub open_files: u64,
    /// Maximum processes the worker may spawn.
    pub processes: u64,
    /// Maximum core-dump size in bytes.
    pub core_bytes: u64,
}

impl SandboxProfile {
    /// Profile for rule execution: 1 CPU second, 64 MiB, no file writes,
    /// six descriptors, no child processes, no core dumps.
    pub const RULE_EXECUTION: Self = Self {
        cpu_seconds: 1,
        memory_bytes: 67_108_864,
        file_size_bytes: 0,
        open_files: 6,
        processes: 0,
        core_bytes: 0,
    };

    /// Profile for delivery: same CPU and memory budget, but room for the
    /// transport subprocess tree and its spool writes. The process ceiling
    /// is counted per user, so it scales with the delivery pool size.
    pub const DELIVERY: Self = Self {
        cpu_seconds: 1,
        memory_bytes: 67_108_864,
        file_size_bytes: 10_000_000,
        open_files: 50,
        processes: (4 * crate::config::DELIVERY_SLOTS) as u64,
        core_bytes: 0,
    };

    /// The fixed profile for a task class.
    #[must_use]
    pub const fn for_class(class: TaskClass) -> Self {
        match class {
            TaskClass::RuleExecution => Self::RULE_EXECUTION,
            TaskClass::Delivery => Self::DELIVERY,
        }
    }

    /// The six ceilings in application order.
    ///
    /// The CPU hard limit sits one second above the soft limit so the
    /// process receives SIGXCPU (mapped to a typed outcome) before the
    /// kernel escalates to SIGKILL. Every other ceiling is exact.
    #[must_use]
    pub const fn ceilings(&self) -> [Ceiling; 6] {
        [
            Ceiling {
                resource: ResourceKind::CpuSeconds,
                soft: self.cpu_seconds,
                hard: self.cpu_seconds + 1,
            },
            Ceiling {
                resource: ResourceKind::AddressSpace,
                soft: self.memory_bytes,
                hard: self.memory_bytes,
            },
            Ceiling {
                resource: ResourceKind::FileSize,
                soft: self.file_size_bytes,
                hard: self.file_size_bytes,
            },
            Ceiling {
                resource: ResourceKind::OpenFiles,
                soft: self.open_files,
                hard: self.open_files,
            },
            Ceiling {
                resource: ResourceKind::Processes,
                soft: self.processes,
                hard: self.processes,
            },
            Ceiling {
                resource: ResourceKind::CoreSize,
                soft: self.core_bytes,
                hard: self.core_bytes,
            },
        ]
    }
}

/// Filesystem/user confinement applied at daemon startup in privileged
/// deployments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivilegeDrop {
    /// Directory that becomes the process's filesystem root.
    pub jail_dir: PathBuf,
    /// Unprivileged user to switch to (group follows the user's).
    pub run_as: String,
}

/// Failures while entering the sandbox or dropping privileges.
#[derive(Debug, Error)]
pub enum SandboxError {
    /// A fault-signal handler could not be installed.
    #[error("installing handler for signal {signal}: {source}")]
    Handler {
        /// Signal number the installation failed for.
        signal: i32,
        /// Underlying OS error.
        source: std::io::Error,
    },
    /// A resource ceiling could not be applied.
    #[error("applying {resource:?} ceiling: {source}")]
    Ceiling {
        /// Resource whose limit was rejected.
        resource: ResourceKind,
        /// Underlying OS error.
        source: std::io::Error,
    },
    /// The configured run-as user does not exist.
    #[error("unknown user `{0}`")]
    UnknownUser(String),
    /// The filesystem root could not be confined.
    #[error("chroot to {path}: {source}")]
    Chroot {
        /// Jail directory the chroot targeted.
        path: PathBuf,
        /// Underlying OS error.
        source: std::io::Error,
    },
    /// Group switch failed after confinement.
    #[error("dropping group privileges: {0}")]
    SetGid(std::io::Error),
    /// User switch failed after confinement.
    #[error("dropping user privileges: {0}")]
    SetUid(std::io::Error),
    /// This platform has no resource-sandbox implementation.
    #[error("resource sandboxing is not supported on this platform")]
    Unsupported,
}

/// Enter the sandbox for `profile` in the calling process.
///
/// Handlers go in first so a ceiling tripped during setup already maps to
/// its typed outcome, then the six ceilings are applied. On failure the
/// caller must exit with [`WorkerOutcome::SandboxSetup`] without running
/// task code.
///
/// [`WorkerOutcome::SandboxSetup`]: crate::core::WorkerOutcome::SandboxSetup
///
/// # Errors
///
/// Returns the first handler installation or ceiling application failure.
#[cfg(unix)]
pub fn enter(profile: &SandboxProfile) -> Result<(), SandboxError> {
    unix::install_fault_handlers()?;
    unix::apply_ceilings(profile)
}

/// Enter the sandbox for `profile` in the calling process.
///
/// # Errors
///
/// Always returns [`SandboxError::Unsupported`] on this platform.
#[cfg(not(unix))]
pub fn enter(_profile: &SandboxProfile) -> Result<(), SandboxError> {
    Err(SandboxError::Unsupported)
}

/// Confine the filesystem root and switch to the unprivileged user.
///
/// Called once at daemon startup, before the dispatcher loop; worker
/// processes inherit the confinement. The program must abort if this fails.
///
/// # Errors
///
/// Returns the failing confinement step; the process state may be partially
/// confined afterwards, which is why callers abort.
#[cfg(unix)]
pub fn drop_privileges(policy: &PrivilegeDrop) -> Result<(), SandboxError> {
    unix::drop_privileges(policy)
}

/// Confine the filesystem root and switch to the unprivileged user.
///
/// # Errors
///
/// Always returns [`SandboxError::Unsupported`] on this platform.
#[cfg(not(unix))]
pub fn drop_privileges(_policy: &PrivilegeDrop) -> Result<(), SandboxError> {
    Err(SandboxError::Unsupported)
}
