//! Unix implementation of the sandbox: rlimits, fault handlers, chroot.
//!
//! The only module in the crate allowed to use `unsafe`; everything here is
//! a thin wrapper over libc calls with errno converted to `io::Error`.

#![allow(unsafe_code)]

use std::ffi::CString;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::path::PathBuf;

use tracing::info;

use crate::core::WorkerOutcome;

use super::{Ceiling, PrivilegeDrop, ResourceKind, SandboxError, SandboxProfile};

/// The fault-signal table: every recognized limit/fault signal and the one
/// typed outcome its handler exits with. Installed once at sandbox entry,
/// never mutated.
const FAULT_SIGNALS: [(libc::c_int, WorkerOutcome); 7] = [
    (libc::SIGXCPU, WorkerOutcome::CpuExceeded),
    (libc::SIGSEGV, WorkerOutcome::MemoryExceeded),
    (libc::SIGXFSZ, WorkerOutcome::FileSizeExceeded),
    (libc::SIGFPE, WorkerOutcome::FloatingPointFault),
    (libc::SIGPIPE, WorkerOutcome::PipeWrite),
    (libc::SIGILL, WorkerOutcome::IllegalInstruction),
    (libc::SIGBUS, WorkerOutcome::BusFault),
];

/// Outcome a fault signal maps to, if it is one the sandbox recognizes.
#[must_use]
pub fn fault_signal_outcome(signal: i32) -> Option<WorkerOutcome> {
    FAULT_SIGNALS
        .iter()
        .find(|(s, _)| *s == signal)
        .map(|(_, outcome)| *outcome)
}

/// Handler for every fault signal: exit immediately with the typed code.
extern "C" fn fault_exit(signal: libc::c_int) {
    let outcome = fault_signal_outcome(signal).unwrap_or(WorkerOutcome::Unknown);
    // SAFETY: `_exit` is async-signal-safe; this path allocates nothing and
    // takes no locks.
    unsafe { libc::_exit(outcome.exit_code()) }
}

/// Install [`fault_exit`] for each signal in the table.
pub(super) fn install_fault_handlers() -> Result<(), SandboxError> {
    let handler = fault_exit as extern "C" fn(libc::c_int);
    for (signal, _) in FAULT_SIGNALS {
        // SAFETY: zeroed sigaction is a valid starting point on all
        // supported platforms; sigemptyset initializes the mask in place.
        let mut action: libc::sigaction = unsafe { std::mem::zeroed() };
        action.sa_sigaction = handler as usize;
        action.sa_flags = 0;
        unsafe { libc::sigemptyset(&mut action.sa_mask) };
        // SAFETY: action is fully initialized; the old-action pointer may be
        // null when the caller does not want the previous disposition.
        let rc = unsafe { libc::sigaction(signal, &action, std::ptr::null_mut()) };
        if rc != 0 {
            return Err(SandboxError::Handler {
                signal,
                source: io::Error::last_os_error(),
            });
        }
    }
    Ok(())
}

/// Apply all six ceilings of `profile` to the calling process.
pub(super) fn apply_ceilings(profile: &SandboxProfile) -> Result<(), SandboxError> {
    for ceiling in profile.ceilings() {
        set_rlimit(ceiling)?;
    }
    Ok(())
}

fn set_rlimit(ceiling: Ceiling) -> Result<(), SandboxError> {
    let limit = libc::rlimit {
        rlim_cur: ceiling.soft as libc::rlim_t,
        rlim_max: ceiling.hard as libc::rlim_t,
    };
    // SAFETY: setrlimit only reads the struct passed by reference.
    let rc = unsafe {
        match ceiling.resource {
            ResourceKind::CpuSeconds => libc::setrlimit(libc::RLIMIT_CPU, &limit),
            ResourceKind::AddressSpace => libc::setrlimit(libc::RLIMIT_AS, &limit),
            ResourceKind::FileSize => libc::setrlimit(libc::RLIMIT_FSIZE, &limit),
            ResourceKind::OpenFiles => libc::setrlimit(libc::RLIMIT_NOFILE, &limit),
            ResourceKind::Processes => libc::setrlimit(libc::RLIMIT_NPROC, &limit),
            ResourceKind::CoreSize => libc::setrlimit(libc::RLIMIT_CORE, &limit),
        }
    };
    if rc != 0 {
        return Err(SandboxError::Ceiling {
            resource: ceiling.resource,
            source: io::Error::last_os_error(),
        });
    }
    Ok(())
}

/// Chroot into the jail directory and switch to the run-as user/group.
pub(super) fn drop_privileges(policy: &PrivilegeDrop) -> Result<(), SandboxError> {
    let user = CString::new(policy.run_as.as_str())
        .map_err(|_| SandboxError::UnknownUser(policy.run_as.clone()))?;

    // Resolve the user before chroot; the passwd database lives outside
    // the jail.
    // SAFETY: getpwnam returns a pointer into static storage, or null; the
    // ids are copied out before any other libc call can clobber it.
    let pw = unsafe { libc::getpwnam(user.as_ptr()) };
    if pw.is_null() {
        return Err(SandboxError::UnknownUser(policy.run_as.clone()));
    }
    let (uid, gid) = unsafe { ((*pw).pw_uid, (*pw).pw_gid) };

    let jail = CString::new(policy.jail_dir.as_os_str().as_bytes()).map_err(|_| {
        SandboxError::Chroot {
            path: policy.jail_dir.clone(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "path contains a NUL byte"),
        }
    })?;

    // SAFETY: plain syscalls over owned, NUL-terminated strings.
    if unsafe { libc::chroot(jail.as_ptr()) } != 0 {
        return Err(SandboxError::Chroot {
            path: policy.jail_dir.clone(),
            source: io::Error::last_os_error(),
        });
    }
    // The working directory must move inside the new root, or the old tree
    // stays reachable through it.
    if unsafe { libc::chdir(c"/".as_ptr()) } != 0 {
        return Err(SandboxError::Chroot {
            path: PathBuf::from("/"),
            source: io::Error::last_os_error(),
        });
    }

    // Group first: dropping the uid first would remove the right to change
    // groups.
    if unsafe { libc::setregid(gid, gid) } != 0 {
        return Err(SandboxError::SetGid(io::Error::last_os_error()));
    }
    if unsafe { libc::setreuid(uid, uid) } != 0 {
        return Err(SandboxError::SetUid(io::Error::last_os_error()));
    }

    info!(
        jail = %policy.jail_dir.display(),
        user = %policy.run_as,
        "privileges dropped"
    );
    Ok(())
}
