//! Process-launching runtime: the boss side of the spawn boundary.

pub mod process;

pub use process::{
    parse_worker_invocation, worker_args, ProcessHandle, ProcessLauncher, ENTRY_FLAG,
    WORKER_MODE_ARG,
};
