//! Builders to construct daemons from configuration.

pub mod daemon;

pub use daemon::{build_daemon, build_daemon_with_launcher, DaemonDispatcher};
