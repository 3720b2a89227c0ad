//! Builders to construct daemon dispatchers from configuration.

use crate::config::DaemonConfig;
use crate::core::{Dispatcher, ProcessContext, SchedulerError, WorkerLauncher};
use crate::infra::QueueStore;
use crate::runtime::ProcessLauncher;

/// A dispatcher wired the way the daemons run it: boxed store backend,
/// workers spawned from the daemon's own binary.
pub type DaemonDispatcher = Dispatcher<Box<dyn QueueStore>, ProcessLauncher>;

/// Build the boss-side dispatcher for a daemon.
///
/// Validates the configuration, opens this process's own store connection,
/// and wires a launcher that re-invokes the current executable in worker
/// mode.
///
/// # Errors
///
/// Configuration rejections and store-connection failures, both fatal to
/// daemon startup.
pub fn build_daemon(config: DaemonConfig) -> Result<DaemonDispatcher, SchedulerError> {
    let launcher = ProcessLauncher::current_exe()?;
    build_daemon_with_launcher(config, launcher)
}

/// Build a dispatcher with an explicit launcher. Tests substitute scripted
/// launchers; embedders point at a dedicated worker binary.
///
/// # Errors
///
/// Same as [`build_daemon`].
pub fn build_daemon_with_launcher<L: WorkerLauncher>(
    config: DaemonConfig,
    launcher: L,
) -> Result<Dispatcher<Box<dyn QueueStore>, L>, SchedulerError> {
    config.validate().map_err(SchedulerError::InvalidConfig)?;
    let context = ProcessContext::open(config)?;
    let dispatcher_config = context.config.dispatcher.clone();
    Dispatcher::new(dispatcher_config, context.store, launcher)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RULE_RUNNER_SLOTS;
    use crate::core::{QueueEntry, WorkerHandle, WorkerOutcome};

    struct NeverLauncher;

    struct NeverHandle;

    impl WorkerHandle for NeverHandle {
        fn poll_exit(&mut self) -> Result<Option<WorkerOutcome>, SchedulerError> {
            Ok(None)
        }

        fn pid(&self) -> Option<u32> {
            None
        }
    }

    impl WorkerLauncher for NeverLauncher {
        type Handle = NeverHandle;

        fn launch(&mut self, _entry: &QueueEntry) -> Result<NeverHandle, SchedulerError> {
            Err(SchedulerError::Spawn("not in this test".into()))
        }
    }

    #[test]
    fn rule_runner_profile_builds_its_pool() {
        let dispatcher =
            build_daemon_with_launcher(DaemonConfig::rule_runner_defaults(), NeverLauncher)
                .unwrap();
        assert_eq!(dispatcher.stats().slots, RULE_RUNNER_SLOTS);
    }

    #[test]
    fn invalid_config_is_rejected_before_wiring() {
        let mut config = DaemonConfig::rule_runner_defaults();
        config.dispatcher.slots = 0;
        let result = build_daemon_with_launcher(config, NeverLauncher);
        assert!(matches!(result, Err(SchedulerError::InvalidConfig(_))));
    }

    #[test]
    fn delivery_config_without_transport_is_rejected() {
        let mut config = DaemonConfig::delivery_defaults();
        config.transport = None;
        let result = build_daemon_with_launcher(config, NeverLauncher);
        assert!(matches!(result, Err(SchedulerError::InvalidConfig(_))));
    }
}
