//! Inbound rule daemon.
//!
//! Runs forever as the boss for the inbound rule lane: claim entries, spawn
//! one sandboxed worker process per entry, finalize whatever comes back.
//! Invoked with the `worker` subcommand by its own boss, the same binary
//! becomes one of those workers instead.

use std::env;
use std::fs;
use std::process;

use anyhow::{anyhow, Context};
use tracing::{error, info};

use piecework::builders::build_daemon;
use piecework::config::DaemonConfig;
use piecework::core::{
    execute_in_sandbox, AppResult, ProcessContext, QueueEntry, WorkerOutcome,
};
use piecework::runtime::parse_worker_invocation;
use piecework::sandbox;
use piecework::util::init_tracing;
use piecework::workers::{NullEngine, RuleWorker};

fn daemon_config() -> Result<DaemonConfig, String> {
    let base = match env::var("PIECEWORK_CONFIG") {
        Ok(path) => {
            let raw =
                fs::read_to_string(&path).map_err(|e| format!("reading {path}: {e}"))?;
            DaemonConfig::from_json_str(&raw)?
        }
        Err(_) => DaemonConfig::rule_runner_defaults(),
    };
    base.overlay_env()
}

fn run_worker(entry: QueueEntry) -> ! {
    let config = match daemon_config() {
        Ok(config) => config,
        Err(err) => {
            error!(%err, "worker could not load configuration");
            process::exit(WorkerOutcome::Unknown.exit_code());
        }
    };
    // Own connections first, then the sandbox, then the work.
    let context = match ProcessContext::open(config) {
        Ok(context) => context,
        Err(err) => {
            error!(%err, "worker could not open its backends");
            process::exit(err.worker_outcome().exit_code());
        }
    };

    let worker = RuleWorker::new(context.source, NullEngine);
    let outcome = execute_in_sandbox(&worker, &entry);
    process::exit(outcome.exit_code());
}

fn main() -> AppResult<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let argv: Vec<String> = env::args().collect();
    match parse_worker_invocation(&argv) {
        Ok(Some(entry)) => run_worker(entry),
        Ok(None) => {}
        Err(err) => {
            error!(%err, "bad worker invocation");
            process::exit(WorkerOutcome::Unknown.exit_code());
        }
    }

    let config = daemon_config().map_err(|e| anyhow!("configuration: {e}"))?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        slots = config.dispatcher.slots,
        "rule runner daemon starting"
    );

    if let Some(policy) = &config.privilege {
        // Privileges drop before the first tick; a failure aborts startup.
        sandbox::drop_privileges(policy).context("dropping privileges")?;
    }

    let mut dispatcher = build_daemon(config).context("building dispatcher")?;
    dispatcher.run()
}
