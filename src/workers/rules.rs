//! Inbound rule execution.
//!
//! Groups may attach a script that runs when inbound work arrives for them.
//! The worker looks the script up by group, hands it to the embedded engine,
//! and reports success when the group simply has no rule. The engine runs
//! inside the rule-execution sandbox profile, so a hostile script hits OS
//! ceilings, not process trust.

use thiserror::Error;
use tracing::error;

use crate::core::{QueueEntry, WorkerFunction, WorkerOutcome};
use crate::infra::{RuleScript, WorkItemSource};
use crate::sandbox::TaskClass;

/// Heap budget an embedded engine allocates for one rule run, in bytes.
pub const RULE_ENGINE_HEAP_BYTES: u64 = 16 * 1024 * 1024;

/// An engine-level failure while running a rule.
///
/// Rule scripts are group-supplied and allowed to be wrong; every engine
/// stage failure collapses to the same generic worker outcome rather than
/// growing its own exit code.
#[derive(Debug, Error)]
#[error("rule engine fault during {stage}: {detail}")]
pub struct EngineFault {
    /// Engine stage that failed.
    pub stage: &'static str,
    /// Engine-reported detail.
    pub detail: String,
}

/// Embedded script engine boundary.
///
/// The pool does not care which engine runs rules, only that execution is
/// synchronous, heap-capped at [`RULE_ENGINE_HEAP_BYTES`], and reports
/// faults by return instead of unwinding.
pub trait ScriptEngine {
    /// Run `script` for the entry it was triggered by.
    ///
    /// # Errors
    ///
    /// Engine faults: initialization, compilation, or execution failures.
    fn run(&self, script: &RuleScript, entry: &QueueEntry) -> Result<(), EngineFault>;
}

/// Placeholder engine for builds without an embedded engine linked in.
///
/// Groups without rules still succeed; a group that does carry a rule gets
/// the same generic fault a broken engine would produce.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEngine;

impl ScriptEngine for NullEngine {
    fn run(&self, _script: &RuleScript, _entry: &QueueEntry) -> Result<(), EngineFault> {
        Err(EngineFault {
            stage: "init",
            detail: "no script engine linked into this build".into(),
        })
    }
}

/// Worker function for the inbound rule work type.
pub struct RuleWorker<Src, E> {
    source: Src,
    engine: E,
}

impl<Src, E> RuleWorker<Src, E>
where
    Src: WorkItemSource,
    E: ScriptEngine,
{
    /// Build a rule worker over this process's own source connection.
    pub const fn new(source: Src, engine: E) -> Self {
        Self { source, engine }
    }
}

impl<Src, E> WorkerFunction for RuleWorker<Src, E>
where
    Src: WorkItemSource,
    E: ScriptEngine,
{
    fn task_class(&self) -> TaskClass {
        TaskClass::RuleExecution
    }

    fn execute(&self, entry: &QueueEntry) -> WorkerOutcome {
        let script = match self.source.rule_for_group(entry.group_id) {
            Ok(Some(script)) => script,
            // Most groups never attach a rule; nothing to run is success.
            Ok(None) => return WorkerOutcome::Success,
            Err(err) => {
                error!(
                    entry_id = entry.id,
                    group_id = entry.group_id,
                    %err,
                    "rule lookup failed"
                );
                return err.worker_outcome();
            }
        };

        match self.engine.run(&script, entry) {
            Ok(()) => WorkerOutcome::Success,
            Err(fault) => {
                error!(
                    entry_id = entry.id,
                    group_id = entry.group_id,
                    %fault,
                    "rule engine fault"
                );
                WorkerOutcome::Unknown
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::core::{QueueState, SchedulerError, WorkType, TRACK_NORMAL};
    use crate::infra::{InMemorySource, OutboundMessage};

    struct CountingEngine {
        runs: Arc<AtomicU32>,
        fail: bool,
    }

    impl ScriptEngine for CountingEngine {
        fn run(&self, script: &RuleScript, entry: &QueueEntry) -> Result<(), EngineFault> {
            assert_eq!(script.group_id, entry.group_id);
            self.runs.fetch_add(1, Ordering::Relaxed);
            if self.fail {
                Err(EngineFault {
                    stage: "execute",
                    detail: "script threw".into(),
                })
            } else {
                Ok(())
            }
        }
    }

    struct BrokenSource;

    impl WorkItemSource for BrokenSource {
        fn outbound_message(
            &self,
            _work_item_id: i64,
        ) -> Result<Option<OutboundMessage>, SchedulerError> {
            Err(SchedulerError::Backend("source offline".into()))
        }

        fn rule_for_group(&self, _group_id: i64) -> Result<Option<RuleScript>, SchedulerError> {
            Err(SchedulerError::Backend("source offline".into()))
        }
    }

    fn entry(group_id: i64) -> QueueEntry {
        QueueEntry {
            id: 1,
            work_item_id: 10,
            work_type: WorkType::InboundRule,
            state: QueueState::Processing,
            owner_id: 1,
            group_id,
            track: TRACK_NORMAL,
        }
    }

    #[test]
    fn group_without_rule_is_success() {
        let runs = Arc::new(AtomicU32::new(0));
        let worker = RuleWorker::new(
            InMemorySource::new(),
            CountingEngine {
                runs: Arc::clone(&runs),
                fail: false,
            },
        );

        assert_eq!(worker.execute(&entry(1)), WorkerOutcome::Success);
        assert_eq!(runs.load(Ordering::Relaxed), 0, "engine must stay idle");
    }

    #[test]
    fn rule_runs_through_the_engine() {
        let source = InMemorySource::new();
        source.put_rule(RuleScript {
            group_id: 2,
            source: "bump();".into(),
        });
        let runs = Arc::new(AtomicU32::new(0));
        let worker = RuleWorker::new(
            source,
            CountingEngine {
                runs: Arc::clone(&runs),
                fail: false,
            },
        );

        assert_eq!(worker.execute(&entry(2)), WorkerOutcome::Success);
        assert_eq!(runs.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn engine_fault_collapses_to_unknown() {
        let source = InMemorySource::new();
        source.put_rule(RuleScript {
            group_id: 2,
            source: "throw 1;".into(),
        });
        let worker = RuleWorker::new(
            source,
            CountingEngine {
                runs: Arc::new(AtomicU32::new(0)),
                fail: true,
            },
        );

        assert_eq!(worker.execute(&entry(2)), WorkerOutcome::Unknown);
    }

    #[test]
    fn lookup_failure_reports_store_query() {
        let worker = RuleWorker::new(BrokenSource, NullEngine);
        assert_eq!(worker.execute(&entry(2)), WorkerOutcome::StoreQuery);
    }

    #[test]
    fn null_engine_faults_on_any_script() {
        let source = InMemorySource::new();
        source.put_rule(RuleScript {
            group_id: 3,
            source: "accept();".into(),
        });
        let worker = RuleWorker::new(source, NullEngine);
        assert_eq!(worker.execute(&entry(3)), WorkerOutcome::Unknown);
    }

    #[test]
    fn rule_worker_uses_the_tight_profile() {
        let worker = RuleWorker::new(InMemorySource::new(), NullEngine);
        assert_eq!(worker.task_class(), TaskClass::RuleExecution);
    }
}
