//! Boss-side dispatch loop over a fixed slot array.
//!
//! The dispatcher owns a fixed number of worker slots and drives them with a
//! two-phase tick: reap finished workers and finalize their entries, then
//! fill free slots by claiming fresh work. Both phases are non-blocking, so
//! one stuck worker never delays the rest of the pool.
//!
//! The daemon never exits on its own. Work failures are recorded against the
//! entry and logged; only a configuration rejected at startup is fatal.

use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use tracing::{debug, error, info, warn};

use crate::config::DispatcherConfig;
use crate::core::{QueueEntry, SchedulerError, WorkerOutcome};
use crate::infra::QueueStore;

/// Launches one worker for a claimed entry.
///
/// Production launchers spawn an OS process; tests substitute scripted
/// handles to drive the loop deterministically.
pub trait WorkerLauncher {
    /// Handle to a launched worker.
    type Handle: WorkerHandle;

    /// Start a worker for `entry`. Called only after the claim succeeded.
    ///
    /// # Errors
    ///
    /// Spawn failures, such as an exhausted process table or a missing
    /// worker binary. The dispatcher finalizes the claimed entry and keeps
    /// running.
    fn launch(&mut self, entry: &QueueEntry) -> Result<Self::Handle, SchedulerError>;
}

/// A running worker owned by one slot.
pub trait WorkerHandle {
    /// Non-blocking exit probe. `Ok(None)` while the worker still runs.
    ///
    /// # Errors
    ///
    /// Probe failures. The dispatcher treats the worker as gone with an
    /// unknown outcome.
    fn poll_exit(&mut self) -> Result<Option<WorkerOutcome>, SchedulerError>;

    /// OS process id, when the handle maps to a real process.
    fn pid(&self) -> Option<u32>;
}

/// One claimed entry and the worker running it.
struct RunningWorker<H> {
    handle: H,
    entry: QueueEntry,
}

/// Snapshot of dispatcher activity.
#[derive(Debug, Clone, Default)]
pub struct DispatchStats {
    /// Total worker slots.
    pub slots: usize,
    /// Slots currently running a worker.
    pub busy_slots: usize,
    /// Workers launched.
    pub spawned: u64,
    /// Workers that exited with success.
    pub completed: u64,
    /// Workers that exited with a failure code, spawn failures included.
    pub failed: u64,
    /// Workers torn down by an unhandled signal.
    pub killed: u64,
    /// Claims lost to a concurrent dispatcher.
    pub claim_races: u64,
}

/// Internal counters behind [`DispatchStats`].
#[derive(Debug, Default)]
struct DispatchCounters {
    spawned: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    killed: AtomicU64,
    claim_races: AtomicU64,
}

impl DispatchCounters {
    fn snapshot(&self, slots: usize, busy_slots: usize) -> DispatchStats {
        DispatchStats {
            slots,
            busy_slots,
            spawned: self.spawned.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            killed: self.killed.load(Ordering::Relaxed),
            claim_races: self.claim_races.load(Ordering::Relaxed),
        }
    }
}

/// Fixed-slot dispatcher for one `(track, work_type)` lane.
///
/// Several dispatcher processes may serve the same lane against one shared
/// store; the conditional claim in [`QueueStore::try_claim`] arbitrates
/// between them without any cross-process lock.
pub struct Dispatcher<S, L>
where
    S: QueueStore,
    L: WorkerLauncher,
{
    config: DispatcherConfig,
    store: S,
    launcher: L,
    slots: Vec<Option<RunningWorker<L::Handle>>>,
    counters: DispatchCounters,
}

impl<S, L> Dispatcher<S, L>
where
    S: QueueStore,
    L: WorkerLauncher,
{
    /// Create a dispatcher with every slot free.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::InvalidConfig`] when the configuration is invalid.
    /// This is the only fatal path; everything past startup is survived.
    pub fn new(config: DispatcherConfig, store: S, launcher: L) -> Result<Self, SchedulerError> {
        config.validate().map_err(SchedulerError::InvalidConfig)?;

        let mut slots = Vec::with_capacity(config.slots);
        slots.resize_with(config.slots, || None);

        info!(
            slots = config.slots,
            track = config.track,
            work_type = ?config.work_type,
            idle_sleep_ms = config.idle_sleep_ms,
            "dispatcher initialized"
        );

        Ok(Self {
            config,
            store,
            launcher,
            slots,
            counters: DispatchCounters::default(),
        })
    }

    /// The store this dispatcher claims from.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Snapshot of activity counters.
    pub fn stats(&self) -> DispatchStats {
        let busy_slots = self.slots.iter().filter(|slot| slot.is_some()).count();
        self.counters.snapshot(self.slots.len(), busy_slots)
    }

    /// One reap-then-fill pass over the slot array.
    pub fn tick(&mut self) {
        self.reap();
        self.fill();
    }

    /// Run forever: tick, sleep, repeat.
    pub fn run(&mut self) -> ! {
        info!(slots = self.slots.len(), "dispatch loop running");
        loop {
            self.tick();
            thread::sleep(self.config.idle_sleep());
        }
    }

    /// Probe every busy slot; finalize and free the ones whose worker left.
    ///
    /// Every exit is terminal. A failure code marks the entry Done exactly
    /// like success does; retry policy belongs to producers, not the pool.
    fn reap(&mut self) {
        for slot_id in 0..self.slots.len() {
            let Some(running) = self.slots[slot_id].as_mut() else {
                continue;
            };

            let outcome = match running.handle.poll_exit() {
                Ok(None) => continue,
                Ok(Some(outcome)) => outcome,
                Err(err) => {
                    error!(
                        slot = slot_id,
                        entry_id = running.entry.id,
                        %err,
                        "worker probe failed; recording an unknown exit"
                    );
                    WorkerOutcome::Unknown
                }
            };

            let Some(finished) = self.slots[slot_id].take() else {
                continue;
            };
            let mut entry = finished.entry;

            if outcome.is_success() {
                self.counters.completed.fetch_add(1, Ordering::Relaxed);
                info!(slot = slot_id, entry_id = entry.id, "worker finished");
            } else if outcome == WorkerOutcome::Killed {
                self.counters.killed.fetch_add(1, Ordering::Relaxed);
                warn!(slot = slot_id, entry_id = entry.id, "worker killed by signal");
            } else {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                warn!(
                    slot = slot_id,
                    entry_id = entry.id,
                    code = outcome.exit_code(),
                    %outcome,
                    "worker failed"
                );
            }

            self.finalize_entry(&mut entry);
        }
    }

    /// Claim work for every free slot until the lane runs dry.
    fn fill(&mut self) {
        for slot_id in 0..self.slots.len() {
            if self.slots[slot_id].is_some() {
                continue;
            }

            let candidate =
                match self.store.select_claimable(self.config.track, self.config.work_type) {
                    Ok(Some(entry)) => entry,
                    // Claiming only removes candidates within a tick, so one
                    // empty selection empties the whole pass.
                    Ok(None) => break,
                    Err(err) => {
                        error!(%err, "claim selection failed");
                        break;
                    }
                };

            let mut entry = candidate;
            match self.store.try_claim(&mut entry) {
                Ok(true) => {}
                Ok(false) => {
                    self.counters.claim_races.fetch_add(1, Ordering::Relaxed);
                    debug!(entry_id = entry.id, "lost the claim race; re-selecting");
                    continue;
                }
                Err(err) => {
                    error!(entry_id = entry.id, %err, "claim failed");
                    break;
                }
            }

            match self.launcher.launch(&entry) {
                Ok(handle) => {
                    self.counters.spawned.fetch_add(1, Ordering::Relaxed);
                    info!(
                        slot = slot_id,
                        entry_id = entry.id,
                        pid = handle.pid(),
                        work_type = ?entry.work_type,
                        "worker started"
                    );
                    self.slots[slot_id] = Some(RunningWorker { handle, entry });
                }
                Err(err) => {
                    // The claim went through, so the entry must not wedge
                    // its group: record the failure and finalize it.
                    self.counters.failed.fetch_add(1, Ordering::Relaxed);
                    error!(
                        slot = slot_id,
                        entry_id = entry.id,
                        code = WorkerOutcome::SpawnFailed.exit_code(),
                        %err,
                        "worker spawn failed"
                    );
                    self.finalize_entry(&mut entry);
                }
            }
        }
    }

    fn finalize_entry(&self, entry: &mut QueueEntry) {
        match self.store.finalize(entry) {
            Ok(true) => {}
            Ok(false) => warn!(
                entry_id = entry.id,
                "finalize skipped: entry left the observed state"
            ),
            Err(err) => error!(entry_id = entry.id, %err, "finalize failed; slot freed anyway"),
        }
    }
}
