//! Queue store backends.

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;

use crate::core::{NewQueueEntry, QueueEntry, SchedulerError, WorkType};

/// How many candidate rows a claim selection inspects before giving up.
///
/// Bounding the lookahead keeps selection latency flat under backlog; the
/// cost is that an eligible entry hiding behind `CLAIM_SCAN_WINDOW` blocked
/// ones waits for the blockers to finish. Deliberate throughput/fairness
/// trade-off, not a correctness requirement.
pub const CLAIM_SCAN_WINDOW: usize = 8;

/// Durable queue of work items with the conditional-transition contract.
///
/// The store is the only resource mutated by more than one process, and all
/// mutation goes through conditional updates: a transition applies only when
/// the row still holds the state the caller last observed. Concurrent
/// dispatchers therefore race safely without any cross-process lock; the
/// loser of a race sees `false` and re-selects on its next tick.
pub trait QueueStore: Send + Sync {
    /// Insert a new entry in the Justin state. The store assigns the id and
    /// stamps the process date.
    ///
    /// # Errors
    ///
    /// Store-level failures only; validation of the fields is the producer's
    /// problem.
    fn insert(&self, new: NewQueueEntry) -> Result<QueueEntry, SchedulerError>;

    /// One claimable Justin entry for `(track, work_type)`, oldest first.
    ///
    /// Entries whose group already has a Processing entry of the same work
    /// type are skipped, so one busy group cannot monopolize the pool. Only
    /// the oldest [`CLAIM_SCAN_WINDOW`] candidates are considered.
    ///
    /// # Errors
    ///
    /// Store-level failures only; an empty queue is `Ok(None)`.
    fn select_claimable(
        &self,
        track: i32,
        work_type: WorkType,
    ) -> Result<Option<QueueEntry>, SchedulerError>;

    /// Attempt the Justin→Processing transition for `entry`.
    ///
    /// Compare-and-swap semantics: the update applies only if the stored
    /// state still equals `entry.state` (and that state is Justin). Returns
    /// `false` on race loss, leaving `entry` untouched; on success the
    /// entry's state is advanced in place so the caller's copy stays
    /// truthful.
    ///
    /// # Errors
    ///
    /// Store-level failures only; losing the race is not an error.
    fn try_claim(&self, entry: &mut QueueEntry) -> Result<bool, SchedulerError>;

    /// The Processing→Done transition, applied when the slot owner reaps
    /// its worker. Same conditional-update mechanics as [`Self::try_claim`];
    /// returns `false` if the row was not in the observed Processing state.
    ///
    /// # Errors
    ///
    /// Store-level failures only.
    fn finalize(&self, entry: &mut QueueEntry) -> Result<bool, SchedulerError>;

    /// Fetch one entry by id, if present.
    ///
    /// # Errors
    ///
    /// Store-level failures only.
    fn get(&self, id: i64) -> Result<Option<QueueEntry>, SchedulerError>;
}

impl<T: QueueStore + ?Sized> QueueStore for Box<T> {
    fn insert(&self, new: NewQueueEntry) -> Result<QueueEntry, SchedulerError> {
        (**self).insert(new)
    }

    fn select_claimable(
        &self,
        track: i32,
        work_type: WorkType,
    ) -> Result<Option<QueueEntry>, SchedulerError> {
        (**self).select_claimable(track, work_type)
    }

    fn try_claim(&self, entry: &mut QueueEntry) -> Result<bool, SchedulerError> {
        (**self).try_claim(entry)
    }

    fn finalize(&self, entry: &mut QueueEntry) -> Result<bool, SchedulerError> {
        (**self).finalize(entry)
    }

    fn get(&self, id: i64) -> Result<Option<QueueEntry>, SchedulerError> {
        (**self).get(id)
    }
}
