//! In-memory queue store.
//!
//! Backs tests and single-process deployments. The same conditional-update
//! contract as the SQL backend: every transition checks the observed state
//! under one lock, so concurrent claimers resolve exactly one winner.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{QueueStore, CLAIM_SCAN_WINDOW};
use crate::core::{NewQueueEntry, QueueEntry, QueueState, SchedulerError, WorkType};
use crate::util::now_ms;

/// A queue row plus the store-internal ordering stamp.
///
/// The stamp never crosses the store boundary; callers order work solely by
/// what `select_claimable` hands them.
struct StoredRow {
    entry: QueueEntry,
    process_date_ms: u128,
}

#[derive(Default)]
struct StoreState {
    next_id: i64,
    rows: Vec<StoredRow>,
}

/// Shared-memory [`QueueStore`].
///
/// Cloning yields another handle onto the same queue, which is how a test
/// stands in for several processes sharing one database.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<Mutex<StoreState>>,
}

impl InMemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl QueueStore for InMemoryStore {
    fn insert(&self, new: NewQueueEntry) -> Result<QueueEntry, SchedulerError> {
        let mut state = self.inner.lock();
        state.next_id += 1;
        let entry = QueueEntry {
            id: state.next_id,
            work_item_id: new.work_item_id,
            work_type: new.work_type,
            state: QueueState::Justin,
            owner_id: new.owner_id,
            group_id: new.group_id,
            track: new.track,
        };
        state.rows.push(StoredRow {
            entry: entry.clone(),
            process_date_ms: now_ms(),
        });
        Ok(entry)
    }

    fn select_claimable(
        &self,
        track: i32,
        work_type: WorkType,
    ) -> Result<Option<QueueEntry>, SchedulerError> {
        let state = self.inner.lock();

        let busy_groups: HashSet<i64> = state
            .rows
            .iter()
            .filter(|row| {
                row.entry.state == QueueState::Processing && row.entry.work_type == work_type
            })
            .map(|row| row.entry.group_id)
            .collect();

        let mut candidates: Vec<&StoredRow> = state
            .rows
            .iter()
            .filter(|row| {
                row.entry.state == QueueState::Justin
                    && row.entry.track == track
                    && row.entry.work_type == work_type
            })
            .collect();
        candidates.sort_by_key(|row| (row.process_date_ms, row.entry.id));

        Ok(candidates
            .iter()
            .take(CLAIM_SCAN_WINDOW)
            .find(|row| !busy_groups.contains(&row.entry.group_id))
            .map(|row| row.entry.clone()))
    }

    fn try_claim(&self, entry: &mut QueueEntry) -> Result<bool, SchedulerError> {
        if entry.state != QueueState::Justin {
            return Ok(false);
        }
        let mut state = self.inner.lock();
        let Some(row) = state.rows.iter_mut().find(|row| row.entry.id == entry.id) else {
            return Ok(false);
        };
        if row.entry.state != entry.state {
            return Ok(false);
        }
        row.entry.state = QueueState::Processing;
        row.process_date_ms = now_ms();
        entry.state = QueueState::Processing;
        Ok(true)
    }

    fn finalize(&self, entry: &mut QueueEntry) -> Result<bool, SchedulerError> {
        if entry.state != QueueState::Processing {
            return Ok(false);
        }
        let mut state = self.inner.lock();
        let Some(row) = state.rows.iter_mut().find(|row| row.entry.id == entry.id) else {
            return Ok(false);
        };
        if row.entry.state != entry.state {
            return Ok(false);
        }
        row.entry.state = QueueState::Done;
        row.process_date_ms = now_ms();
        entry.state = QueueState::Done;
        Ok(true)
    }

    fn get(&self, id: i64) -> Result<Option<QueueEntry>, SchedulerError> {
        let state = self.inner.lock();
        Ok(state
            .rows
            .iter()
            .find(|row| row.entry.id == id)
            .map(|row| row.entry.clone()))
    }
}
