//! Postgres-backed queue store (schema and statement stubs).

use super::QueueStore;
use crate::core::{NewQueueEntry, QueueEntry, SchedulerError, WorkType};

/// Insert statement issued by a wired adapter. The database assigns the id
/// and stamps the process date.
pub const INSERT_SQL: &str = r"
INSERT INTO piecework_queue
    (work_item_id, work_type, state, owner_id, group_id, track, process_date)
VALUES ($1, $2, 1, $3, $4, $5, NOW())
RETURNING id
";

/// Claim selection issued by a wired adapter.
///
/// The inner select is the scan window: the oldest candidates in the Justin
/// state for one `(track, work_type)` lane, bounded to the same width as
/// [`super::CLAIM_SCAN_WINDOW`]. The anti-join drops candidates whose group
/// already runs an entry of that work type.
pub const SELECT_CLAIMABLE_SQL: &str = r"
SELECT candidates.id, candidates.work_item_id, candidates.work_type,
       candidates.state, candidates.owner_id, candidates.group_id,
       candidates.track
FROM (
    SELECT id, work_item_id, work_type, state, owner_id, group_id, track,
           process_date
    FROM piecework_queue
    WHERE state = 1 AND track = $1 AND work_type = $2
    ORDER BY process_date, id
    LIMIT 8
) candidates
LEFT JOIN (
    SELECT DISTINCT group_id
    FROM piecework_queue
    WHERE state = 2 AND work_type = $2
) busy USING (group_id)
WHERE busy.group_id IS NULL
ORDER BY candidates.process_date, candidates.id
LIMIT 1
";

/// Conditional transition issued by a wired adapter for both the claim and
/// the finalize step. The update applies only when the row still holds the
/// state the caller observed; one affected row means the caller won.
pub const TRANSITION_SQL: &str = r"
UPDATE piecework_queue
SET state = $1, process_date = NOW()
WHERE id = $2 AND state = $3
";

/// Postgres store adapter placeholder.
pub struct PostgresStore {
    url: String,
}

impl PostgresStore {
    /// Create a new adapter for the given connection URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// The connection URL this adapter was built with.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Migration statements for the queue table.
    #[must_use]
    pub fn migrations() -> &'static [&'static str] {
        &[
            r"
CREATE TABLE IF NOT EXISTS piecework_queue (
    id BIGSERIAL PRIMARY KEY,
    work_item_id BIGINT NOT NULL,
    work_type SMALLINT NOT NULL,
    state SMALLINT NOT NULL DEFAULT 1,
    owner_id BIGINT NOT NULL,
    group_id BIGINT NOT NULL,
    track INT NOT NULL,
    process_date TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
CREATE INDEX IF NOT EXISTS idx_piecework_queue_claim
    ON piecework_queue (work_type, state, track, process_date);
CREATE INDEX IF NOT EXISTS idx_piecework_queue_group
    ON piecework_queue (group_id, work_type, state);
",
        ]
    }
}

impl QueueStore for PostgresStore {
    fn insert(&self, _new: NewQueueEntry) -> Result<QueueEntry, SchedulerError> {
        Err(SchedulerError::Backend(
            "postgres store not wired to database client".into(),
        ))
    }

    fn select_claimable(
        &self,
        _track: i32,
        _work_type: WorkType,
    ) -> Result<Option<QueueEntry>, SchedulerError> {
        Err(SchedulerError::Backend(
            "postgres store not wired to database client".into(),
        ))
    }

    fn try_claim(&self, _entry: &mut QueueEntry) -> Result<bool, SchedulerError> {
        Err(SchedulerError::Backend(
            "postgres store not wired to database client".into(),
        ))
    }

    fn finalize(&self, _entry: &mut QueueEntry) -> Result<bool, SchedulerError> {
        Err(SchedulerError::Backend(
            "postgres store not wired to database client".into(),
        ))
    }

    fn get(&self, _id: i64) -> Result<Option<QueueEntry>, SchedulerError> {
        Err(SchedulerError::Backend(
            "postgres store not wired to database client".into(),
        ))
    }
}
