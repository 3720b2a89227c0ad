//! Queue entry data model and state machine values.

use serde::{Deserialize, Serialize};

/// Default priority lane (track) for queue selection.
pub const TRACK_NORMAL: i32 = 1000;

/// Discriminates which worker function applies to an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkType {
    /// Inbound work: run the owning group's rule script over the item.
    InboundRule,
    /// Outbound work: deliver the item through the mail transport.
    OutboundDelivery,
}

impl WorkType {
    /// Small-int value used by the persisted schema.
    #[must_use]
    pub const fn code(self) -> i16 {
        match self {
            Self::InboundRule => 1,
            Self::OutboundDelivery => 2,
        }
    }
}

/// Queue entry lifecycle state. Transitions are monotonic:
/// `Justin → Processing → Done`, and `Done` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueState {
    /// Just inserted; eligible for claiming.
    Justin,
    /// Claimed by exactly one dispatcher; a worker process is running it.
    Processing,
    /// Terminal. Reached on every worker outcome, success or failure.
    Done,
}

impl QueueState {
    /// Small-int value used by the persisted schema.
    #[must_use]
    pub const fn code(self) -> i16 {
        match self {
            Self::Justin => 1,
            Self::Processing => 2,
            Self::Done => 3,
        }
    }

    /// The only state this one may legally transition to, if any.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Justin => Some(Self::Processing),
            Self::Processing => Some(Self::Done),
            Self::Done => None,
        }
    }
}

/// One durable work item as seen by the scheduler.
///
/// A spawned worker operates on its own private copy; the store row is the
/// only representation shared across processes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    /// Store-assigned unique id.
    pub id: i64,
    /// Reference to the payload this entry schedules (e.g. a message).
    pub work_item_id: i64,
    /// Which worker function applies.
    pub work_type: WorkType,
    /// Lifecycle state as last observed by the holder of this copy.
    pub state: QueueState,
    /// Submitting user.
    pub owner_id: i64,
    /// Work-group this item belongs to; drives anti-affinity.
    pub group_id: i64,
    /// Priority lane selector.
    pub track: i32,
}

/// Fields a producer supplies when inserting a new entry.
///
/// The store assigns the id and stamps the process date; new entries always
/// start in [`QueueState::Justin`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewQueueEntry {
    /// Reference to the payload being scheduled.
    pub work_item_id: i64,
    /// Which worker function applies.
    pub work_type: WorkType,
    /// Submitting user.
    pub owner_id: i64,
    /// Work-group for anti-affinity.
    pub group_id: i64,
    /// Priority lane selector.
    pub track: i32,
}
