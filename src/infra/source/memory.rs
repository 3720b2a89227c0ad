//! In-memory work item source for tests and single-process deployments.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{OutboundMessage, RuleScript, WorkItemSource};
use crate::core::SchedulerError;

#[derive(Default)]
struct SourceState {
    messages: HashMap<i64, OutboundMessage>,
    rules: HashMap<i64, RuleScript>,
}

/// Shared-memory [`WorkItemSource`]. Cloning yields another handle onto the
/// same payload tables.
#[derive(Clone, Default)]
pub struct InMemorySource {
    inner: Arc<Mutex<SourceState>>,
}

impl InMemorySource {
    /// Create an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the message behind a delivery work item.
    pub fn put_outbound(&self, work_item_id: i64, message: OutboundMessage) {
        self.inner.lock().messages.insert(work_item_id, message);
    }

    /// Store the rule script for a group.
    pub fn put_rule(&self, script: RuleScript) {
        self.inner.lock().rules.insert(script.group_id, script);
    }
}

impl WorkItemSource for InMemorySource {
    fn outbound_message(
        &self,
        work_item_id: i64,
    ) -> Result<Option<OutboundMessage>, SchedulerError> {
        Ok(self.inner.lock().messages.get(&work_item_id).cloned())
    }

    fn rule_for_group(&self, group_id: i64) -> Result<Option<RuleScript>, SchedulerError> {
        Ok(self.inner.lock().rules.get(&group_id).cloned())
    }
}
