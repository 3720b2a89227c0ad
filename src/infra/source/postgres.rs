//! Postgres-backed work item source (schema stubs).

use super::{OutboundMessage, RuleScript, WorkItemSource};
use crate::core::SchedulerError;

/// Postgres source adapter placeholder.
pub struct PostgresSource {
    url: String,
}

impl PostgresSource {
    /// Create a new adapter for the given connection URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// The connection URL this adapter was built with.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Migration statements for the payload tables.
    #[must_use]
    pub fn migrations() -> &'static [&'static str] {
        &[
            r"
CREATE TABLE IF NOT EXISTS piecework_messages (
    work_item_id BIGINT PRIMARY KEY,
    from_address TEXT NOT NULL,
    to_address TEXT NOT NULL,
    bcc_address TEXT,
    reply_to TEXT NOT NULL,
    errors_to TEXT NOT NULL,
    content TEXT NOT NULL
);
",
            r"
CREATE TABLE IF NOT EXISTS piecework_rules (
    group_id BIGINT PRIMARY KEY,
    source TEXT NOT NULL
);
",
        ]
    }
}

impl WorkItemSource for PostgresSource {
    fn outbound_message(
        &self,
        _work_item_id: i64,
    ) -> Result<Option<OutboundMessage>, SchedulerError> {
        Err(SchedulerError::Backend(
            "postgres source not wired to database client".into(),
        ))
    }

    fn rule_for_group(&self, _group_id: i64) -> Result<Option<RuleScript>, SchedulerError> {
        Err(SchedulerError::Backend(
            "postgres source not wired to database client".into(),
        ))
    }
}
