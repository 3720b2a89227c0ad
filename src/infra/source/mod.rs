//! Work item sources.
//!
//! A queue entry only references work by id; the payload behind it lives in
//! a separate table. Workers resolve that payload through [`WorkItemSource`]
//! over their own connection, never through state inherited from the boss.

pub mod memory;
pub mod postgres;

pub use memory::InMemorySource;
pub use postgres::PostgresSource;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::{SchedulerError, WorkerOutcome};

/// Ident stamped into the `X-Mailer` header of every assembled message.
pub const MAILER_IDENT: &str = concat!("piecework ", env!("CARGO_PKG_VERSION"));

/// A message build that cannot produce valid wire bytes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MessageError {
    /// A required header field is empty.
    #[error("required header {0} is empty")]
    HeaderMissing(&'static str),
}

impl MessageError {
    /// The exit code a worker reports for this failure.
    #[must_use]
    pub const fn worker_outcome(&self) -> WorkerOutcome {
        match self {
            Self::HeaderMissing(_) => WorkerOutcome::HeaderMissing,
        }
    }
}

fn default_mailer() -> String {
    MAILER_IDENT.to_owned()
}

/// An outbound message as stored by the producer.
///
/// `content` is the tail of the header block: it opens with its own
/// `Subject:` line, then a blank line, then the body. Assembly prepends the
/// envelope headers and never inserts a separator of its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// `From:` header value.
    pub from: String,
    /// `To:` header value.
    pub to: String,
    /// Optional `Bcc:` header value; omitted from the wire when empty.
    #[serde(default)]
    pub bcc: Option<String>,
    /// `Reply-To:` header value.
    pub reply_to: String,
    /// `Errors-To:` header value.
    pub errors_to: String,
    /// `X-Mailer:` header value, normally [`MAILER_IDENT`].
    #[serde(default = "default_mailer")]
    pub mailer: String,
    /// Subject line plus body, already formatted by the producer.
    pub content: String,
}

impl OutboundMessage {
    /// Assemble the complete wire bytes handed to the transport.
    ///
    /// The whole message is built before any I/O happens, so a bad message
    /// never leaves a transport process half-fed.
    ///
    /// # Errors
    ///
    /// [`MessageError::HeaderMissing`] when a required header is empty.
    pub fn to_wire(&self) -> Result<String, MessageError> {
        let from = require("From", &self.from)?;
        let to = require("To", &self.to)?;
        let reply_to = require("Reply-To", &self.reply_to)?;
        let errors_to = require("Errors-To", &self.errors_to)?;
        let mailer = require("X-Mailer", &self.mailer)?;

        let mut wire = format!("From: {from}\r\nTo: {to}\r\n");
        if let Some(bcc) = self.bcc.as_deref().filter(|b| !b.is_empty()) {
            wire.push_str("Bcc: ");
            wire.push_str(bcc);
            wire.push_str("\r\n");
        }
        wire.push_str(&format!(
            "Reply-To: {reply_to}\r\nErrors-To: {errors_to}\r\nX-Mailer: {mailer}\r\n"
        ));
        wire.push_str(&self.content);
        wire.push_str("\r\n");
        Ok(wire)
    }
}

fn require<'a>(name: &'static str, value: &'a str) -> Result<&'a str, MessageError> {
    if value.is_empty() {
        return Err(MessageError::HeaderMissing(name));
    }
    Ok(value)
}

/// A stored rule script, keyed by the group it governs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleScript {
    /// The group whose inbound work this rule handles.
    pub group_id: i64,
    /// Script source handed to the engine verbatim.
    pub source: String,
}

/// Read access to work item payloads.
pub trait WorkItemSource: Send + Sync {
    /// The outbound message behind a delivery entry, if the producer stored
    /// one.
    ///
    /// # Errors
    ///
    /// Store-level failures only; an unknown id is `Ok(None)`.
    fn outbound_message(&self, work_item_id: i64)
        -> Result<Option<OutboundMessage>, SchedulerError>;

    /// The rule script for a group, if one is configured.
    ///
    /// # Errors
    ///
    /// Store-level failures only; a group without a rule is `Ok(None)`.
    fn rule_for_group(&self, group_id: i64) -> Result<Option<RuleScript>, SchedulerError>;
}

impl<T: WorkItemSource + ?Sized> WorkItemSource for Box<T> {
    fn outbound_message(
        &self,
        work_item_id: i64,
    ) -> Result<Option<OutboundMessage>, SchedulerError> {
        (**self).outbound_message(work_item_id)
    }

    fn rule_for_group(&self, group_id: i64) -> Result<Option<RuleScript>, SchedulerError> {
        (**self).rule_for_group(group_id)
    }
}
