//! Infrastructure adapters: queue stores and work-item sources.

pub mod source;
pub mod store;

pub use source::{
    InMemorySource, MessageError, OutboundMessage, PostgresSource, RuleScript, WorkItemSource,
};
pub use store::{InMemoryStore, PostgresStore, QueueStore};
