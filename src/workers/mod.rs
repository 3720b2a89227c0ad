//! Worker functions, one per work type.

pub mod delivery;
pub mod rules;

pub use delivery::{DeliveryError, DeliveryWorker, MailTransport};
pub use rules::{EngineFault, NullEngine, RuleWorker, ScriptEngine, RULE_ENGINE_HEAP_BYTES};
