//! Configuration models for daemons, stores, and transports.

pub mod daemon;

pub use daemon::{
    DaemonConfig, DispatcherConfig, StoreBackendConfig, TransportConfig, DELIVERY_SLOTS,
    RULE_RUNNER_SLOTS,
};
