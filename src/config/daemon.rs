//! Daemon configuration structures.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::{WorkType, TRACK_NORMAL};
use crate::sandbox::PrivilegeDrop;

/// Slot count the inbound rule daemon deploys with.
pub const RULE_RUNNER_SLOTS: usize = 5;

/// Slot count the outbound delivery daemon deploys with.
pub const DELIVERY_SLOTS: usize = 10;

/// Queue store backend selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackendConfig {
    /// Shared-memory store for development and tests.
    Memory,
    /// Postgres store.
    Postgres {
        /// Connection URL.
        url: String,
    },
}

/// Dispatch loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Fixed number of worker slots. The slot count is the hard concurrency
    /// bound; there is no queueing inside the daemon.
    pub slots: usize,
    /// Sleep between ticks, in milliseconds. Zero means a busy loop.
    pub idle_sleep_ms: u64,
    /// Queue track this daemon serves.
    #[serde(default = "default_track")]
    pub track: i32,
    /// Work type this daemon serves.
    pub work_type: WorkType,
}

fn default_track() -> i32 {
    TRACK_NORMAL
}

impl DispatcherConfig {
    /// A dispatcher sized to the host: one slot per CPU, normal track.
    #[must_use]
    pub fn sized_to_host(work_type: WorkType) -> Self {
        Self {
            slots: num_cpus::get().max(1),
            idle_sleep_ms: 1000,
            track: TRACK_NORMAL,
            work_type,
        }
    }

    /// The tick sleep as a [`Duration`].
    #[must_use]
    pub const fn idle_sleep(&self) -> Duration {
        Duration::from_millis(self.idle_sleep_ms)
    }

    /// Validate dispatch settings.
    ///
    /// # Errors
    ///
    /// A human-readable description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.slots == 0 {
            return Err("slots must be greater than 0".into());
        }
        Ok(())
    }
}

/// Delivery transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Transport binary handed the assembled message on stdin.
    #[serde(default = "default_transport_program")]
    pub program: PathBuf,
    /// Envelope sender passed to the transport with `-r`.
    #[serde(default = "default_return_address")]
    pub return_address: String,
}

fn default_transport_program() -> PathBuf {
    PathBuf::from("/usr/sbin/sendmail")
}

fn default_return_address() -> String {
    "postmaster@localhost".into()
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            program: default_transport_program(),
            return_address: default_return_address(),
        }
    }
}

/// Root daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Dispatch loop settings.
    pub dispatcher: DispatcherConfig,
    /// Queue store backend.
    pub store: StoreBackendConfig,
    /// Delivery transport. Required when the daemon serves the outbound
    /// delivery work type; ignored otherwise.
    #[serde(default)]
    pub transport: Option<TransportConfig>,
    /// Root privileges to shed right after startup. `None` keeps the
    /// invoking user, which is the development arrangement.
    #[serde(default)]
    pub privilege: Option<PrivilegeDrop>,
}

impl DaemonConfig {
    /// Deployment profile of the inbound rule daemon: a small pool polled
    /// aggressively, since rule work arrives in bursts behind mail receipt.
    #[must_use]
    pub fn rule_runner_defaults() -> Self {
        Self {
            dispatcher: DispatcherConfig {
                slots: RULE_RUNNER_SLOTS,
                idle_sleep_ms: 1,
                track: TRACK_NORMAL,
                work_type: WorkType::InboundRule,
            },
            store: StoreBackendConfig::Memory,
            transport: None,
            privilege: None,
        }
    }

    /// Deployment profile of the outbound delivery daemon: a wider pool on
    /// a relaxed poll, since delivery tolerates a second of queue latency.
    #[must_use]
    pub fn delivery_defaults() -> Self {
        Self {
            dispatcher: DispatcherConfig {
                slots: DELIVERY_SLOTS,
                idle_sleep_ms: 1000,
                track: TRACK_NORMAL,
                work_type: WorkType::OutboundDelivery,
            },
            store: StoreBackendConfig::Memory,
            transport: Some(TransportConfig::default()),
            privilege: None,
        }
    }

    /// Validate the whole configuration.
    ///
    /// # Errors
    ///
    /// A human-readable description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        self.dispatcher.validate()?;
        if let StoreBackendConfig::Postgres { url } = &self.store {
            if url.is_empty() {
                return Err("store url must not be empty".into());
            }
        }
        match &self.transport {
            None if self.dispatcher.work_type == WorkType::OutboundDelivery => {
                return Err("delivery daemons require a transport".into());
            }
            Some(transport) => {
                if transport.program.as_os_str().is_empty() {
                    return Err("transport program must not be empty".into());
                }
                if transport.return_address.is_empty() {
                    return Err("transport return_address must not be empty".into());
                }
            }
            None => {}
        }
        if let Some(privilege) = &self.privilege {
            if privilege.run_as.is_empty() {
                return Err("privilege run_as must not be empty".into());
            }
            if !privilege.jail_dir.is_absolute() {
                return Err("privilege jail_dir must be an absolute path".into());
            }
        }
        Ok(())
    }

    /// Parse daemon configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Parse errors and validation failures, as human-readable strings.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Overlay recognized environment variables onto this configuration,
    /// then re-validate.
    ///
    /// Recognized: `PIECEWORK_SLOTS`, `PIECEWORK_IDLE_SLEEP_MS`,
    /// `PIECEWORK_TRACK`, `PIECEWORK_STORE_URL`,
    /// `PIECEWORK_TRANSPORT_PROGRAM`, `PIECEWORK_RETURN_ADDRESS`,
    /// `PIECEWORK_JAIL_DIR`, `PIECEWORK_RUN_AS`. Unset variables leave the
    /// base value in place.
    ///
    /// # Errors
    ///
    /// Unparsable variable values and validation failures.
    pub fn overlay_env(mut self) -> Result<Self, String> {
        if let Ok(v) = env::var("PIECEWORK_SLOTS") {
            self.dispatcher.slots = v.parse().map_err(|e| format!("PIECEWORK_SLOTS: {e}"))?;
        }
        if let Ok(v) = env::var("PIECEWORK_IDLE_SLEEP_MS") {
            self.dispatcher.idle_sleep_ms =
                v.parse().map_err(|e| format!("PIECEWORK_IDLE_SLEEP_MS: {e}"))?;
        }
        if let Ok(v) = env::var("PIECEWORK_TRACK") {
            self.dispatcher.track = v.parse().map_err(|e| format!("PIECEWORK_TRACK: {e}"))?;
        }
        if let Ok(url) = env::var("PIECEWORK_STORE_URL") {
            self.store = StoreBackendConfig::Postgres { url };
        }
        if let Ok(program) = env::var("PIECEWORK_TRANSPORT_PROGRAM") {
            self.transport.get_or_insert_with(TransportConfig::default).program = program.into();
        }
        if let Ok(address) = env::var("PIECEWORK_RETURN_ADDRESS") {
            self.transport
                .get_or_insert_with(TransportConfig::default)
                .return_address = address;
        }
        if let (Ok(jail_dir), Ok(run_as)) =
            (env::var("PIECEWORK_JAIL_DIR"), env::var("PIECEWORK_RUN_AS"))
        {
            self.privilege = Some(PrivilegeDrop {
                jail_dir: jail_dir.into(),
                run_as,
            });
        }
        self.validate()?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deployment_profiles_validate() {
        assert!(DaemonConfig::rule_runner_defaults().validate().is_ok());
        assert!(DaemonConfig::delivery_defaults().validate().is_ok());
    }

    #[test]
    fn profiles_carry_their_pool_sizes() {
        let rules = DaemonConfig::rule_runner_defaults();
        assert_eq!(rules.dispatcher.slots, RULE_RUNNER_SLOTS);
        assert_eq!(rules.dispatcher.work_type, WorkType::InboundRule);
        assert!(rules.transport.is_none());

        let delivery = DaemonConfig::delivery_defaults();
        assert_eq!(delivery.dispatcher.slots, DELIVERY_SLOTS);
        assert_eq!(delivery.dispatcher.idle_sleep_ms, 1000);
        assert!(delivery.transport.is_some());
    }

    #[test]
    fn zero_slots_is_rejected() {
        let mut cfg = DaemonConfig::rule_runner_defaults();
        cfg.dispatcher.slots = 0;
        assert!(cfg.validate().unwrap_err().contains("slots"));
    }

    #[test]
    fn delivery_without_transport_is_rejected() {
        let mut cfg = DaemonConfig::delivery_defaults();
        cfg.transport = None;
        assert!(cfg.validate().unwrap_err().contains("transport"));
    }

    #[test]
    fn json_config_round_trips() {
        let cfg = DaemonConfig::from_json_str(
            r#"{
                "dispatcher": {
                    "slots": 3,
                    "idle_sleep_ms": 250,
                    "work_type": "outbound_delivery"
                },
                "store": { "postgres": { "url": "postgres://localhost/piecework" } },
                "transport": { "return_address": "bounces@example.org" }
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.dispatcher.slots, 3);
        assert_eq!(cfg.dispatcher.track, TRACK_NORMAL);
        let transport = cfg.transport.unwrap();
        assert_eq!(transport.program, PathBuf::from("/usr/sbin/sendmail"));
        assert_eq!(transport.return_address, "bounces@example.org");
    }

    #[test]
    fn env_overlay_wins_over_base_values() {
        env::set_var("PIECEWORK_SLOTS", "7");
        env::set_var("PIECEWORK_STORE_URL", "postgres://db/piecework");
        let cfg = DaemonConfig::rule_runner_defaults().overlay_env().unwrap();
        env::remove_var("PIECEWORK_SLOTS");
        env::remove_var("PIECEWORK_STORE_URL");

        assert_eq!(cfg.dispatcher.slots, 7);
        assert!(matches!(cfg.store, StoreBackendConfig::Postgres { .. }));
    }

    #[test]
    fn host_sized_dispatcher_has_at_least_one_slot() {
        let cfg = DispatcherConfig::sized_to_host(WorkType::InboundRule);
        assert!(cfg.slots >= 1);
        assert!(cfg.validate().is_ok());
    }
}
