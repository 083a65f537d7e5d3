//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Client process settings
    #[serde(default)]
    pub client: RawClientConfig,

    /// Reservation timing
    #[serde(default)]
    pub reservations: RawReservations,

    /// Per-machine limits
    #[serde(default)]
    pub machines: RawMachines,

    /// Notification thresholds and alert queue
    #[serde(default)]
    pub notifications: RawNotifications,

    /// Auto-release scheduler
    #[serde(default)]
    pub reaper: RawReaper,
}

/// Client-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawClientConfig {
    /// Shared store database (default: <data_dir>/laundry.db)
    pub store_path: Option<PathBuf>,

    /// Local data directory (identity file)
    pub data_dir: Option<PathBuf>,

    /// How often the change feed polls the shared store
    pub feed_poll_millis: Option<u64>,
}

/// Reservation timing
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawReservations {
    /// Pickup window after a cycle completes before the slot is freed
    pub auto_release_window_seconds: Option<u64>,

    /// Minimum spacing of heartbeat writes during an active cycle
    pub write_coalesce_seconds: Option<u64>,
}

/// The two machines; any other key is rejected
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RawMachines {
    pub washer: Option<RawMachine>,
    pub dryer: Option<RawMachine>,
}

/// Limits for one machine
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawMachine {
    /// Display label
    pub label: Option<String>,

    /// Longest cycle that may be claimed, in minutes
    pub max_cycle_minutes: Option<u64>,

    /// Cycle length offered when none is given, in minutes
    pub default_cycle_minutes: Option<u64>,
}

/// Notification settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawNotifications {
    /// Try desktop notifications before falling back to in-process alerts
    pub system: Option<bool>,

    /// Remaining-time warnings while a cycle runs, in seconds
    pub cycle_warning_seconds: Option<Vec<u64>>,

    /// Remaining pickup-window warnings after completion, in seconds
    pub auto_release_warning_seconds: Option<Vec<u64>>,

    /// In-process alerts kept at once
    pub alert_capacity: Option<usize>,

    /// Seconds before an in-process alert dismisses itself
    pub alert_dismiss_seconds: Option<u64>,
}

/// Auto-release scheduler settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawReaper {
    /// Seconds between sweeps
    pub interval_seconds: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_machine_limits() {
        let toml_str = r#"
            config_version = 1

            [machines.washer]
            label = "Basement washer"
            max_cycle_minutes = 75

            [machines.dryer]
            max_cycle_minutes = 90
            default_cycle_minutes = 45
        "#;

        let config: RawConfig = toml::from_str(toml_str).unwrap();
        let washer = config.machines.washer.unwrap();
        assert_eq!(washer.label.as_deref(), Some("Basement washer"));
        assert_eq!(washer.max_cycle_minutes, Some(75));
        assert_eq!(config.machines.dryer.unwrap().default_cycle_minutes, Some(45));
    }

    #[test]
    fn parse_notification_thresholds() {
        let toml_str = r#"
            config_version = 1

            [notifications]
            system = false
            cycle_warning_seconds = [600, 120]
            auto_release_warning_seconds = [300]
        "#;

        let config: RawConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.notifications.system, Some(false));
        assert_eq!(
            config.notifications.cycle_warning_seconds,
            Some(vec![600, 120])
        );
    }
}
