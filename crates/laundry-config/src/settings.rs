//! Validated configuration structures

use crate::schema::{
    RawClientConfig, RawConfig, RawMachine, RawNotifications, RawReaper, RawReservations,
};
use laundry_api::MachineType;
use laundry_util::{default_data_dir, default_store_path};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_AUTO_RELEASE_WINDOW_SECS: u64 = 15 * 60;
pub const DEFAULT_WRITE_COALESCE_SECS: u64 = 15;
pub const DEFAULT_FEED_POLL_MILLIS: u64 = 500;
pub const DEFAULT_WASHER_MAX_MINUTES: u64 = 60;
pub const DEFAULT_DRYER_MAX_MINUTES: u64 = 120;
pub const DEFAULT_CYCLE_MINUTES: u64 = 30;
pub const DEFAULT_CYCLE_WARNINGS: [u64; 1] = [600];
pub const DEFAULT_AUTO_RELEASE_WARNINGS: [u64; 2] = [300, 60];
pub const DEFAULT_ALERT_CAPACITY: usize = 3;
pub const DEFAULT_ALERT_DISMISS_SECS: u64 = 10;
pub const DEFAULT_REAPER_INTERVAL_SECS: u64 = 30;

/// Validated configuration ready for use by the engine and the binaries
#[derive(Debug, Clone)]
pub struct LaundryConfig {
    pub client: ClientConfig,
    pub reservations: ReservationPolicy,
    pub notifications: NotificationPolicy,
    pub reaper: ReaperConfig,
}

impl LaundryConfig {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        Self {
            client: ClientConfig::from_raw(raw.client),
            reservations: ReservationPolicy {
                auto_release_window: Duration::from_secs(
                    raw.reservations
                        .auto_release_window_seconds
                        .unwrap_or(DEFAULT_AUTO_RELEASE_WINDOW_SECS),
                ),
                write_coalesce_interval: Duration::from_secs(
                    raw.reservations
                        .write_coalesce_seconds
                        .unwrap_or(DEFAULT_WRITE_COALESCE_SECS),
                ),
                washer: MachinePolicy::from_raw(MachineType::Washer, raw.machines.washer),
                dryer: MachinePolicy::from_raw(MachineType::Dryer, raw.machines.dryer),
            },
            notifications: NotificationPolicy::from_raw(raw.notifications),
            reaper: ReaperConfig::from_raw(raw.reaper),
        }
    }
}

impl Default for LaundryConfig {
    fn default() -> Self {
        Self::from_raw(RawConfig {
            config_version: crate::CURRENT_CONFIG_VERSION,
            client: RawClientConfig::default(),
            reservations: RawReservations::default(),
            machines: Default::default(),
            notifications: RawNotifications::default(),
            reaper: RawReaper::default(),
        })
    }
}

/// Client process configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub store_path: PathBuf,
    pub data_dir: PathBuf,
    pub feed_poll_interval: Duration,
}

impl ClientConfig {
    fn from_raw(raw: RawClientConfig) -> Self {
        Self {
            store_path: raw.store_path.unwrap_or_else(default_store_path),
            data_dir: raw.data_dir.unwrap_or_else(default_data_dir),
            feed_poll_interval: Duration::from_millis(
                raw.feed_poll_millis.unwrap_or(DEFAULT_FEED_POLL_MILLIS),
            ),
        }
    }
}

/// Reservation limits and timing
#[derive(Debug, Clone)]
pub struct ReservationPolicy {
    pub auto_release_window: Duration,
    pub write_coalesce_interval: Duration,
    pub washer: MachinePolicy,
    pub dryer: MachinePolicy,
}

impl ReservationPolicy {
    pub fn machine(&self, machine: MachineType) -> &MachinePolicy {
        match machine {
            MachineType::Washer => &self.washer,
            MachineType::Dryer => &self.dryer,
        }
    }
}

/// Limits for one machine
#[derive(Debug, Clone)]
pub struct MachinePolicy {
    pub machine: MachineType,
    pub label: String,
    pub max_cycle: Duration,
    pub default_cycle: Duration,
}

impl MachinePolicy {
    fn from_raw(machine: MachineType, raw: Option<RawMachine>) -> Self {
        let raw = raw.unwrap_or_default();
        let max_minutes = raw
            .max_cycle_minutes
            .unwrap_or_else(|| default_max_minutes(machine));
        let default_minutes = raw
            .default_cycle_minutes
            .unwrap_or_else(|| DEFAULT_CYCLE_MINUTES.min(max_minutes));

        Self {
            machine,
            label: raw.label.unwrap_or_else(|| machine.label().to_string()),
            max_cycle: Duration::from_secs(max_minutes.saturating_mul(60)),
            default_cycle: Duration::from_secs(default_minutes.saturating_mul(60)),
        }
    }

    pub fn max_cycle_minutes(&self) -> u64 {
        self.max_cycle.as_secs() / 60
    }
}

pub fn default_max_minutes(machine: MachineType) -> u64 {
    match machine {
        MachineType::Washer => DEFAULT_WASHER_MAX_MINUTES,
        MachineType::Dryer => DEFAULT_DRYER_MAX_MINUTES,
    }
}

/// Notification thresholds and alert delivery
#[derive(Debug, Clone)]
pub struct NotificationPolicy {
    /// Try system notifications first
    pub system: bool,
    /// Remaining-seconds thresholds while in use, most distant first
    pub cycle_warnings: Vec<u64>,
    /// Remaining pickup-window thresholds, most distant first
    pub auto_release_warnings: Vec<u64>,
    pub alert_capacity: usize,
    pub alert_dismiss_after: Duration,
}

impl NotificationPolicy {
    fn from_raw(raw: RawNotifications) -> Self {
        Self {
            system: raw.system.unwrap_or(true),
            cycle_warnings: sorted_descending(
                raw.cycle_warning_seconds
                    .unwrap_or_else(|| DEFAULT_CYCLE_WARNINGS.to_vec()),
            ),
            auto_release_warnings: sorted_descending(
                raw.auto_release_warning_seconds
                    .unwrap_or_else(|| DEFAULT_AUTO_RELEASE_WARNINGS.to_vec()),
            ),
            alert_capacity: raw.alert_capacity.unwrap_or(DEFAULT_ALERT_CAPACITY),
            alert_dismiss_after: Duration::from_secs(
                raw.alert_dismiss_seconds.unwrap_or(DEFAULT_ALERT_DISMISS_SECS),
            ),
        }
    }
}

fn sorted_descending(mut thresholds: Vec<u64>) -> Vec<u64> {
    thresholds.sort_unstable_by(|a, b| b.cmp(a));
    thresholds.dedup();
    thresholds
}

/// Auto-release scheduler configuration
#[derive(Debug, Clone)]
pub struct ReaperConfig {
    pub interval: Duration,
}

impl ReaperConfig {
    fn from_raw(raw: RawReaper) -> Self {
        Self {
            interval: Duration::from_secs(
                raw.interval_seconds.unwrap_or(DEFAULT_REAPER_INTERVAL_SECS),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_shared_laundry_room() {
        let config = LaundryConfig::default();

        assert_eq!(config.reservations.washer.max_cycle_minutes(), 60);
        assert_eq!(config.reservations.dryer.max_cycle_minutes(), 120);
        assert_eq!(
            config.reservations.write_coalesce_interval,
            Duration::from_secs(15)
        );
        assert_eq!(config.notifications.cycle_warnings, vec![600]);
        assert_eq!(config.notifications.auto_release_warnings, vec![300, 60]);
        assert_eq!(
            config.notifications.alert_dismiss_after,
            Duration::from_secs(10)
        );
    }

    #[test]
    fn default_cycle_never_exceeds_max() {
        let policy = MachinePolicy::from_raw(
            MachineType::Washer,
            Some(RawMachine {
                label: None,
                max_cycle_minutes: Some(20),
                default_cycle_minutes: None,
            }),
        );
        assert_eq!(policy.default_cycle, Duration::from_secs(20 * 60));
        assert_eq!(policy.label, "Washer");
    }

    #[test]
    fn thresholds_are_sorted_most_distant_first() {
        let policy = NotificationPolicy::from_raw(RawNotifications {
            auto_release_warning_seconds: Some(vec![60, 300, 60]),
            ..Default::default()
        });
        assert_eq!(policy.auto_release_warnings, vec![300, 60]);
    }
}
