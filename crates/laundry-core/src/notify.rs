//! Notification thresholds and one-shot flags
//!
//! Each threshold fires at most once per reservation lifecycle. The engine
//! resets a slot's flags on claim, extend and return to available.

use chrono::{DateTime, Utc};
use laundry_api::{Alert, AlertAudience, AlertKind, AlertSeverity, MachineSlot, MachineType};
use laundry_config::NotificationPolicy;
use laundry_util::format_countdown;
use std::collections::BTreeSet;

/// Which alerts a slot has already raised in its current lifecycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationFlags {
    cycle_warned: BTreeSet<u64>,
    completed: bool,
    auto_release_warned: BTreeSet<u64>,
}

impl NotificationFlags {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn completed(&self) -> bool {
        self.completed
    }

    /// Mark the cycle complete. Returns true only the first time.
    pub fn mark_completed(&mut self) -> bool {
        !std::mem::replace(&mut self.completed, true)
    }
}

/// Warning thresholds, in seconds remaining
#[derive(Debug, Clone)]
pub struct NotificationRules {
    cycle_warnings: Vec<u64>,
    auto_release_warnings: Vec<u64>,
}

impl NotificationRules {
    pub fn new(mut cycle_warnings: Vec<u64>, mut auto_release_warnings: Vec<u64>) -> Self {
        for thresholds in [&mut cycle_warnings, &mut auto_release_warnings] {
            thresholds.sort_unstable_by(|a, b| b.cmp(a));
            thresholds.dedup();
        }
        Self {
            cycle_warnings,
            auto_release_warnings,
        }
    }

    pub fn from_policy(policy: &NotificationPolicy) -> Self {
        Self::new(
            policy.cycle_warnings.clone(),
            policy.auto_release_warnings.clone(),
        )
    }

    /// Cycle warning due at `remaining`, if any.
    ///
    /// A threshold only applies to cycles at least that long.
    pub fn due_cycle_warning(
        &self,
        flags: &mut NotificationFlags,
        remaining: u64,
        duration: u64,
    ) -> Option<u64> {
        most_urgent_crossed(&self.cycle_warnings, &mut flags.cycle_warned, remaining, |t| {
            duration >= t
        })
    }

    /// Auto-release warning due at `remaining`, if any
    pub fn due_auto_release_warning(
        &self,
        flags: &mut NotificationFlags,
        remaining: u64,
    ) -> Option<u64> {
        most_urgent_crossed(
            &self.auto_release_warnings,
            &mut flags.auto_release_warned,
            remaining,
            |_| true,
        )
    }
}

/// Mark every unfired threshold at or above `remaining` and return the
/// smallest of them.
fn most_urgent_crossed(
    thresholds: &[u64],
    fired: &mut BTreeSet<u64>,
    remaining: u64,
    applies: impl Fn(u64) -> bool,
) -> Option<u64> {
    if remaining == 0 {
        return None;
    }

    let mut most_urgent = None;
    for &threshold in thresholds {
        if remaining <= threshold && applies(threshold) && fired.insert(threshold) {
            most_urgent = Some(most_urgent.map_or(threshold, |m: u64| m.min(threshold)));
        }
    }
    most_urgent
}

pub fn cycle_warning_alert(slot: &MachineSlot, threshold: u64, remaining: u64, now: DateTime<Utc>) -> Alert {
    Alert::new(
        slot.machine,
        AlertKind::CycleWarning {
            threshold_seconds: threshold,
        },
        AlertSeverity::Warn,
        AlertAudience::Owner,
        format!("{} almost done", slot.machine.label()),
        format!(
            "Your {} cycle finishes in {}.",
            slot.machine,
            format_countdown(remaining)
        ),
        now,
    )
}

pub fn cycle_complete_alert(slot: &MachineSlot, window_seconds: u64, now: DateTime<Utc>) -> Alert {
    Alert::new(
        slot.machine,
        AlertKind::CycleComplete,
        AlertSeverity::Warn,
        AlertAudience::Owner,
        format!("{} finished", slot.machine.label()),
        format!(
            "Your laundry is ready. Please collect it within {} minutes.",
            window_seconds / 60
        ),
        now,
    )
}

pub fn auto_release_warning_alert(
    slot: &MachineSlot,
    threshold: u64,
    remaining: u64,
    now: DateTime<Utc>,
) -> Alert {
    let severity = if threshold <= 60 {
        AlertSeverity::Critical
    } else {
        AlertSeverity::Warn
    };
    Alert::new(
        slot.machine,
        AlertKind::AutoReleaseWarning {
            threshold_seconds: threshold,
        },
        severity,
        AlertAudience::Owner,
        "Collect your laundry",
        format!(
            "The {} will be released in {}.",
            slot.machine,
            format_countdown(remaining)
        ),
        now,
    )
}

pub fn foreign_complete_alert(slot: &MachineSlot, now: DateTime<Utc>) -> Alert {
    let owner_name = slot.owner_display().to_string();
    Alert::new(
        slot.machine,
        AlertKind::ForeignComplete {
            owner_name: owner_name.clone(),
        },
        AlertSeverity::Info,
        AlertAudience::Everyone,
        format!("{} finished", slot.machine.label()),
        format!("{owner_name}'s cycle is done."),
        now,
    )
}

pub fn released_alert(
    machine: MachineType,
    previous_owner: &str,
    auto_release: bool,
    now: DateTime<Utc>,
) -> Alert {
    let body = if auto_release {
        format!("{previous_owner}'s reservation was auto-released.")
    } else {
        format!("{previous_owner}'s laundry was collected.")
    };
    Alert::new(
        machine,
        AlertKind::Released {
            previous_owner: previous_owner.to_string(),
            auto_release,
        },
        AlertSeverity::Info,
        AlertAudience::Everyone,
        format!("{} available", machine.label()),
        body,
        now,
    )
}

pub fn claim_lost_alert(machine: MachineType, owner_name: &str, now: DateTime<Utc>) -> Alert {
    Alert::new(
        machine,
        AlertKind::ClaimLost {
            owner_name: owner_name.to_string(),
        },
        AlertSeverity::Warn,
        AlertAudience::Owner,
        format!("{} taken", machine.label()),
        format!("{owner_name} claimed the {machine} first. Try again once it is free."),
        now,
    )
}
