//! Display snapshots for the countdown driver

use chrono::{DateTime, Utc};
use laundry_api::{MachineSlot, MachineStatus, MachineType};
use laundry_util::UserId;
use serde::Serialize;

use crate::timing;

/// What one machine looks like at a given instant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountdownReading {
    pub machine: MachineType,
    pub status: MachineStatus,
    pub owner_name: Option<String>,
    /// The local user holds the reservation
    pub mine: bool,
    /// Seconds left in the cycle; `Some` while in use
    pub remaining_seconds: Option<u64>,
    /// Seconds until the machine may be auto-released; `Some` while complete
    pub auto_release_remaining_seconds: Option<u64>,
}

impl CountdownReading {
    pub fn from_slot(
        slot: &MachineSlot,
        local_user: Option<&UserId>,
        now: DateTime<Utc>,
        window_seconds: u64,
    ) -> Self {
        let remaining_seconds = match (slot.status, slot.start_timestamp) {
            (MachineStatus::InUse, Some(start)) => {
                Some(timing::remaining(now, start, slot.cycle_duration_seconds))
            }
            _ => None,
        };

        let auto_release_remaining_seconds = match (slot.status, slot.complete_timestamp) {
            (MachineStatus::Complete, Some(complete)) => {
                Some(timing::auto_release_remaining(now, complete, window_seconds))
            }
            _ => None,
        };

        Self {
            machine: slot.machine,
            status: slot.status,
            owner_name: slot.owner_name.clone(),
            mine: local_user.is_some_and(|id| slot.is_owned_by(id)),
            remaining_seconds,
            auto_release_remaining_seconds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
    }

    fn in_use() -> MachineSlot {
        MachineSlot {
            machine: MachineType::Washer,
            status: MachineStatus::InUse,
            owner_id: Some(UserId::new("alice-id")),
            owner_name: Some("Alice".into()),
            start_timestamp: Some(t0()),
            cycle_duration_seconds: 1800,
            complete_timestamp: None,
        }
    }

    #[test]
    fn in_use_reading() {
        let alice = UserId::new("alice-id");
        let reading =
            CountdownReading::from_slot(&in_use(), Some(&alice), t0() + Duration::seconds(61), 900);

        assert!(reading.mine);
        assert_eq!(reading.remaining_seconds, Some(1739));
        assert_eq!(reading.auto_release_remaining_seconds, None);
    }

    #[test]
    fn complete_reading() {
        let done = t0() + Duration::seconds(1800);
        let slot = MachineSlot {
            status: MachineStatus::Complete,
            complete_timestamp: Some(done),
            ..in_use()
        };

        let reading = CountdownReading::from_slot(&slot, None, done + Duration::seconds(300), 900);
        assert!(!reading.mine);
        assert_eq!(reading.remaining_seconds, None);
        assert_eq!(reading.auto_release_remaining_seconds, Some(600));
    }

    #[test]
    fn available_reading() {
        let reading = CountdownReading::from_slot(
            &MachineSlot::available(MachineType::Dryer),
            None,
            t0(),
            900,
        );
        assert_eq!(reading.status, MachineStatus::Available);
        assert_eq!(reading.owner_name, None);
        assert_eq!(reading.remaining_seconds, None);
    }
}
