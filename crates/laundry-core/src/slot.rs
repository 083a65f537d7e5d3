//! Slot state machine
//!
//! Pure transitions over a [`MachineSlot`]. Each returns the next slot value
//! and never touches its input, so a refused operation cannot leave partial
//! state behind.

use chrono::{DateTime, Utc};
use laundry_api::{Identity, MachineSlot, MachineStatus};

use crate::timing;
use crate::{ReservationError, ReservationResult};

fn check_duration(slot: &MachineSlot, duration_seconds: u64, max_seconds: u64) -> ReservationResult<()> {
    if duration_seconds == 0 || duration_seconds > max_seconds {
        return Err(ReservationError::InvalidDuration {
            machine: slot.machine,
            requested: duration_seconds,
            max: max_seconds,
        });
    }
    Ok(())
}

fn check_owner(slot: &MachineSlot, actor: &Identity) -> ReservationResult<()> {
    if !slot.is_owned_by(&actor.id) {
        return Err(ReservationError::NotOwner {
            machine: slot.machine,
            owner_name: slot.owner_display().to_string(),
        });
    }
    Ok(())
}

/// Reserve an available machine for `actor`, starting now
pub fn claim(
    slot: &MachineSlot,
    actor: &Identity,
    duration_seconds: u64,
    max_seconds: u64,
    now: DateTime<Utc>,
) -> ReservationResult<MachineSlot> {
    if !slot.is_available() {
        return Err(ReservationError::NotAvailable {
            machine: slot.machine,
            owner_name: slot.owner_display().to_string(),
        });
    }
    check_duration(slot, duration_seconds, max_seconds)?;

    Ok(MachineSlot {
        machine: slot.machine,
        status: MachineStatus::InUse,
        owner_id: Some(actor.id.clone()),
        owner_name: Some(actor.name.clone()),
        start_timestamp: Some(now),
        cycle_duration_seconds: duration_seconds,
        complete_timestamp: None,
    })
}

/// Mark a finished cycle complete at `now`.
///
/// `Ok(None)` means the slot was already complete and nothing changes.
pub fn expire(slot: &MachineSlot, now: DateTime<Utc>) -> ReservationResult<Option<MachineSlot>> {
    match slot.status {
        MachineStatus::Complete => Ok(None),
        MachineStatus::Available => Err(ReservationError::InvalidTransition {
            machine: slot.machine,
            status: slot.status,
            operation: "expire",
        }),
        MachineStatus::InUse => {
            let start = slot.start_timestamp.unwrap_or(now);
            let remaining = timing::remaining(now, start, slot.cycle_duration_seconds);
            if remaining > 0 {
                return Err(ReservationError::NotDue {
                    machine: slot.machine,
                    remaining,
                });
            }

            Ok(Some(MachineSlot {
                status: MachineStatus::Complete,
                complete_timestamp: Some(now),
                ..slot.clone()
            }))
        }
    }
}

/// Start another cycle on a finished machine, keeping the same owner
pub fn extend(
    slot: &MachineSlot,
    actor: &Identity,
    duration_seconds: u64,
    max_seconds: u64,
    now: DateTime<Utc>,
) -> ReservationResult<MachineSlot> {
    check_owner(slot, actor)?;
    if slot.status != MachineStatus::Complete {
        return Err(ReservationError::InvalidTransition {
            machine: slot.machine,
            status: slot.status,
            operation: "extend",
        });
    }
    check_duration(slot, duration_seconds, max_seconds)?;

    Ok(MachineSlot {
        status: MachineStatus::InUse,
        start_timestamp: Some(now),
        cycle_duration_seconds: duration_seconds,
        complete_timestamp: None,
        ..slot.clone()
    })
}

/// Give the machine back. Only the owner may release.
pub fn release(slot: &MachineSlot, actor: &Identity) -> ReservationResult<MachineSlot> {
    check_owner(slot, actor)?;
    Ok(MachineSlot::available(slot.machine))
}

/// Free a machine whose pickup window has run out. No ownership check.
pub fn auto_release(
    slot: &MachineSlot,
    now: DateTime<Utc>,
    window_seconds: u64,
) -> ReservationResult<MachineSlot> {
    let complete = match (slot.status, slot.complete_timestamp) {
        (MachineStatus::Complete, Some(complete)) => complete,
        (status, _) => {
            return Err(ReservationError::InvalidTransition {
                machine: slot.machine,
                status,
                operation: "auto-release",
            });
        }
    };

    let remaining = timing::auto_release_remaining(now, complete, window_seconds);
    if remaining > 0 {
        return Err(ReservationError::AutoReleaseNotDue {
            machine: slot.machine,
            remaining,
        });
    }

    Ok(MachineSlot::available(slot.machine))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use laundry_api::MachineType;

    const HOUR: u64 = 3600;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
    }

    fn alice() -> Identity {
        Identity::new("alice-id", "Alice")
    }

    fn bob() -> Identity {
        Identity::new("bob-id", "Bob")
    }

    fn claimed(machine: MachineType, secs: u64) -> MachineSlot {
        claim(&MachineSlot::available(machine), &alice(), secs, 2 * HOUR, t0()).unwrap()
    }

    #[test]
    fn test_claim_sets_reservation() {
        let slot = claimed(MachineType::Washer, 1800);

        assert_eq!(slot.status, MachineStatus::InUse);
        assert!(slot.is_owned_by(&alice().id));
        assert_eq!(slot.owner_name.as_deref(), Some("Alice"));
        assert_eq!(slot.start_timestamp, Some(t0()));
        assert_eq!(slot.cycle_duration_seconds, 1800);
        assert_eq!(slot.complete_timestamp, None);
        assert!(slot.check_invariants().is_ok());
        assert_eq!(timing::remaining(t0(), t0(), slot.cycle_duration_seconds), 1800);
    }

    #[test]
    fn test_claim_rejects_bad_durations() {
        let slot = MachineSlot::available(MachineType::Washer);

        for secs in [0, HOUR + 1] {
            let err = claim(&slot, &alice(), secs, HOUR, t0()).unwrap_err();
            assert_eq!(
                err,
                ReservationError::InvalidDuration {
                    machine: MachineType::Washer,
                    requested: secs,
                    max: HOUR,
                }
            );
        }
        assert!(claim(&slot, &alice(), HOUR, HOUR, t0()).is_ok());
    }

    #[test]
    fn test_claim_on_reserved_slot_fails() {
        let slot = claimed(MachineType::Dryer, 3600);
        let before = slot.clone();

        let err = claim(&slot, &bob(), 600, 2 * HOUR, t0()).unwrap_err();
        assert_eq!(
            err,
            ReservationError::NotAvailable {
                machine: MachineType::Dryer,
                owner_name: "Alice".into(),
            }
        );
        assert_eq!(slot, before);
    }

    #[test]
    fn test_expire_before_due() {
        let slot = claimed(MachineType::Washer, 1800);
        let err = expire(&slot, t0() + Duration::seconds(1000)).unwrap_err();
        assert_eq!(
            err,
            ReservationError::NotDue {
                machine: MachineType::Washer,
                remaining: 800,
            }
        );
    }

    #[test]
    fn test_expire_when_due() {
        let slot = claimed(MachineType::Washer, 1800);
        let done = t0() + Duration::seconds(1800);

        let complete = expire(&slot, done).unwrap().unwrap();
        assert_eq!(complete.status, MachineStatus::Complete);
        assert_eq!(complete.complete_timestamp, Some(done));
        assert_eq!(complete.owner_id, slot.owner_id);
        assert!(complete.check_invariants().is_ok());

        // Already complete: unchanged
        assert_eq!(expire(&complete, done + Duration::seconds(5)).unwrap(), None);
    }

    #[test]
    fn test_expire_available_is_invalid() {
        let slot = MachineSlot::available(MachineType::Dryer);
        assert!(matches!(
            expire(&slot, t0()),
            Err(ReservationError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_extend_restarts_cycle() {
        let complete = expire(&claimed(MachineType::Dryer, 3600), t0() + Duration::hours(1))
            .unwrap()
            .unwrap();
        let later = t0() + Duration::minutes(70);

        let extended = extend(&complete, &alice(), 1200, 2 * HOUR, later).unwrap();
        assert_eq!(extended.status, MachineStatus::InUse);
        assert_eq!(extended.start_timestamp, Some(later));
        assert_eq!(extended.cycle_duration_seconds, 1200);
        assert_eq!(extended.complete_timestamp, None);
        assert_eq!(extended.owner_id, complete.owner_id);
        assert_eq!(extended.owner_name, complete.owner_name);
    }

    #[test]
    fn test_extend_checks_owner_then_status() {
        let in_use = claimed(MachineType::Dryer, 3600);

        assert!(matches!(
            extend(&in_use, &bob(), 600, 2 * HOUR, t0()),
            Err(ReservationError::NotOwner { .. })
        ));
        assert!(matches!(
            extend(&in_use, &alice(), 600, 2 * HOUR, t0()),
            Err(ReservationError::InvalidTransition { operation: "extend", .. })
        ));
        assert!(matches!(
            extend(&MachineSlot::available(MachineType::Dryer), &alice(), 600, 2 * HOUR, t0()),
            Err(ReservationError::NotOwner { .. })
        ));
    }

    #[test]
    fn test_release_by_non_owner_fails() {
        let slot = claimed(MachineType::Dryer, 3600);

        let err = release(&slot, &bob()).unwrap_err();
        assert_eq!(
            err,
            ReservationError::NotOwner {
                machine: MachineType::Dryer,
                owner_name: "Alice".into(),
            }
        );
        assert!(slot.is_owned_by(&alice().id));
    }

    #[test]
    fn test_release_by_owner() {
        let slot = claimed(MachineType::Washer, 600);
        let released = release(&slot, &alice()).unwrap();
        assert_eq!(released, MachineSlot::available(MachineType::Washer));
    }

    #[test]
    fn test_release_available_names_nobody() {
        let slot = MachineSlot::available(MachineType::Washer);
        assert_eq!(
            release(&slot, &alice()).unwrap_err(),
            ReservationError::NotOwner {
                machine: MachineType::Washer,
                owner_name: "nobody".into(),
            }
        );
    }

    #[test]
    fn test_auto_release_window() {
        let t1 = t0() + Duration::seconds(1800);
        let complete = expire(&claimed(MachineType::Washer, 1800), t1)
            .unwrap()
            .unwrap();

        assert_eq!(
            auto_release(&complete, t1 + Duration::seconds(899), 900).unwrap_err(),
            ReservationError::AutoReleaseNotDue {
                machine: MachineType::Washer,
                remaining: 1,
            }
        );

        let released = auto_release(&complete, t1 + Duration::seconds(900), 900).unwrap();
        assert!(released.is_available());
        assert_eq!(released.owner_id, None);
    }

    #[test]
    fn test_auto_release_requires_complete() {
        let slot = claimed(MachineType::Washer, 1800);
        assert!(matches!(
            auto_release(&slot, t0() + Duration::hours(5), 900),
            Err(ReservationError::InvalidTransition { .. })
        ));
    }
}
