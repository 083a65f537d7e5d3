//! Translation between wire rows and slots

use chrono::{DateTime, Utc};
use laundry_api::{
    InvariantViolation, MachineRow, MachineSlot, MachineStatus, MachineType, UnknownMachine,
    UnknownStatus,
};
use laundry_store::RowGuard;
use laundry_util::UserId;
use thiserror::Error;

/// A row that cannot be turned into a slot
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslateError {
    #[error(transparent)]
    UnknownMachine(#[from] UnknownMachine),

    #[error(transparent)]
    UnknownStatus(#[from] UnknownStatus),

    #[error("{machine} row has negative cycle duration {seconds}")]
    NegativeDuration { machine: MachineType, seconds: i64 },

    #[error("{machine} row is inconsistent: {violation}")]
    Invariant {
        machine: MachineType,
        violation: InvariantViolation,
    },
}

/// Turn a wire row into a validated slot.
///
/// Available rows are normalized to a clean slot once validated, so stale
/// display fields left by other writers do not leak through.
pub fn translate(row: &MachineRow) -> Result<MachineSlot, TranslateError> {
    let machine: MachineType = row.machine_type.parse()?;
    let status: MachineStatus = row.status.parse()?;

    let cycle_duration_seconds = u64::try_from(row.cycle_duration_seconds).map_err(|_| {
        TranslateError::NegativeDuration {
            machine,
            seconds: row.cycle_duration_seconds,
        }
    })?;

    let slot = MachineSlot {
        machine,
        status,
        owner_id: row.user_id.clone().map(UserId::new),
        owner_name: row.user_name.clone(),
        start_timestamp: row.start_timestamp,
        cycle_duration_seconds,
        complete_timestamp: row.complete_timestamp,
    };

    slot.check_invariants()
        .map_err(|violation| TranslateError::Invariant { machine, violation })?;

    if slot.is_available() {
        return Ok(MachineSlot::available(machine));
    }
    Ok(slot)
}

/// The row to write for a slot, stamped with `now`
pub fn to_row(slot: &MachineSlot, now: DateTime<Utc>) -> MachineRow {
    MachineRow {
        machine_type: slot.machine.as_str().to_string(),
        status: slot.status.as_str().to_string(),
        user_name: slot.owner_name.clone(),
        user_id: slot.owner_id.as_ref().map(|id| id.as_str().to_string()),
        start_timestamp: slot.start_timestamp,
        cycle_duration_seconds: slot.cycle_duration_seconds as i64,
        complete_timestamp: slot.complete_timestamp,
        last_updated: Some(now),
    }
}

/// What the store must still hold for a write replacing `slot` to land.
///
/// A held slot is pinned to its owner and start, so a stale view of an
/// old reservation cannot overwrite a newer one in the same status.
pub fn guard_for(slot: &MachineSlot) -> RowGuard {
    match (&slot.owner_id, slot.start_timestamp) {
        (Some(owner), Some(start)) if !slot.is_available() => {
            RowGuard::reservation(slot.status, owner.as_str(), start)
        }
        _ => RowGuard::status(slot.status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
    }

    fn row(machine: &str, status: &str) -> MachineRow {
        MachineRow {
            machine_type: machine.into(),
            status: status.into(),
            user_name: Some("Alice".into()),
            user_id: Some("alice-id".into()),
            start_timestamp: Some(t0()),
            cycle_duration_seconds: 1800,
            complete_timestamp: None,
            last_updated: Some(t0()),
        }
    }

    #[test]
    fn test_translate_in_use() {
        let slot = translate(&row("washer", "in-use")).unwrap();
        assert_eq!(slot.machine, MachineType::Washer);
        assert_eq!(slot.status, MachineStatus::InUse);
        assert_eq!(slot.owner_id, Some(UserId::new("alice-id")));
        assert_eq!(slot.cycle_duration_seconds, 1800);

        assert_eq!(translate(&to_row(&slot, t0())).unwrap(), slot);
    }

    #[test]
    fn test_translate_rejects_unknown_fields() {
        assert!(matches!(
            translate(&row("mangle", "in-use")),
            Err(TranslateError::UnknownMachine(_))
        ));
        assert!(matches!(
            translate(&row("washer", "broken")),
            Err(TranslateError::UnknownStatus(_))
        ));
    }

    #[test]
    fn test_translate_rejects_inconsistent_rows() {
        // complete without a complete timestamp
        assert!(matches!(
            translate(&row("dryer", "complete")),
            Err(TranslateError::Invariant {
                violation: InvariantViolation::MissingCompletion,
                ..
            })
        ));

        let mut negative = row("dryer", "in-use");
        negative.cycle_duration_seconds = -5;
        assert!(matches!(
            translate(&negative),
            Err(TranslateError::NegativeDuration { seconds: -5, .. })
        ));
    }

    #[test]
    fn test_available_row_is_normalized() {
        let mut stale = row("dryer", "available");
        stale.user_id = None;
        stale.start_timestamp = None;

        let slot = translate(&stale).unwrap();
        assert_eq!(slot, MachineSlot::available(MachineType::Dryer));
    }

    #[test]
    fn test_guard_pins_held_reservation() {
        let slot = translate(&row("washer", "in-use")).unwrap();
        assert_eq!(
            guard_for(&slot),
            RowGuard::reservation(MachineStatus::InUse, "alice-id", t0())
        );

        let free = MachineSlot::available(MachineType::Washer);
        assert_eq!(guard_for(&free), RowGuard::status(MachineStatus::Available));
    }

    #[test]
    fn test_to_row_wire_strings() {
        let slot = MachineSlot::available(MachineType::Dryer);
        let row = to_row(&slot, t0());
        assert_eq!(row.machine_type, "dryer");
        assert_eq!(row.status, "available");
        assert_eq!(row.cycle_duration_seconds, 0);
        assert_eq!(row.last_updated, Some(t0()));
    }
}
