//! Auto-release scheduler pass

use chrono::{DateTime, Utc};
use laundry_api::{MachineStatus, MachineType};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::{timing, ChangeOrigin, CoreEvent, ReservationEngine, ReservationError, ReservationResult};

/// What one scheduler pass did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReapReport {
    /// Overdue cycles marked complete
    pub completed: Vec<MachineType>,
    /// Machines returned to available
    pub released: Vec<MachineType>,
    /// Writes that failed for reasons other than a lost race
    pub failed: Vec<(MachineType, String)>,
}

impl ReapReport {
    pub fn is_empty(&self) -> bool {
        self.completed.is_empty() && self.released.is_empty() && self.failed.is_empty()
    }
}

/// Reload the store, complete overdue cycles at their projected end and
/// auto-release machines whose pickup window has elapsed.
///
/// Every write is guarded, so a claim or extend racing the pass wins.
pub fn reap(
    engine: &mut ReservationEngine,
    now: DateTime<Utc>,
    now_mono: Instant,
) -> ReservationResult<ReapReport> {
    let mut report = ReapReport::default();

    for event in engine.load(now)? {
        match event {
            CoreEvent::SlotChanged {
                machine,
                origin: ChangeOrigin::Correction,
                ..
            } => report.completed.push(machine),
            CoreEvent::WriteFailed { machine, reason } => report.failed.push((machine, reason)),
            _ => {}
        }
    }

    let window = engine.policy().auto_release_window.as_secs();
    for machine in MachineType::ALL {
        let slot = engine.slot(machine);
        let due = slot.status == MachineStatus::Complete
            && slot
                .complete_timestamp
                .is_some_and(|c| timing::is_auto_release_due(now, c, window));
        if !due {
            continue;
        }

        match engine.auto_release(machine, now, now_mono) {
            Ok(_) => report.released.push(machine),
            Err(ReservationError::StoreWriteFailed { conflict: true, .. }) => {
                debug!(machine = %machine, "Auto-release lost to a concurrent change");
            }
            Err(ReservationError::StoreWriteFailed { reason, .. }) => {
                warn!(machine = %machine, reason = %reason, "Auto-release write failed");
                report.failed.push((machine, reason));
            }
            Err(e) => warn!(machine = %machine, error = %e, "Auto-release refused"),
        }
    }

    if !report.is_empty() {
        info!(
            completed = report.completed.len(),
            released = report.released.len(),
            failed = report.failed.len(),
            "Scheduler pass finished"
        );
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replication::to_row;
    use chrono::{Duration, TimeZone};
    use laundry_api::{MachineSlot, MachineStatus};
    use laundry_config::LaundryConfig;
    use laundry_store::{MachineStore, SqliteMachineStore};
    use laundry_util::UserId;
    use std::sync::Arc;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
    }

    fn setup() -> (Arc<SqliteMachineStore>, ReservationEngine) {
        let store = Arc::new(SqliteMachineStore::in_memory().unwrap());
        let config = LaundryConfig::default();
        let engine = ReservationEngine::new(
            store.clone(),
            config.reservations,
            &config.notifications,
            None,
        );
        (store, engine)
    }

    fn in_use(machine: MachineType, secs: u64) -> MachineSlot {
        MachineSlot {
            machine,
            status: MachineStatus::InUse,
            owner_id: Some(UserId::new("alice-id")),
            owner_name: Some("Alice".into()),
            start_timestamp: Some(t0()),
            cycle_duration_seconds: secs,
            complete_timestamp: None,
        }
    }

    fn stored(store: &SqliteMachineStore, machine: MachineType) -> MachineSlot {
        let row = store
            .fetch_all()
            .unwrap()
            .into_iter()
            .find(|r| r.machine_type == machine.as_str())
            .unwrap();
        crate::replication::translate(&row).unwrap()
    }

    #[test]
    fn test_nothing_to_do() {
        let (_store, mut engine) = setup();
        assert!(reap(&mut engine, t0(), Instant::now()).unwrap().is_empty());
    }

    #[test]
    fn test_overdue_cycle_completed_at_projection() {
        let (store, mut engine) = setup();
        store.update(&to_row(&in_use(MachineType::Washer, 1800), t0())).unwrap();

        let report = reap(&mut engine, t0() + Duration::seconds(2000), Instant::now()).unwrap();
        assert_eq!(report.completed, vec![MachineType::Washer]);
        assert!(report.released.is_empty());

        let washer = stored(&store, MachineType::Washer);
        assert_eq!(washer.status, MachineStatus::Complete);
        assert_eq!(washer.complete_timestamp, Some(t0() + Duration::seconds(1800)));
    }

    #[test]
    fn test_complete_and_release_in_one_pass() {
        let (store, mut engine) = setup();
        store.update(&to_row(&in_use(MachineType::Dryer, 600), t0())).unwrap();

        // Cycle ended at +600, window of 900 ended at +1500
        let report = reap(&mut engine, t0() + Duration::seconds(1500), Instant::now()).unwrap();
        assert_eq!(report.completed, vec![MachineType::Dryer]);
        assert_eq!(report.released, vec![MachineType::Dryer]);

        assert!(stored(&store, MachineType::Dryer).is_available());
    }

    #[test]
    fn test_window_not_yet_elapsed() {
        let (store, mut engine) = setup();
        let done = t0() + Duration::seconds(600);
        let complete = MachineSlot {
            status: MachineStatus::Complete,
            complete_timestamp: Some(done),
            ..in_use(MachineType::Washer, 600)
        };
        store.update(&to_row(&complete, done)).unwrap();

        let report = reap(&mut engine, done + Duration::seconds(899), Instant::now()).unwrap();
        assert!(report.is_empty());
        assert_eq!(stored(&store, MachineType::Washer), complete);

        let report = reap(&mut engine, done + Duration::seconds(900), Instant::now()).unwrap();
        assert_eq!(report.released, vec![MachineType::Washer]);
    }
}
