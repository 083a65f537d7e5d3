//! Reservation engine

use chrono::{DateTime, Utc};
use laundry_api::{Alert, ChangeRecord, Identity, MachineSlot, MachineStatus, MachineType};
use laundry_config::{NotificationPolicy, ReservationPolicy};
use laundry_store::{MachineStore, RowGuard, StoreError};
use laundry_util::{UserId, WriteCoalescer};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::notify::{
    auto_release_warning_alert, claim_lost_alert, cycle_complete_alert, cycle_warning_alert,
    foreign_complete_alert, released_alert,
};
use crate::{
    replication, slot, timing, ChangeOrigin, CoreEvent, CountdownReading, NotificationFlags,
    NotificationRules, ReservationError, ReservationResult,
};

/// Two-phase state for one machine
#[derive(Debug, Clone)]
struct SlotState {
    /// Last value seen from the store
    confirmed: MachineSlot,
    /// Local optimistic value, dropped when the store reports this machine
    tentative: Option<MachineSlot>,
    flags: NotificationFlags,
}

impl SlotState {
    fn new(machine: MachineType) -> Self {
        Self {
            confirmed: MachineSlot::available(machine),
            tentative: None,
            flags: NotificationFlags::default(),
        }
    }

    fn visible(&self) -> &MachineSlot {
        self.tentative.as_ref().unwrap_or(&self.confirmed)
    }
}

/// Owns the in-memory view of both machines.
///
/// Every mutation goes through an operation here; observers read
/// [`CountdownReading`]s.
pub struct ReservationEngine {
    store: Arc<dyn MachineStore>,
    policy: ReservationPolicy,
    rules: NotificationRules,
    local_user: Option<UserId>,
    washer: SlotState,
    dryer: SlotState,
    coalescer: WriteCoalescer<MachineType>,
}

impl ReservationEngine {
    /// Create an engine. `local_user` is `None` for the scheduler, which
    /// owns nothing and raises no owner alerts.
    pub fn new(
        store: Arc<dyn MachineStore>,
        policy: ReservationPolicy,
        notifications: &NotificationPolicy,
        local_user: Option<UserId>,
    ) -> Self {
        info!(
            window_secs = policy.auto_release_window.as_secs(),
            washer_max_secs = policy.washer.max_cycle.as_secs(),
            dryer_max_secs = policy.dryer.max_cycle.as_secs(),
            "Reservation engine initialized"
        );

        Self {
            store,
            coalescer: WriteCoalescer::new(policy.write_coalesce_interval),
            policy,
            rules: NotificationRules::from_policy(notifications),
            local_user,
            washer: SlotState::new(MachineType::Washer),
            dryer: SlotState::new(MachineType::Dryer),
        }
    }

    pub fn policy(&self) -> &ReservationPolicy {
        &self.policy
    }

    pub fn local_user(&self) -> Option<&UserId> {
        self.local_user.as_ref()
    }

    /// Current visible slot (tentative if present, else confirmed)
    pub fn slot(&self, machine: MachineType) -> &MachineSlot {
        self.state(machine).visible()
    }

    /// Last slot value confirmed by the store
    pub fn confirmed(&self, machine: MachineType) -> &MachineSlot {
        &self.state(machine).confirmed
    }

    pub fn has_tentative(&self, machine: MachineType) -> bool {
        self.state(machine).tentative.is_some()
    }

    pub fn readings(&self, now: DateTime<Utc>) -> Vec<CountdownReading> {
        MachineType::ALL
            .iter()
            .map(|&machine| {
                CountdownReading::from_slot(
                    self.slot(machine),
                    self.local_user.as_ref(),
                    now,
                    self.window_seconds(),
                )
            })
            .collect()
    }

    /// Store health, for status output
    pub fn store_healthy(&self) -> bool {
        self.store.is_healthy()
    }

    fn state(&self, machine: MachineType) -> &SlotState {
        match machine {
            MachineType::Washer => &self.washer,
            MachineType::Dryer => &self.dryer,
        }
    }

    fn state_mut(&mut self, machine: MachineType) -> &mut SlotState {
        match machine {
            MachineType::Washer => &mut self.washer,
            MachineType::Dryer => &mut self.dryer,
        }
    }

    fn window_seconds(&self) -> u64 {
        self.policy.auto_release_window.as_secs()
    }

    fn max_seconds(&self, machine: MachineType) -> u64 {
        self.policy.machine(machine).max_cycle.as_secs()
    }

    fn is_mine(&self, slot: &MachineSlot) -> bool {
        self.local_user
            .as_ref()
            .is_some_and(|id| slot.is_owned_by(id))
    }

    // Initial load

    /// Replace the whole view with a fresh fetch from the store.
    ///
    /// Rows that fail translation are skipped and their machine shows as
    /// available. Overdue cycles are completed at their projected end and the
    /// correction is written back.
    pub fn load(&mut self, now: DateTime<Utc>) -> ReservationResult<Vec<CoreEvent>> {
        let rows = self
            .store
            .fetch_all()
            .map_err(|e| ReservationError::FetchFailed(e.to_string()))?;

        self.washer = SlotState::new(MachineType::Washer);
        self.dryer = SlotState::new(MachineType::Dryer);

        let mut events = Vec::new();
        for row in &rows {
            let slot = match replication::translate(row) {
                Ok(slot) => slot,
                Err(e) => {
                    warn!(error = %e, machine = %row.machine_type, "Skipping unreadable machine row");
                    continue;
                }
            };

            let machine = slot.machine;
            let expected = replication::guard_for(&slot);
            let (slot, corrected) = self.project_completion(slot, now);
            if corrected {
                if let Err(e) = self.persist(&slot, &expected, now) {
                    events.extend(background_write_failed(e));
                }
            }

            let state = self.state_mut(machine);
            state.confirmed = slot.clone();
            if slot.status == MachineStatus::Complete {
                // Finished before we were watching
                state.flags.mark_completed();
            }

            events.push(CoreEvent::SlotChanged {
                machine,
                slot,
                origin: if corrected {
                    ChangeOrigin::Correction
                } else {
                    ChangeOrigin::Remote
                },
            });
        }

        info!(rows = rows.len(), "Machine state loaded");
        Ok(events)
    }

    /// Complete an in-use slot whose cycle is already over, at the instant
    /// it finished. Every observer computes the same completion timestamp.
    fn project_completion(&self, slot: MachineSlot, now: DateTime<Utc>) -> (MachineSlot, bool) {
        let Some(start) = slot.start_timestamp else {
            return (slot, false);
        };
        if slot.status != MachineStatus::InUse
            || !timing::is_expired(now, start, slot.cycle_duration_seconds)
        {
            return (slot, false);
        }

        let finished = timing::completion_instant(start, slot.cycle_duration_seconds);
        match slot::expire(&slot, finished) {
            Ok(Some(complete)) => {
                debug!(machine = %slot.machine, finished = %finished, "Completing overdue cycle");
                (complete, true)
            }
            _ => (slot, false),
        }
    }

    // User operations

    /// Reserve `machine` for `actor`
    pub fn claim(
        &mut self,
        machine: MachineType,
        actor: &Identity,
        duration_seconds: u64,
        now: DateTime<Utc>,
        now_mono: Instant,
    ) -> ReservationResult<Vec<CoreEvent>> {
        let current = self.slot(machine);
        let expected = replication::guard_for(current);
        let next = slot::claim(
            current,
            actor,
            duration_seconds,
            self.max_seconds(machine),
            now,
        )?;

        info!(
            machine = %machine,
            owner = %actor.name,
            duration_secs = duration_seconds,
            "Machine claimed"
        );
        self.commit(next, &expected, ChangeOrigin::Local, now, now_mono)
    }

    /// Give `machine` back
    pub fn release(
        &mut self,
        machine: MachineType,
        actor: &Identity,
        now: DateTime<Utc>,
        now_mono: Instant,
    ) -> ReservationResult<Vec<CoreEvent>> {
        let current = self.slot(machine);
        let expected = replication::guard_for(current);
        let next = slot::release(current, actor)?;

        info!(machine = %machine, owner = %actor.name, "Machine released");
        self.commit(next, &expected, ChangeOrigin::Local, now, now_mono)
    }

    /// Start another cycle on a finished machine
    pub fn extend(
        &mut self,
        machine: MachineType,
        actor: &Identity,
        duration_seconds: u64,
        now: DateTime<Utc>,
        now_mono: Instant,
    ) -> ReservationResult<Vec<CoreEvent>> {
        let current = self.slot(machine);
        let expected = replication::guard_for(current);
        let next = slot::extend(
            current,
            actor,
            duration_seconds,
            self.max_seconds(machine),
            now,
        )?;

        info!(
            machine = %machine,
            owner = %actor.name,
            duration_secs = duration_seconds,
            "Cycle extended"
        );
        self.commit(next, &expected, ChangeOrigin::Local, now, now_mono)
    }

    // System operations

    /// Mark a finished cycle complete at `now`. Empty when already complete.
    pub fn expire(
        &mut self,
        machine: MachineType,
        now: DateTime<Utc>,
        now_mono: Instant,
    ) -> ReservationResult<Vec<CoreEvent>> {
        let current = self.slot(machine);
        let expected = replication::guard_for(current);
        match slot::expire(current, now)? {
            Some(next) => {
                info!(machine = %machine, "Cycle complete");
                self.commit(next, &expected, ChangeOrigin::Countdown, now, now_mono)
            }
            None => Ok(Vec::new()),
        }
    }

    /// Free a machine whose pickup window has elapsed
    pub fn auto_release(
        &mut self,
        machine: MachineType,
        now: DateTime<Utc>,
        now_mono: Instant,
    ) -> ReservationResult<Vec<CoreEvent>> {
        let current = self.slot(machine);
        let expected = replication::guard_for(current);
        let previous_owner = current.owner_display().to_string();
        let next = slot::auto_release(current, now, self.window_seconds())?;

        info!(machine = %machine, previous_owner = %previous_owner, "Machine auto-released");
        self.commit(next, &expected, ChangeOrigin::Scheduler, now, now_mono)
    }

    /// Apply a transition locally, then write it guarded on `expected`.
    ///
    /// A failed write leaves the optimistic value in place; the next change
    /// record for the machine settles it.
    fn commit(
        &mut self,
        next: MachineSlot,
        expected: &RowGuard,
        origin: ChangeOrigin,
        now: DateTime<Utc>,
        now_mono: Instant,
    ) -> ReservationResult<Vec<CoreEvent>> {
        let events = self.apply_tentative(next.clone(), origin, now, now_mono);
        self.persist(&next, expected, now)?;
        Ok(events)
    }

    fn apply_tentative(
        &mut self,
        next: MachineSlot,
        origin: ChangeOrigin,
        now: DateTime<Utc>,
        now_mono: Instant,
    ) -> Vec<CoreEvent> {
        let machine = next.machine;
        let before = self.slot(machine).clone();

        self.state_mut(machine).tentative = Some(next.clone());
        if next.is_available() {
            self.coalescer.forget(&machine);
        } else {
            self.coalescer.record_transition(&machine, now_mono);
        }

        let mut events = vec![CoreEvent::SlotChanged {
            machine,
            slot: next.clone(),
            origin,
        }];
        events.extend(
            self.transition_alerts(&before, &next, origin, false, now)
                .into_iter()
                .map(CoreEvent::Alert),
        );
        events
    }

    fn persist(
        &self,
        slot: &MachineSlot,
        expected: &RowGuard,
        now: DateTime<Utc>,
    ) -> ReservationResult<()> {
        let row = replication::to_row(slot, now);
        self.store
            .write_guarded(&row, expected)
            .map_err(|e| ReservationError::StoreWriteFailed {
                machine: slot.machine,
                conflict: matches!(e, StoreError::Conflict { .. }),
                reason: e.to_string(),
            })
    }

    /// Update flags for a visible change and collect the alerts it raises
    fn transition_alerts(
        &mut self,
        before: &MachineSlot,
        after: &MachineSlot,
        origin: ChangeOrigin,
        local_release: bool,
        now: DateTime<Utc>,
    ) -> Vec<Alert> {
        let machine = after.machine;
        let window = self.window_seconds();
        let before_mine = self.is_mine(before);
        let after_mine = self.is_mine(after);
        let flags = &mut self.state_mut(machine).flags;
        let mut alerts = Vec::new();

        match after.status {
            MachineStatus::Available if !before.is_available() => {
                flags.reset();

                if before.status == MachineStatus::Complete
                    && origin == ChangeOrigin::Remote
                    && !local_release
                {
                    if let Some(previous_owner) = &before.owner_name {
                        let auto_release = before_mine
                            || before
                                .complete_timestamp
                                .is_some_and(|c| timing::is_auto_release_due(now, c, window));
                        alerts.push(released_alert(machine, previous_owner, auto_release, now));
                    }
                }
            }
            MachineStatus::InUse
                if before.status != MachineStatus::InUse
                    || before.start_timestamp != after.start_timestamp =>
            {
                flags.reset();
            }
            MachineStatus::Complete if before.status != MachineStatus::Complete => {
                if flags.mark_completed() {
                    alerts.push(if after_mine {
                        cycle_complete_alert(after, window, now)
                    } else {
                        foreign_complete_alert(after, now)
                    });
                }
            }
            _ => {}
        }

        alerts
    }

    // Replication

    /// Reconcile one change record into the view. The store always wins.
    pub fn apply_remote(&mut self, record: &ChangeRecord, now: DateTime<Utc>) -> Vec<CoreEvent> {
        let incoming = match &record.new {
            Some(row) => match replication::translate(row) {
                Ok(slot) => slot,
                Err(e) => {
                    warn!(error = %e, machine = %row.machine_type, "Skipping change record");
                    return Vec::new();
                }
            },
            None => match record.machine_type().map(str::parse::<MachineType>) {
                Some(Ok(machine)) => MachineSlot::available(machine),
                Some(Err(e)) => {
                    warn!(error = %e, "Skipping delete record");
                    return Vec::new();
                }
                None => return Vec::new(),
            },
        };

        let machine = incoming.machine;
        let mut events = Vec::new();

        let expected = replication::guard_for(&incoming);
        let (incoming, corrected) = self.project_completion(incoming, now);
        if corrected {
            if let Err(e) = self.persist(&incoming, &expected, now) {
                events.extend(background_write_failed(e));
            }
        }

        let state = self.state(machine);
        let before = state.visible().clone();
        let local_release = state.tentative.as_ref().is_some_and(|t| t.is_available());
        let lost_to = state
            .tentative
            .as_ref()
            .filter(|t| {
                t.status == MachineStatus::InUse
                    && self.is_mine(t)
                    && !self.is_mine(&state.confirmed)
            })
            .and_then(|_| incoming.owner_id.as_ref())
            .filter(|owner| Some(*owner) != self.local_user.as_ref())
            .map(|_| incoming.owner_display().to_string());

        let state = self.state_mut(machine);
        state.confirmed = incoming.clone();
        state.tentative = None;
        if incoming.is_available() {
            self.coalescer.forget(&machine);
        }

        if let Some(owner_name) = lost_to {
            info!(machine = %machine, owner = %owner_name, "Claim lost to another client");
            events.push(CoreEvent::Alert(claim_lost_alert(machine, &owner_name, now)));
        }

        if before == incoming {
            return events;
        }

        debug!(
            machine = %machine,
            from = %before.status,
            to = %incoming.status,
            "Applied change record"
        );

        let origin = if corrected {
            ChangeOrigin::Correction
        } else {
            ChangeOrigin::Remote
        };
        let alerts =
            self.transition_alerts(&before, &incoming, ChangeOrigin::Remote, local_release, now);
        events.push(CoreEvent::SlotChanged {
            machine,
            slot: incoming,
            origin,
        });
        events.extend(alerts.into_iter().map(CoreEvent::Alert));
        events
    }

    // Countdown

    /// One countdown step: complete finished cycles, raise threshold alerts
    /// for the local user's machines, and refresh their heartbeat.
    pub fn tick(&mut self, now: DateTime<Utc>, now_mono: Instant) -> Vec<CoreEvent> {
        let mut events = Vec::new();

        for machine in MachineType::ALL {
            let current = self.slot(machine).clone();
            let mine = self.is_mine(&current);

            match (current.status, current.start_timestamp, current.complete_timestamp) {
                (MachineStatus::InUse, Some(start), _) => {
                    let remaining = timing::remaining(now, start, current.cycle_duration_seconds);

                    if remaining == 0 {
                        if let Ok(Some(next)) = slot::expire(&current, now) {
                            info!(machine = %machine, owner = %current.owner_display(), "Cycle complete");
                            events.extend(self.apply_tentative(
                                next.clone(),
                                ChangeOrigin::Countdown,
                                now,
                                now_mono,
                            ));
                            let expected = replication::guard_for(&current);
                            if let Err(e) = self.persist(&next, &expected, now) {
                                events.extend(background_write_failed(e));
                            }
                        }
                        continue;
                    }

                    if !mine {
                        continue;
                    }

                    let due =
                        self.due_cycle_warning(machine, remaining, current.cycle_duration_seconds);
                    if let Some(threshold) = due {
                        info!(machine = %machine, threshold_secs = threshold, remaining_secs = remaining, "Cycle warning");
                        events.push(CoreEvent::Alert(cycle_warning_alert(
                            &current, threshold, remaining, now,
                        )));
                    }

                    self.heartbeat(machine, now, now_mono);
                }
                (MachineStatus::Complete, _, Some(complete)) if mine => {
                    let remaining =
                        timing::auto_release_remaining(now, complete, self.window_seconds());
                    let due = self.due_auto_release_warning(machine, remaining);
                    if let Some(threshold) = due {
                        info!(machine = %machine, threshold_secs = threshold, remaining_secs = remaining, "Auto-release warning");
                        events.push(CoreEvent::Alert(auto_release_warning_alert(
                            &current, threshold, remaining, now,
                        )));
                    }
                }
                _ => {}
            }
        }

        events
    }

    fn due_cycle_warning(&mut self, machine: MachineType, remaining: u64, duration: u64) -> Option<u64> {
        let state = match machine {
            MachineType::Washer => &mut self.washer,
            MachineType::Dryer => &mut self.dryer,
        };
        self.rules.due_cycle_warning(&mut state.flags, remaining, duration)
    }

    fn due_auto_release_warning(&mut self, machine: MachineType, remaining: u64) -> Option<u64> {
        let state = match machine {
            MachineType::Washer => &mut self.washer,
            MachineType::Dryer => &mut self.dryer,
        };
        self.rules.due_auto_release_warning(&mut state.flags, remaining)
    }

    /// Refresh `last_updated` on a confirmed reservation this client holds,
    /// at most once per coalescing interval
    fn heartbeat(&mut self, machine: MachineType, now: DateTime<Utc>, now_mono: Instant) {
        if self.has_tentative(machine) {
            return;
        }
        let Some(user) = self.local_user.clone() else {
            return;
        };
        if !self.coalescer.should_heartbeat(&machine, now_mono) {
            return;
        }

        match self.store.touch(machine.as_str(), user.as_str(), now) {
            Ok(true) => debug!(machine = %machine, "Heartbeat written"),
            Ok(false) => debug!(machine = %machine, "Heartbeat skipped, reservation changed"),
            Err(e) => warn!(machine = %machine, error = %e, "Heartbeat write failed"),
        }
    }
}

/// Background writes that lose a race are expected; the winner's row
/// arrives on the feed.
fn background_write_failed(err: ReservationError) -> Option<CoreEvent> {
    match err {
        ReservationError::StoreWriteFailed {
            machine,
            conflict: true,
            ..
        } => {
            debug!(machine = %machine, "Background write lost to another writer");
            None
        }
        ReservationError::StoreWriteFailed {
            machine, reason, ..
        } => {
            warn!(machine = %machine, reason = %reason, "Background write failed");
            Some(CoreEvent::WriteFailed { machine, reason })
        }
        other => {
            warn!(error = %other, "Background write failed");
            None
        }
    }
}
