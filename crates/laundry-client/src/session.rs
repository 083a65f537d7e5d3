//! One interactive client: the engine, the local identity and alert routing

use chrono::{DateTime, Utc};
use laundry_api::{ChangeRecord, Identity, MachineStatus};
use laundry_core::{CoreEvent, CountdownReading, ReservationEngine, ReservationError};
use laundry_notify::{AlertCenter, Delivery};
use laundry_util::{format_clock_time, format_countdown};
use std::time::Instant;
use tracing::{debug, info};

use crate::Command;

/// What the loop should do after a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Print these lines and keep going
    Continue(Vec<String>),
    Quit,
}

/// Owns the engine for the lifetime of the client loop
pub struct ClientSession {
    engine: ReservationEngine,
    identity: Identity,
    alerts: AlertCenter,
}

impl ClientSession {
    pub fn new(engine: ReservationEngine, identity: Identity, alerts: AlertCenter) -> Self {
        Self {
            engine,
            identity,
            alerts,
        }
    }

    pub fn engine(&self) -> &ReservationEngine {
        &self.engine
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn alerts(&self) -> &AlertCenter {
        &self.alerts
    }

    /// Refetch everything, e.g. after the feed lagged
    pub async fn reload(
        &mut self,
        now: DateTime<Utc>,
        now_mono: Instant,
    ) -> Result<Vec<String>, ReservationError> {
        let events = self.engine.load(now)?;
        Ok(self.dispatch(events, now_mono).await)
    }

    pub async fn tick(&mut self, now: DateTime<Utc>, now_mono: Instant) -> Vec<String> {
        let events = self.engine.tick(now, now_mono);
        let lines = self.dispatch(events, now_mono).await;

        for alert in self.alerts.prune(now_mono) {
            debug!(alert_id = %alert.id, "Alert auto-dismissed");
        }
        lines
    }

    pub async fn apply_remote(
        &mut self,
        record: &ChangeRecord,
        now: DateTime<Utc>,
        now_mono: Instant,
    ) -> Vec<String> {
        let events = self.engine.apply_remote(record, now);
        self.dispatch(events, now_mono).await
    }

    /// Route engine events: alerts to the alert center, write failures to
    /// the terminal. Returns lines to print.
    pub async fn dispatch(&mut self, events: Vec<CoreEvent>, now_mono: Instant) -> Vec<String> {
        let mut lines = Vec::new();

        for event in events {
            match event {
                CoreEvent::SlotChanged {
                    machine,
                    slot,
                    origin,
                } => {
                    debug!(machine = %machine, status = %slot.status, ?origin, "Slot changed");
                }
                CoreEvent::Alert(alert) => {
                    let line = format!("[{}] {}: {}", alert.id, alert.title, alert.body);
                    if self.alerts.raise(alert, now_mono).await == Delivery::Queued {
                        lines.push(line);
                    }
                }
                CoreEvent::WriteFailed { machine, reason } => {
                    lines.push(format!("Could not save the {machine} change: {reason}"));
                }
            }
        }

        lines
    }

    pub async fn execute(
        &mut self,
        command: Command,
        now: DateTime<Utc>,
        now_mono: Instant,
    ) -> Outcome {
        let result = match command {
            Command::Quit => return Outcome::Quit,
            Command::Help => return Outcome::Continue(vec![crate::HELP.to_string()]),
            Command::Status => return Outcome::Continue(self.status_lines(now)),
            Command::Alerts => return Outcome::Continue(self.alert_lines()),
            Command::Dismiss { id } => {
                let line = if self.alerts.dismiss(id) {
                    format!("Dismissed alert {id}.")
                } else {
                    format!("No active alert {id}.")
                };
                return Outcome::Continue(vec![line]);
            }
            Command::Claim { machine, minutes } => {
                let minutes = minutes.unwrap_or_else(|| {
                    self.engine.policy().machine(machine).default_cycle.as_secs() / 60
                });
                self.engine
                    .claim(machine, &self.identity, minutes.saturating_mul(60), now, now_mono)
                    .map(|events| {
                        (
                            events,
                            format!("Claimed the {machine} for {minutes} minutes."),
                        )
                    })
            }
            Command::Release { machine } => self
                .engine
                .release(machine, &self.identity, now, now_mono)
                .map(|events| (events, format!("Released the {machine}."))),
            Command::Extend { machine, minutes } => self
                .engine
                .extend(machine, &self.identity, minutes.saturating_mul(60), now, now_mono)
                .map(|events| {
                    (
                        events,
                        format!("Started another {minutes} minute {machine} cycle."),
                    )
                }),
        };

        match result {
            Ok((events, done)) => {
                let mut lines = vec![done];
                lines.extend(self.dispatch(events, now_mono).await);
                Outcome::Continue(lines)
            }
            Err(e) => {
                info!(error = %e, "Command refused");
                Outcome::Continue(vec![describe_error(&e)])
            }
        }
    }

    pub fn status_lines(&self, now: DateTime<Utc>) -> Vec<String> {
        let mut lines: Vec<String> = self
            .engine
            .readings(now)
            .iter()
            .map(|reading| self.status_line(reading, now))
            .collect();

        if !self.engine.store_healthy() {
            lines.push("Warning: the shared store is not responding.".to_string());
        }
        lines
    }

    fn status_line(&self, reading: &CountdownReading, now: DateTime<Utc>) -> String {
        let label = &self.engine.policy().machine(reading.machine).label;
        let owner = match (&reading.owner_name, reading.mine) {
            (Some(name), true) => format!("{name} (you)"),
            (Some(name), false) => name.clone(),
            (None, _) => String::new(),
        };

        match (
            reading.status,
            reading.remaining_seconds,
            reading.auto_release_remaining_seconds,
        ) {
            (MachineStatus::InUse, Some(remaining), _) => {
                let finishes = now + chrono::Duration::seconds(remaining as i64);
                format!(
                    "{label:<8} in use    {owner:<16} {} left, done at {}",
                    format_countdown(remaining),
                    format_clock_time(&finishes)
                )
            }
            (MachineStatus::Complete, _, Some(window)) => format!(
                "{label:<8} complete  {owner:<16} pick up within {}",
                format_countdown(window)
            ),
            _ => format!("{label:<8} available"),
        }
    }

    fn alert_lines(&self) -> Vec<String> {
        let lines: Vec<String> = self
            .alerts
            .queue()
            .active()
            .map(|alert| format!("[{}] {}: {}", alert.id, alert.title, alert.body))
            .collect();

        if lines.is_empty() {
            vec!["No active alerts.".to_string()]
        } else {
            lines
        }
    }
}

/// User-facing wording for a refused command
pub fn describe_error(err: &ReservationError) -> String {
    match err {
        ReservationError::StoreWriteFailed {
            machine,
            conflict: true,
            ..
        } => format!("Someone else changed the {machine} first. Check status and retry."),
        ReservationError::StoreWriteFailed { machine, .. } => {
            format!("Could not save the {machine} change. Please retry.")
        }
        other => {
            let text = other.to_string();
            let mut chars = text.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>() + ".",
                None => text,
            }
        }
    }
}
