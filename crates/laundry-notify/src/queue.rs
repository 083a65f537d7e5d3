//! In-process alert queue

use laundry_api::Alert;
use laundry_util::AlertId;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone)]
struct QueuedAlert {
    alert: Alert,
    expires_at: Instant,
}

/// The most recent alerts, oldest first.
///
/// Holds at most `capacity` entries; each one is dropped `dismiss_after`
/// after it was queued, or earlier on explicit dismissal.
#[derive(Debug, Clone)]
pub struct AlertQueue {
    capacity: usize,
    dismiss_after: Duration,
    entries: VecDeque<QueuedAlert>,
}

impl AlertQueue {
    pub fn new(capacity: usize, dismiss_after: Duration) -> Self {
        Self {
            capacity: capacity.max(1),
            dismiss_after,
            entries: VecDeque::with_capacity(capacity.max(1)),
        }
    }

    /// Queue an alert, returning the oldest one if it had to make room
    pub fn push(&mut self, alert: Alert, now: Instant) -> Option<Alert> {
        let evicted = if self.entries.len() >= self.capacity {
            self.entries.pop_front().map(|q| q.alert)
        } else {
            None
        };

        debug!(alert_id = %alert.id, machine = %alert.machine, "Alert queued");
        self.entries.push_back(QueuedAlert {
            alert,
            expires_at: now + self.dismiss_after,
        });

        evicted
    }

    /// Dismiss one alert. Returns false if it was not queued.
    pub fn dismiss(&mut self, id: AlertId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|q| q.alert.id != id);
        self.entries.len() != before
    }

    /// Drop every alert whose display time has run out
    pub fn prune(&mut self, now: Instant) -> Vec<Alert> {
        let mut expired = Vec::new();
        self.entries.retain(|q| {
            if q.expires_at <= now {
                expired.push(q.alert.clone());
                false
            } else {
                true
            }
        });
        expired
    }

    pub fn active(&self) -> impl Iterator<Item = &Alert> {
        self.entries.iter().map(|q| &q.alert)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
