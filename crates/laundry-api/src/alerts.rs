//! Alerts raised for people watching the machines

use chrono::{DateTime, Utc};
use laundry_util::AlertId;
use serde::{Deserialize, Serialize};

use crate::MachineType;

/// Alert severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Info,
    Warn,
    Critical,
}

/// Who an alert is meant for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertAudience {
    /// Only the owner of the reservation; may go out as a system notification
    Owner,
    /// Informational, shown to every client in-process
    Everyone,
}

/// What happened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AlertKind {
    /// Own cycle is about to finish
    CycleWarning { threshold_seconds: u64 },
    /// Own cycle finished
    CycleComplete,
    /// Own laundry is about to be auto-released
    AutoReleaseWarning { threshold_seconds: u64 },
    /// Someone else's cycle finished
    ForeignComplete { owner_name: String },
    /// A reservation ended without a local release
    Released {
        previous_owner: String,
        auto_release: bool,
    },
    /// A local claim was beaten by another client
    ClaimLost { owner_name: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub id: AlertId,
    pub machine: MachineType,
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub audience: AlertAudience,
    pub title: String,
    pub body: String,
    pub raised_at: DateTime<Utc>,
}

impl Alert {
    pub fn new(
        machine: MachineType,
        kind: AlertKind,
        severity: AlertSeverity,
        audience: AlertAudience,
        title: impl Into<String>,
        body: impl Into<String>,
        raised_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AlertId::next(),
            machine,
            kind,
            severity,
            audience,
            title: title.into(),
            body: body.into(),
            raised_at,
        }
    }
}
