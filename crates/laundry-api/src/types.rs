//! Machine, slot and identity types

use chrono::{DateTime, Utc};
use laundry_util::UserId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The two shared machines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MachineType {
    Washer,
    Dryer,
}

impl MachineType {
    pub const ALL: [MachineType; 2] = [MachineType::Washer, MachineType::Dryer];

    /// Key used in the durable store
    pub fn as_str(&self) -> &'static str {
        match self {
            MachineType::Washer => "washer",
            MachineType::Dryer => "dryer",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MachineType::Washer => "Washer",
            MachineType::Dryer => "Dryer",
        }
    }
}

impl fmt::Display for MachineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown machine type: {0}")]
pub struct UnknownMachine(pub String);

impl FromStr for MachineType {
    type Err = UnknownMachine;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "washer" => Ok(MachineType::Washer),
            "dryer" => Ok(MachineType::Dryer),
            other => Err(UnknownMachine(other.to_string())),
        }
    }
}

/// Lifecycle status of a machine slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MachineStatus {
    Available,
    InUse,
    Complete,
}

impl MachineStatus {
    /// Wire representation in the durable store
    pub fn as_str(&self) -> &'static str {
        match self {
            MachineStatus::Available => "available",
            MachineStatus::InUse => "in-use",
            MachineStatus::Complete => "complete",
        }
    }
}

impl fmt::Display for MachineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown machine status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for MachineStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(MachineStatus::Available),
            "in-use" => Ok(MachineStatus::InUse),
            "complete" => Ok(MachineStatus::Complete),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// A person using the machines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: UserId,
    pub name: String,
}

impl Identity {
    pub fn new(id: impl Into<UserId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Broken slot invariant
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("available slot still carries an owner or start timestamp")]
    AvailableWithReservation,

    #[error("{0} slot has no owner")]
    MissingOwner(MachineStatus),

    #[error("{0} slot has no start timestamp")]
    MissingStart(MachineStatus),

    #[error("{0} slot has a zero cycle duration")]
    ZeroDuration(MachineStatus),

    #[error("complete slot has no complete timestamp")]
    MissingCompletion,

    #[error("complete timestamp precedes the end of the cycle")]
    CompletedEarly,

    #[error("{0} slot carries a complete timestamp")]
    UnexpectedCompletion(MachineStatus),
}

/// State of one physical machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineSlot {
    pub machine: MachineType,
    pub status: MachineStatus,
    pub owner_id: Option<UserId>,
    pub owner_name: Option<String>,
    pub start_timestamp: Option<DateTime<Utc>>,
    /// Fixed at claim/extend time; 0 while available
    pub cycle_duration_seconds: u64,
    pub complete_timestamp: Option<DateTime<Utc>>,
}

impl MachineSlot {
    /// An unreserved slot
    pub fn available(machine: MachineType) -> Self {
        Self {
            machine,
            status: MachineStatus::Available,
            owner_id: None,
            owner_name: None,
            start_timestamp: None,
            cycle_duration_seconds: 0,
            complete_timestamp: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.status == MachineStatus::Available
    }

    pub fn is_owned_by(&self, id: &UserId) -> bool {
        self.owner_id.as_ref() == Some(id)
    }

    /// Display name of the owner, or a placeholder
    pub fn owner_display(&self) -> &str {
        self.owner_name.as_deref().unwrap_or("nobody")
    }

    /// Check the data model invariants
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        match self.status {
            MachineStatus::Available => {
                if self.owner_id.is_some() || self.start_timestamp.is_some() {
                    return Err(InvariantViolation::AvailableWithReservation);
                }
                Ok(())
            }
            status => {
                if self.owner_id.is_none() {
                    return Err(InvariantViolation::MissingOwner(status));
                }
                let start = self
                    .start_timestamp
                    .ok_or(InvariantViolation::MissingStart(status))?;
                if self.cycle_duration_seconds == 0 {
                    return Err(InvariantViolation::ZeroDuration(status));
                }

                if status == MachineStatus::Complete {
                    let complete = self
                        .complete_timestamp
                        .ok_or(InvariantViolation::MissingCompletion)?;
                    let cycle_end =
                        start + chrono::Duration::seconds(self.cycle_duration_seconds as i64);
                    if complete < cycle_end {
                        return Err(InvariantViolation::CompletedEarly);
                    }
                } else if self.complete_timestamp.is_some() {
                    return Err(InvariantViolation::UnexpectedCompletion(status));
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
    }

    fn in_use() -> MachineSlot {
        MachineSlot {
            machine: MachineType::Washer,
            status: MachineStatus::InUse,
            owner_id: Some(UserId::new("a")),
            owner_name: Some("Alice".into()),
            start_timestamp: Some(t0()),
            cycle_duration_seconds: 1800,
            complete_timestamp: None,
        }
    }

    #[test]
    fn machine_type_parsing() {
        assert_eq!("washer".parse::<MachineType>().unwrap(), MachineType::Washer);
        assert_eq!(" Dryer ".parse::<MachineType>().unwrap(), MachineType::Dryer);
        assert!("iron".parse::<MachineType>().is_err());
    }

    #[test]
    fn status_wire_strings() {
        for status in [
            MachineStatus::Available,
            MachineStatus::InUse,
            MachineStatus::Complete,
        ] {
            assert_eq!(status.as_str().parse::<MachineStatus>().unwrap(), status);
        }
        assert_eq!(
            serde_json::to_string(&MachineStatus::InUse).unwrap(),
            "\"in-use\""
        );
    }

    #[test]
    fn available_slot_is_valid() {
        assert!(MachineSlot::available(MachineType::Dryer).check_invariants().is_ok());
    }

    #[test]
    fn in_use_slot_is_valid() {
        assert!(in_use().check_invariants().is_ok());
    }

    #[test]
    fn available_with_owner_is_rejected() {
        let mut slot = MachineSlot::available(MachineType::Washer);
        slot.owner_id = Some(UserId::new("a"));
        assert_eq!(
            slot.check_invariants(),
            Err(InvariantViolation::AvailableWithReservation)
        );
    }

    #[test]
    fn early_completion_is_rejected() {
        let mut slot = in_use();
        slot.status = MachineStatus::Complete;
        slot.complete_timestamp = Some(t0() + chrono::Duration::seconds(1799));
        assert_eq!(slot.check_invariants(), Err(InvariantViolation::CompletedEarly));

        slot.complete_timestamp = Some(t0() + chrono::Duration::seconds(1800));
        assert!(slot.check_invariants().is_ok());
    }

    #[test]
    fn in_use_without_start_is_rejected() {
        let mut slot = in_use();
        slot.start_timestamp = None;
        assert_eq!(
            slot.check_invariants(),
            Err(InvariantViolation::MissingStart(MachineStatus::InUse))
        );
    }
}
