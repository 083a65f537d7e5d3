//! Durable store row and change-feed record shapes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of the shared `machines` table, as stored.
///
/// Text fields stay untyped here: rows may be written by any client, so
/// turning them into a `MachineSlot` is a validating step of its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineRow {
    pub machine_type: String,
    pub status: String,
    pub user_name: Option<String>,
    pub user_id: Option<String>,
    pub start_timestamp: Option<DateTime<Utc>>,
    pub cycle_duration_seconds: i64,
    pub complete_timestamp: Option<DateTime<Utc>>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl MachineRow {
    /// Same row content, ignoring the `last_updated` write stamp
    pub fn same_state(&self, other: &MachineRow) -> bool {
        self.machine_type == other.machine_type
            && self.status == other.status
            && self.user_name == other.user_name
            && self.user_id == other.user_id
            && self.start_timestamp == other.start_timestamp
            && self.cycle_duration_seconds == other.cycle_duration_seconds
            && self.complete_timestamp == other.complete_timestamp
    }
}

/// Kind of change observed on the feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A change-feed event: the row before and after
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub kind: ChangeKind,
    pub new: Option<MachineRow>,
    pub old: Option<MachineRow>,
}

impl ChangeRecord {
    pub fn insert(new: MachineRow) -> Self {
        Self {
            kind: ChangeKind::Insert,
            new: Some(new),
            old: None,
        }
    }

    pub fn update(old: MachineRow, new: MachineRow) -> Self {
        Self {
            kind: ChangeKind::Update,
            new: Some(new),
            old: Some(old),
        }
    }

    pub fn delete(old: MachineRow) -> Self {
        Self {
            kind: ChangeKind::Delete,
            new: None,
            old: Some(old),
        }
    }

    /// Machine key of the affected row
    pub fn machine_type(&self) -> Option<&str> {
        self.new
            .as_ref()
            .or(self.old.as_ref())
            .map(|row| row.machine_type.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: &str) -> MachineRow {
        MachineRow {
            machine_type: "washer".into(),
            status: status.into(),
            user_name: None,
            user_id: None,
            start_timestamp: None,
            cycle_duration_seconds: 0,
            complete_timestamp: None,
            last_updated: None,
        }
    }

    #[test]
    fn same_state_ignores_write_stamp() {
        let a = row("available");
        let mut b = a.clone();
        b.last_updated = Some(Utc::now());
        assert!(a.same_state(&b));

        b.status = "in-use".into();
        assert!(!a.same_state(&b));
    }

    #[test]
    fn delete_record_keeps_machine_type() {
        let record = ChangeRecord::delete(row("complete"));
        assert_eq!(record.machine_type(), Some("washer"));
        assert!(record.new.is_none());
    }
}
