//! Store trait definitions

use chrono::{DateTime, Utc};
use laundry_api::{ChangeRecord, MachineRow, MachineStatus};
use std::fmt;
use tokio::sync::broadcast;

use crate::{StoreError, StoreResult};

/// What a guarded write expects the stored row to still hold
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowGuard {
    pub status: MachineStatus,
    /// Owner of the expected reservation; `None` accepts any
    pub user_id: Option<String>,
    /// Start of the expected reservation; `None` accepts any
    pub start_timestamp: Option<DateTime<Utc>>,
}

impl RowGuard {
    /// Any row in `status`
    pub fn status(status: MachineStatus) -> Self {
        Self {
            status,
            user_id: None,
            start_timestamp: None,
        }
    }

    /// The reservation `user_id` started at `start`, still in `status`
    pub fn reservation(
        status: MachineStatus,
        user_id: impl Into<String>,
        start: DateTime<Utc>,
    ) -> Self {
        Self {
            status,
            user_id: Some(user_id.into()),
            start_timestamp: Some(start),
        }
    }
}

impl fmt::Display for RowGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.status)?;
        if let Some(user_id) = &self.user_id {
            write!(f, " held by {user_id}")?;
        }
        if let Some(start) = &self.start_timestamp {
            write!(f, " since {start}")?;
        }
        Ok(())
    }
}

/// The shared machine table, as every client and the reaper see it
pub trait MachineStore: Send + Sync {
    // Reads

    /// Fetch every machine row
    fn fetch_all(&self) -> StoreResult<Vec<MachineRow>>;

    // Writes

    /// Overwrite the row keyed by `row.machine_type`
    fn update(&self, row: &MachineRow) -> StoreResult<()>;

    /// Overwrite the row only if it still matches `expected`.
    ///
    /// Returns `false` when another writer got there first.
    fn update_if(&self, row: &MachineRow, expected: &RowGuard) -> StoreResult<bool>;

    /// Guarded write that reports a lost race as [`StoreError::Conflict`]
    fn write_guarded(&self, row: &MachineRow, expected: &RowGuard) -> StoreResult<()> {
        if self.update_if(row, expected)? {
            Ok(())
        } else {
            Err(StoreError::Conflict {
                machine_type: row.machine_type.clone(),
                expected: expected.to_string(),
            })
        }
    }

    /// Refresh `last_updated` on an in-use row still owned by `user_id`.
    ///
    /// Returns `false` when the row has changed hands or finished.
    fn touch(&self, machine_type: &str, user_id: &str, at: DateTime<Utc>) -> StoreResult<bool>;

    // Change feed

    /// Subscribe to change records
    fn subscribe(&self) -> broadcast::Receiver<ChangeRecord>;

    /// Compare the table against the last observed state and publish the
    /// differences to subscribers. Returns the records published.
    fn poll_changes(&self) -> StoreResult<Vec<ChangeRecord>>;

    // Health

    /// Check if store is healthy
    fn is_healthy(&self) -> bool;
}
