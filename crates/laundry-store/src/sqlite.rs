//! SQLite-based store implementation

use chrono::{DateTime, SecondsFormat, Utc};
use laundry_api::{ChangeRecord, MachineRow, MachineStatus, MachineType};
use rusqlite::{params, Connection};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::{MachineStore, RowGuard, StoreError, StoreResult};

/// Change records buffered per subscriber before the oldest are dropped
const FEED_CAPACITY: usize = 64;

/// Other processes may hold the write lock briefly
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SELECT_ROWS: &str = "SELECT machine_type, status, user_name, user_id, start_timestamp, \
     cycle_duration_seconds, complete_timestamp, last_updated \
     FROM machines ORDER BY machine_type";

/// SQLite-based machine store.
///
/// Several processes may open the same file; each one observes the others'
/// writes through [`MachineStore::poll_changes`].
pub struct SqliteMachineStore {
    conn: Mutex<Connection>,
    feed_tx: broadcast::Sender<ChangeRecord>,
    /// Rows as of the last poll, keyed by machine type
    last_seen: Mutex<BTreeMap<String, MachineRow>>,
}

impl SqliteMachineStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        // journal_mode answers with a row, so it cannot go through execute
        conn.query_row("PRAGMA journal_mode=WAL", [], |_| Ok(()))?;

        info!(path = %path.display(), "Opened machine store");
        Self::with_connection(conn)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        let (feed_tx, _) = broadcast::channel(FEED_CAPACITY);
        let store = Self {
            conn: Mutex::new(conn),
            feed_tx,
            last_seen: Mutex::new(BTreeMap::new()),
        };
        store.init_schema()?;

        let rows = store.fetch_all()?;
        *store.last_seen.lock().unwrap() = rows
            .into_iter()
            .map(|row| (row.machine_type.clone(), row))
            .collect();

        Ok(store)
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute_batch(
            r#"
            -- One row per machine
            CREATE TABLE IF NOT EXISTS machines (
                machine_type TEXT PRIMARY KEY,
                status TEXT NOT NULL DEFAULT 'available',
                user_name TEXT,
                user_id TEXT,
                start_timestamp TEXT,
                cycle_duration_seconds INTEGER NOT NULL DEFAULT 0,
                complete_timestamp TEXT,
                last_updated TEXT
            );
            "#,
        )?;

        let stamp = format_timestamp(&laundry_util::now());
        for machine in MachineType::ALL {
            let seeded = conn.execute(
                "INSERT OR IGNORE INTO machines (machine_type, status, last_updated) VALUES (?, ?, ?)",
                params![machine.as_str(), MachineStatus::Available.as_str(), stamp],
            )?;
            if seeded > 0 {
                debug!(machine = %machine, "Seeded machine row");
            }
        }

        debug!("Store schema initialized");
        Ok(())
    }
}

impl MachineStore for SqliteMachineStore {
    fn fetch_all(&self) -> StoreResult<Vec<MachineRow>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(SELECT_ROWS)?;

        let rows = stmt.query_map([], |row| {
            Ok(StoredRow {
                machine_type: row.get(0)?,
                status: row.get(1)?,
                user_name: row.get(2)?,
                user_id: row.get(3)?,
                start_timestamp: row.get(4)?,
                cycle_duration_seconds: row.get(5)?,
                complete_timestamp: row.get(6)?,
                last_updated: row.get(7)?,
            })
        })?;

        let mut machines = Vec::new();
        for row in rows {
            machines.push(row?.into_row()?);
        }
        Ok(machines)
    }

    fn update(&self, row: &MachineRow) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE machines SET status = ?2, user_name = ?3, user_id = ?4, start_timestamp = ?5, \
             cycle_duration_seconds = ?6, complete_timestamp = ?7, last_updated = ?8 \
             WHERE machine_type = ?1",
            params![
                row.machine_type,
                row.status,
                row.user_name,
                row.user_id,
                row.start_timestamp.as_ref().map(format_timestamp),
                row.cycle_duration_seconds,
                row.complete_timestamp.as_ref().map(format_timestamp),
                row.last_updated.as_ref().map(format_timestamp),
            ],
        )?;

        if changed == 0 {
            return Err(StoreError::NotFound(row.machine_type.clone()));
        }

        debug!(machine = %row.machine_type, status = %row.status, "Machine row written");
        Ok(())
    }

    fn update_if(&self, row: &MachineRow, expected: &RowGuard) -> StoreResult<bool> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE machines SET status = ?2, user_name = ?3, user_id = ?4, start_timestamp = ?5, \
             cycle_duration_seconds = ?6, complete_timestamp = ?7, last_updated = ?8 \
             WHERE machine_type = ?1 AND status = ?9 \
             AND (?10 IS NULL OR user_id = ?10) \
             AND (?11 IS NULL OR start_timestamp = ?11)",
            params![
                row.machine_type,
                row.status,
                row.user_name,
                row.user_id,
                row.start_timestamp.as_ref().map(format_timestamp),
                row.cycle_duration_seconds,
                row.complete_timestamp.as_ref().map(format_timestamp),
                row.last_updated.as_ref().map(format_timestamp),
                expected.status.as_str(),
                expected.user_id,
                expected.start_timestamp.as_ref().map(format_timestamp),
            ],
        )?;

        if changed == 0 {
            debug!(
                machine = %row.machine_type,
                expected = %expected,
                "Guarded write lost"
            );
            return Ok(false);
        }

        debug!(machine = %row.machine_type, status = %row.status, "Machine row written");
        Ok(true)
    }

    fn touch(&self, machine_type: &str, user_id: &str, at: DateTime<Utc>) -> StoreResult<bool> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE machines SET last_updated = ?3 \
             WHERE machine_type = ?1 AND user_id = ?2 AND status = ?4",
            params![
                machine_type,
                user_id,
                format_timestamp(&at),
                MachineStatus::InUse.as_str(),
            ],
        )?;
        Ok(changed > 0)
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeRecord> {
        self.feed_tx.subscribe()
    }

    fn poll_changes(&self) -> StoreResult<Vec<ChangeRecord>> {
        let current: BTreeMap<String, MachineRow> = self
            .fetch_all()?
            .into_iter()
            .map(|row| (row.machine_type.clone(), row))
            .collect();

        let mut last_seen = self.last_seen.lock().unwrap();
        let changes = diff_rows(&last_seen, &current);
        *last_seen = current;
        drop(last_seen);

        for change in &changes {
            // No subscribers is not an error
            let _ = self.feed_tx.send(change.clone());
        }

        if !changes.is_empty() {
            debug!(count = changes.len(), "Published change records");
        }
        Ok(changes)
    }

    fn is_healthy(&self) -> bool {
        match self.conn.lock() {
            Ok(conn) => conn.query_row("SELECT 1", [], |_| Ok(())).is_ok(),
            Err(_) => {
                warn!("Store lock poisoned");
                false
            }
        }
    }
}

/// Compute the change records between two snapshots.
///
/// Rows differing only in `last_updated` are heartbeats and produce no record.
fn diff_rows(
    before: &BTreeMap<String, MachineRow>,
    after: &BTreeMap<String, MachineRow>,
) -> Vec<ChangeRecord> {
    let mut changes = Vec::new();

    for (key, new) in after {
        match before.get(key) {
            None => changes.push(ChangeRecord::insert(new.clone())),
            Some(old) if !old.same_state(new) => {
                changes.push(ChangeRecord::update(old.clone(), new.clone()))
            }
            Some(_) => {}
        }
    }

    for (key, old) in before {
        if !after.contains_key(key) {
            changes.push(ChangeRecord::delete(old.clone()));
        }
    }

    changes
}

/// A row as SQLite holds it, timestamps still text
struct StoredRow {
    machine_type: String,
    status: String,
    user_name: Option<String>,
    user_id: Option<String>,
    start_timestamp: Option<String>,
    cycle_duration_seconds: i64,
    complete_timestamp: Option<String>,
    last_updated: Option<String>,
}

impl StoredRow {
    fn into_row(self) -> StoreResult<MachineRow> {
        Ok(MachineRow {
            start_timestamp: parse_timestamp(self.start_timestamp.as_deref())?,
            complete_timestamp: parse_timestamp(self.complete_timestamp.as_deref())?,
            last_updated: parse_timestamp(self.last_updated.as_deref())?,
            machine_type: self.machine_type,
            status: self.status,
            user_name: self.user_name,
            user_id: self.user_id,
            cycle_duration_seconds: self.cycle_duration_seconds,
        })
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn parse_timestamp(value: Option<&str>) -> StoreResult<Option<DateTime<Utc>>> {
    value
        .map(|s| {
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| StoreError::Serialization(format!("bad timestamp {s:?}: {e}")))
        })
        .transpose()
}
