//! Periodic change-feed polling

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::MachineStore;

/// Polls a store for changes and publishes them to its subscribers
pub struct FeedWatcher {
    store: Arc<dyn MachineStore>,
    poll_interval: Duration,
}

impl FeedWatcher {
    pub fn new(store: Arc<dyn MachineStore>, poll_interval: Duration) -> Self {
        Self {
            store,
            poll_interval,
        }
    }

    /// Spawn the polling task; it stops once `true` is sent on `shutdown`
    /// or the sender is dropped.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// Poll until shutdown
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        info!(interval_ms = self.poll_interval.as_millis() as u64, "Change feed started");

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.store.poll_changes() {
                        warn!(error = %e, "Change feed poll failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        debug!("Change feed shutting down");
                        break;
                    }
                }
            }
        }

        info!("Change feed stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SqliteMachineStore;
    use laundry_api::{MachineRow, MachineStatus};

    #[tokio::test]
    async fn test_watcher_delivers_and_stops() {
        let store = Arc::new(SqliteMachineStore::in_memory().unwrap());
        let mut rx = store.subscribe();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle =
            FeedWatcher::new(store.clone(), Duration::from_millis(10)).spawn(shutdown_rx);

        let row = MachineRow {
            machine_type: "washer".into(),
            status: MachineStatus::InUse.as_str().into(),
            user_name: Some("alice".into()),
            user_id: Some("a-1".into()),
            start_timestamp: Some(laundry_util::now()),
            cycle_duration_seconds: 600,
            complete_timestamp: None,
            last_updated: Some(laundry_util::now()),
        };
        store.update(&row).unwrap();

        let record = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.new, Some(row));

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_watcher_stops_when_sender_dropped() {
        let store = Arc::new(SqliteMachineStore::in_memory().unwrap());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = FeedWatcher::new(store, Duration::from_millis(10)).spawn(shutdown_rx);
        drop(shutdown_tx);

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
