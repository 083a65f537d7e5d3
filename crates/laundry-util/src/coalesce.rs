//! Write coalescing for the durable store

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// Bounds heartbeat writes per key to one per interval.
///
/// Transition writes are never delayed; they only reset the interval so the
/// next heartbeat is measured from the last write of any kind.
#[derive(Debug)]
pub struct WriteCoalescer<K> {
    /// Minimum spacing between heartbeat writes for one key
    interval: Duration,
    /// Last write per key
    last_write: HashMap<K, Instant>,
}

impl<K: Eq + Hash + Clone> WriteCoalescer<K> {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_write: HashMap::new(),
        }
    }

    /// Record a state-transition write for `key`
    pub fn record_transition(&mut self, key: &K, now: Instant) {
        self.last_write.insert(key.clone(), now);
    }

    /// Check whether a heartbeat write for `key` may go out now.
    ///
    /// Returns `true` (and records the write) if no write happened within the
    /// interval, `false` if it should be coalesced away.
    pub fn should_heartbeat(&mut self, key: &K, now: Instant) -> bool {
        match self.last_write.get(key) {
            Some(last) if now.saturating_duration_since(*last) < self.interval => false,
            _ => {
                self.last_write.insert(key.clone(), now);
                true
            }
        }
    }

    /// Drop the state for `key` (the slot is no longer active)
    pub fn forget(&mut self, key: &K) {
        self.last_write.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heartbeat_coalesced_within_interval() {
        let mut coalescer = WriteCoalescer::new(Duration::from_secs(15));
        let start = Instant::now();

        assert!(coalescer.should_heartbeat(&"washer", start));
        assert!(!coalescer.should_heartbeat(&"washer", start + Duration::from_secs(1)));
        assert!(!coalescer.should_heartbeat(&"washer", start + Duration::from_secs(14)));
        assert!(coalescer.should_heartbeat(&"washer", start + Duration::from_secs(15)));
    }

    #[test]
    fn transition_resets_interval() {
        let mut coalescer = WriteCoalescer::new(Duration::from_secs(15));
        let start = Instant::now();

        coalescer.record_transition(&"dryer", start);
        assert!(!coalescer.should_heartbeat(&"dryer", start + Duration::from_secs(10)));
        assert!(coalescer.should_heartbeat(&"dryer", start + Duration::from_secs(16)));
    }

    #[test]
    fn keys_are_independent() {
        let mut coalescer = WriteCoalescer::new(Duration::from_secs(15));
        let start = Instant::now();

        assert!(coalescer.should_heartbeat(&"washer", start));
        assert!(coalescer.should_heartbeat(&"dryer", start));
    }

    #[test]
    fn forget_allows_immediate_heartbeat() {
        let mut coalescer = WriteCoalescer::new(Duration::from_secs(15));
        let start = Instant::now();

        assert!(coalescer.should_heartbeat(&"washer", start));
        coalescer.forget(&"washer");
        assert!(coalescer.should_heartbeat(&"washer", start + Duration::from_secs(1)));
    }
}
