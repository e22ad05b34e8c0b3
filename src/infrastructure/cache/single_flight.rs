//! Per-key coalescing of concurrent misses

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Registry of keys whose value is currently being computed.
///
/// Callers that miss on the same key queue on one mutex; each should
/// re-check the cache after acquiring, because the previous holder has
/// usually populated it by then.
#[derive(Debug, Default)]
pub struct SingleFlight {
    in_flight: DashMap<String, Arc<Mutex<()>>>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `key`
    pub async fn acquire(&self, key: &str) -> FlightGuard<'_> {
        let lock = self
            .in_flight
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let permit = lock.lock_owned().await;

        FlightGuard {
            map: &self.in_flight,
            key: key.to_string(),
            _permit: permit,
        }
    }

    /// Number of keys with a computation in progress or queued
    pub fn len(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_empty(&self) -> bool {
        self.in_flight.is_empty()
    }
}

/// Held while computing a key; releases the next waiter on drop
pub struct FlightGuard<'a> {
    map: &'a DashMap<String, Arc<Mutex<()>>>,
    key: String,
    _permit: OwnedMutexGuard<()>,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        // Map entry plus our permit; anything above that is a waiter.
        self.map
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) <= 2);
    }
}
