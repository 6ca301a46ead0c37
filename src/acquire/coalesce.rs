// src/acquire/coalesce.rs

//! Per-run request coalescing (singleflight pattern)
//!
//! When several tasks acquire the same identity in one run, only the first
//! does the work; the others wait for its result and share it. Completed
//! results are remembered for the rest of the run, so an identity reached a
//! second time (for example through another package's dependencies) is not
//! fetched again.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::debug;

enum Slot<T> {
    /// A leader is working; subscribe to hear the result
    InFlight(broadcast::Sender<T>),
    /// Result already known for this run
    Done(T),
}

/// Request coalescer keyed by string
pub struct Coalescer<T: Clone> {
    slots: DashMap<String, Slot<T>>,
    coalesced_count: AtomicU64,
}

/// Removes an in-flight slot if the leader is dropped before finishing
struct LeaderGuard<'a, T: Clone> {
    slots: &'a DashMap<String, Slot<T>>,
    key: &'a str,
    armed: bool,
}

impl<T: Clone> Drop for LeaderGuard<'_, T> {
    fn drop(&mut self) {
        if self.armed {
            self.slots
                .remove_if(self.key, |_, slot| matches!(slot, Slot::InFlight(_)));
        }
    }
}

impl<T: Clone> Coalescer<T> {
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
            coalesced_count: AtomicU64::new(0),
        }
    }

    /// Run `work` for `key` unless it is already running or done
    ///
    /// If the task doing the work is dropped before finishing, waiters retry
    /// and one of them takes over.
    pub async fn run<F, Fut>(&self, key: &str, work: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let tx = loop {
            // The entry lock must be released before awaiting
            let mut rx = match self.slots.entry(key.to_string()) {
                Entry::Occupied(entry) => match entry.get() {
                    Slot::Done(result) => {
                        self.coalesced_count.fetch_add(1, Ordering::Relaxed);
                        return result.clone();
                    }
                    Slot::InFlight(sender) => sender.subscribe(),
                },
                Entry::Vacant(entry) => {
                    let (tx, _rx) = broadcast::channel(1);
                    entry.insert(Slot::InFlight(tx.clone()));
                    break tx;
                }
            };

            debug!("Coalescing request for {}", key);
            self.coalesced_count.fetch_add(1, Ordering::Relaxed);
            match rx.recv().await {
                Ok(result) => return result,
                Err(_) => debug!("Leader for {} went away, retrying", key),
            }
        };

        let mut guard = LeaderGuard {
            slots: &self.slots,
            key,
            armed: true,
        };
        let result = work().await;

        self.slots
            .insert(key.to_string(), Slot::Done(result.clone()));
        guard.armed = false;

        // No receivers is fine
        let _ = tx.send(result.clone());
        result
    }

    /// Number of requests answered without doing the work
    pub fn coalesced_count(&self) -> u64 {
        self.coalesced_count.load(Ordering::Relaxed)
    }
}

impl<T: Clone> Default for Coalescer<T> {
    fn default() -> Self {
        Self::new()
    }
}
