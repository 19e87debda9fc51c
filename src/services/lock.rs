//! Keyed mutual exclusion for the confirmation critical section.
//!
//! The registry is an injectable service rather than a process-wide map:
//! the coordinator takes a [`LockManager`] so tests can supply their own
//! and a distributed implementation can be swapped in behind the trait.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Registry entries with no live guard are pruned once the map grows past
/// this size.
const CLEANUP_THRESHOLD: usize = 1024;

/// Held for the duration of a critical section; releases on drop.
pub struct LockGuard {
    _held: Box<dyn std::any::Any + Send>,
}

pub trait LockManager: Send + Sync {
    /// Attempts to take the lock for `key` without waiting. `None` means
    /// another holder is active — callers surface that as a conflict
    /// instead of queueing.
    fn try_acquire(&self, key: &str) -> Option<LockGuard>;
}

/// In-process implementation: one `tokio::sync::Mutex` per key.
#[derive(Default)]
pub struct KeyedLockManager {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl KeyedLockManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn cleanup(&self) {
        if self.locks.len() > CLEANUP_THRESHOLD {
            // A guard keeps its Arc alive, so strong_count == 1 means unheld.
            self.locks.retain(|_, m| Arc::strong_count(m) > 1);
        }
    }
}

impl LockManager for KeyedLockManager {
    fn try_acquire(&self, key: &str) -> Option<LockGuard> {
        self.cleanup();

        let mutex = self
            .locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        match mutex.try_lock_owned() {
            Ok(guard) => Some(LockGuard {
                _held: Box::new(guard),
            }),
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_on_same_key_fails_until_release() {
        let locks = KeyedLockManager::new();

        let guard = locks.try_acquire("txn-1");
        assert!(guard.is_some());
        assert!(locks.try_acquire("txn-1").is_none());

        drop(guard);
        assert!(locks.try_acquire("txn-1").is_some());
    }

    #[test]
    fn distinct_keys_do_not_contend() {
        let locks = KeyedLockManager::new();

        let first = locks.try_acquire("txn-1");
        let second = locks.try_acquire("txn-2");
        assert!(first.is_some());
        assert!(second.is_some());
    }

    #[test]
    fn registry_prunes_unheld_entries() {
        let locks = KeyedLockManager::new();

        for i in 0..(CLEANUP_THRESHOLD + 10) {
            let guard = locks.try_acquire(&format!("txn-{}", i));
            drop(guard);
        }
        // The held entry survives cleanup.
        let _live = locks.try_acquire("live").unwrap();
        locks.cleanup();
        assert!(locks.locks.len() <= CLEANUP_THRESHOLD + 1);
        assert!(locks.try_acquire("live").is_none());
    }
}
