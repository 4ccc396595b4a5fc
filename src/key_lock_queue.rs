//! Per-key FIFO serialization for the Sync Bridge's invalidation handler
//! (§4.E).
//!
//! Grounded on the teacher's `cache_manager.rs` `CleanupGuard`: a Drop-based
//! RAII guard releases the lock on every exit path, including panics and
//! early returns, the same way `CleanupGuard::drop` removes the in-flight
//! marker unconditionally.

use std::collections::VecDeque;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Notify;

/// A FIFO of pending completion signals, one per key.
///
/// `acquire` never blocks a thread: a waiter parks on the previous holder's
/// `Notify` and is woken exactly once, by that holder's `release`.
#[derive(Default)]
pub struct KeyLockQueue {
    queues: DashMap<String, VecDeque<Arc<Notify>>>,
}

/// RAII handle returned by [`KeyLockQueue::acquire`]. Dropping it releases
/// the lock for `key`, waking the next waiter if one is queued.
pub struct LockGuard<'a> {
    queue: &'a KeyLockQueue,
    key: String,
    released: bool,
}

impl KeyLockQueue {
    #[must_use]
    pub fn new() -> Self {
        Self {
            queues: DashMap::new(),
        }
    }

    /// Acquire the lock for `key`, waiting for any prior holder to finish.
    pub async fn acquire(&self, key: &str) -> LockGuard<'_> {
        let my_turn = Arc::new(Notify::new());
        let predecessor = {
            let mut entry = self.queues.entry(key.to_string()).or_default();
            let predecessor = entry.back().cloned();
            entry.push_back(Arc::clone(&my_turn));
            predecessor
        };

        if let Some(predecessor) = predecessor {
            predecessor.notified().await;
        }

        LockGuard {
            queue: self,
            key: key.to_string(),
            released: false,
        }
    }

    fn release(&self, key: &str) {
        let mut empty_after = false;
        if let Some(mut entry) = self.queues.get_mut(key) {
            if let Some(front) = entry.pop_front() {
                front.notify_one();
            }
            empty_after = entry.is_empty();
        }
        if empty_after {
            self.queues.remove_if(key, |_, q| q.is_empty());
        }
    }
}

impl LockGuard<'_> {
    /// Release the lock early. Equivalent to dropping the guard, but lets
    /// callers be explicit about the end of a critical section.
    pub fn release(mut self) {
        self.queue.release(&self.key);
        self.released = true;
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        if !self.released {
            self.queue.release(&self.key);
        }
    }
}
