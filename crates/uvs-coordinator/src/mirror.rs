//! Bounded drop-oldest queue backing mirror fan-out and the auxiliary
//! (graph) notification channel.
//!
//! Back-pressure policy per spec §5: "write fan-out to secondaries is
//! non-blocking and bounded by a per-provider queue (default 1024);
//! overflow drops the oldest pending mirror with a warning metric." A
//! `tokio::mpsc` channel can only reject the *newest* item on overflow, so
//! this is a small ring guarded by a `std::sync::Mutex` held only for the
//! push/pop — never across an I/O suspension, the same discipline the
//! embedding cache's lock follows.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::sync::Notify;

/// A bounded, drop-oldest, multi-producer single-consumer-ish queue. Any
/// number of producers may push; a drainer wakes on `notified()` and pulls
/// everything pending.
pub struct DropOldestQueue<T> {
    capacity: usize,
    items: Mutex<VecDeque<T>>,
    notify: Notify,
    dropped: AtomicU64,
}

impl<T> DropOldestQueue<T> {
    /// Build a queue bounded to `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            items: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            notify: Notify::new(),
            dropped: AtomicU64::new(0),
        }
    }

    /// Push an item. Non-blocking; if the queue is full, the oldest
    /// pending item is dropped to make room and the drop counter is
    /// incremented.
    pub fn push(&self, item: T) {
        {
            let mut items = self.items.lock().unwrap();
            if items.len() >= self.capacity {
                items.pop_front();
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
            items.push_back(item);
        }
        self.notify.notify_one();
    }

    /// Drain everything currently pending, without blocking.
    pub fn drain(&self) -> Vec<T> {
        let mut items = self.items.lock().unwrap();
        items.drain(..).collect()
    }

    /// Wait until at least one item is pushed (or one was already
    /// pending), then drain everything pending.
    pub async fn wait_and_drain(&self) -> Vec<T> {
        loop {
            let pending = self.drain();
            if !pending.is_empty() {
                return pending;
            }
            self.notify.notified().await;
        }
    }

    /// Total number of items dropped for being oldest-when-full, since
    /// construction.
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Number of items currently pending.
    pub fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    /// Whether the queue currently holds no items.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_oldest_when_full() {
        let queue = DropOldestQueue::new(2);
        queue.push(1);
        queue.push(2);
        queue.push(3);
        assert_eq!(queue.drain(), vec![2, 3]);
        assert_eq!(queue.dropped_count(), 1);
    }

    #[tokio::test]
    async fn wait_and_drain_observes_pushed_items() {
        let queue = std::sync::Arc::new(DropOldestQueue::new(8));
        let q2 = queue.clone();
        let handle = tokio::spawn(async move { q2.wait_and_drain().await });
        tokio::task::yield_now().await;
        queue.push("a");
        let items = handle.await.unwrap();
        assert_eq!(items, vec!["a"]);
    }
}
