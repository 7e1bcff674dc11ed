//! Bounded connection-pool accounting for the primary provider.
//!
//! There is no external database process backing this pool; it models the
//! scarce-resource contract a real one would impose so the primary
//! provider's concurrency control matches production behavior:
//! acquisition has a timeout, and exhaustion surfaces as `Unavailable`
//! rather than a crash or an unbounded queue.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Semaphore, SemaphorePermit};
use uvs_domain::error::{Error, Result};

/// A bounded pool of "connections". `min`/`max` are recorded for
/// introspection (`stats`); the semaphore enforces `max` concurrently
/// outstanding leases.
pub struct ConnectionPool {
    semaphore: Arc<Semaphore>,
    max: usize,
    min: usize,
    acquire_timeout: Duration,
}

/// A leased slot. Dropping it returns the slot to the pool.
pub struct PoolLease<'a>(#[allow(dead_code)] SemaphorePermit<'a>);

impl ConnectionPool {
    /// Build a pool. Callers typically size `max` in the 5–20 range;
    /// `min` defaults to `max / 4`.
    pub fn new(max: usize, acquire_timeout: Duration) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max)),
            max,
            min: (max / 4).max(1),
            acquire_timeout,
        }
    }

    /// Acquire a slot, failing with `Unavailable` if none frees up within
    /// the acquire timeout.
    pub async fn acquire(&self, provider_name: &str) -> Result<PoolLease<'_>> {
        match tokio::time::timeout(self.acquire_timeout, self.semaphore.acquire()).await {
            Ok(Ok(permit)) => Ok(PoolLease(permit)),
            Ok(Err(_)) => Err(Error::unavailable(provider_name, "connection pool closed")),
            Err(_) => Err(Error::unavailable(
                provider_name,
                "timed out acquiring a connection from the pool",
            )),
        }
    }

    /// Declared maximum size.
    pub fn max(&self) -> usize {
        self.max
    }

    /// Declared minimum size.
    pub fn min(&self) -> usize {
        self.min
    }

    /// Connections currently available (not leased).
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Connections currently leased out.
    pub fn in_use(&self) -> usize {
        self.max.saturating_sub(self.available())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn acquire_succeeds_when_capacity_available() {
        let pool = ConnectionPool::new(2, Duration::from_millis(100));
        let _a = pool.acquire("primary").await.unwrap();
        assert_eq!(pool.in_use(), 1);
    }

    #[tokio::test]
    async fn exhaustion_times_out_as_unavailable() {
        let pool = ConnectionPool::new(1, Duration::from_millis(20));
        let _held = pool.acquire("primary").await.unwrap();
        let err = pool.acquire("primary").await.unwrap_err();
        assert!(err.is_unavailable());
    }
}
