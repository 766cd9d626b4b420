//! Counting semaphore
//!
//! This module provides an async counting semaphore with strict FIFO
//! admission. A release hands its permit directly to the longest-waiting
//! acquirer; the shared count only grows when nobody is waiting.
//!
//! # Features
//!
//! - FIFO hand-off of permits
//! - Scoped acquisition with [`Semaphore::with_permit`] and RAII permits
//! - Optional deadlines on acquisition
//! - Dropping a pending acquire never loses a permit
//!
//! # Examples
//!
//! ```
//! use prometheus_sync_kit::Semaphore;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let sem = Semaphore::new(2);
//!
//! let value = sem.with_permit(|| async { 40 + 2 }).await.unwrap();
//! assert_eq!(value, 42);
//! assert_eq!(sem.available_permits(), 2);
//!
//! sem.acquire().await.unwrap();
//! assert_eq!(sem.available_permits(), 1);
//! sem.release();
//! # }
//! ```

use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::core::SyncError;
use crate::wait_queue::WaitQueue;

/// Async counting semaphore with FIFO permit hand-off.
pub struct Semaphore {
    state: Mutex<SemaphoreState>,
}

struct SemaphoreState {
    permits: usize,
    initial: usize,
    waiters: WaitQueue,
}

impl SemaphoreState {
    fn release(&mut self) {
        if self.waiters.wake_one() {
            tracing::trace!("permit handed to waiter");
        } else {
            self.permits += 1;
            if self.permits > self.initial {
                tracing::debug!(
                    available = self.permits,
                    initial = self.initial,
                    "semaphore released beyond its initial permit count"
                );
            }
        }
    }
}

/// Snapshot of a semaphore's counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemaphoreStats {
    /// Permits not currently committed to anyone.
    pub available_permits: usize,
    /// Acquirers suspended in the wait queue.
    pub waiting: usize,
}

impl Semaphore {
    /// Create a semaphore with `permits` initially available.
    ///
    /// Zero is allowed and produces a closed gate that opens on `release`.
    #[must_use]
    pub const fn new(permits: usize) -> Self {
        Self {
            state: Mutex::new(SemaphoreState {
                permits,
                initial: permits,
                waiters: WaitQueue::new(),
            }),
        }
    }

    /// Wait for a permit and consume it.
    ///
    /// The permit must be returned with [`Semaphore::release`].
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Closed`] if the wait queue entry was torn down
    /// without a grant, which only happens while the semaphore is dropped.
    pub async fn acquire(&self) -> Result<(), SyncError> {
        let rx = {
            let mut state = self.state.lock();
            if state.permits > 0 {
                state.permits -= 1;
                return Ok(());
            }
            state.waiters.push()
        };
        tracing::trace!("no permit available, waiting");

        let mut pending = PendingPermit {
            semaphore: self,
            rx,
            settled: false,
        };
        let outcome = (&mut pending.rx).await;
        pending.settled = true;
        outcome.map_err(|_| SyncError::Closed)
    }

    /// Take a permit only if one is free right now.
    pub fn try_acquire(&self) -> bool {
        let mut state = self.state.lock();
        if state.permits > 0 {
            state.permits -= 1;
            true
        } else {
            false
        }
    }

    /// Like [`Semaphore::acquire`] but gives up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::TimedOut`] when the deadline passes first. The
    /// abandoned wait is removed from the queue.
    pub async fn acquire_timeout(&self, timeout: Duration) -> Result<(), SyncError> {
        tokio::time::timeout(timeout, self.acquire())
            .await
            .map_err(|_| SyncError::TimedOut(timeout))?
    }

    /// Return one permit.
    ///
    /// Releasing more often than acquiring is not checked: the surplus simply
    /// accumulates in [`Semaphore::available_permits`].
    pub fn release(&self) {
        let mut state = self.state.lock();
        state.release();
        tracing::trace!(available = state.permits, "permit released");
    }

    /// Acquire a permit that is released automatically when dropped.
    ///
    /// # Errors
    ///
    /// See [`Semaphore::acquire`].
    pub async fn permit(&self) -> Result<SemaphorePermit<'_>, SyncError> {
        self.acquire().await?;
        Ok(SemaphorePermit { semaphore: self })
    }

    /// Run `f` while holding a permit.
    ///
    /// The permit is released however the body finishes: normal completion,
    /// a panic, or the returned future being dropped mid-way.
    ///
    /// # Errors
    ///
    /// Only acquisition errors are reported here; the body's own outcome is
    /// passed through untouched inside `Ok`.
    pub async fn with_permit<F, Fut, T>(&self, f: F) -> Result<T, SyncError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _permit = self.permit().await?;
        Ok(f().await)
    }

    /// Permits not currently held. Waiters are not reflected here.
    pub fn available_permits(&self) -> usize {
        self.state.lock().permits
    }

    /// Number of acquirers currently suspended.
    pub fn waiting(&self) -> usize {
        self.state.lock().waiters.len()
    }

    /// Snapshot both counters under one lock.
    pub fn stats(&self) -> SemaphoreStats {
        let state = self.state.lock();
        SemaphoreStats {
            available_permits: state.permits,
            waiting: state.waiters.len(),
        }
    }
}

impl std::fmt::Debug for Semaphore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stats = self.stats();
        f.debug_struct("Semaphore")
            .field("available_permits", &stats.available_permits)
            .field("waiting", &stats.waiting)
            .finish()
    }
}

/// A held permit; released on drop.
#[must_use = "the permit is released as soon as it is dropped"]
pub struct SemaphorePermit<'a> {
    semaphore: &'a Semaphore,
}

impl SemaphorePermit<'_> {
    /// Keep the permit acquired past the guard's lifetime. The caller takes
    /// over responsibility for calling [`Semaphore::release`].
    pub fn forget(self) {
        std::mem::forget(self);
    }
}

impl Drop for SemaphorePermit<'_> {
    fn drop(&mut self) {
        self.semaphore.release();
    }
}

/// An acquire that is still parked in the wait queue.
struct PendingPermit<'a> {
    semaphore: &'a Semaphore,
    rx: oneshot::Receiver<()>,
    settled: bool,
}

impl Drop for PendingPermit<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut state = self.semaphore.state.lock();
        self.rx.close();
        if self.rx.try_recv().is_ok() {
            // granted after the waiter gave up; pass it on
            state.release();
        }
        state.waiters.prune();
        tracing::debug!("abandoned semaphore wait");
    }
}
