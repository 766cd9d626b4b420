//! Reader-writer lock implementation
//!
//! This module provides an async, writer-preferring reader-writer lock
//! (`ReadWriteLock`) that allows multiple concurrent readers or a single
//! writer. It guards no data of its own; callers pair acquire/release calls
//! (or hold the RAII guards) around whatever they protect.
//!
//! # Features
//!
//! - Multiple concurrent readers
//! - Exclusive writer access
//! - Writer preference: a queued writer blocks newly arriving readers
//! - Batch admission of queued readers when a writer releases
//! - FIFO order within each waiter class
//! - Optional deadlines on acquisition
//!
//! # Examples
//!
//! ```
//! use prometheus_sync_kit::ReadWriteLock;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let lock = ReadWriteLock::new();
//!
//! // Many readers can hold the lock at once
//! {
//!     let _r1 = lock.read().await.unwrap();
//!     let _r2 = lock.read().await.unwrap();
//!     assert_eq!(lock.readers(), 2);
//! }
//!
//! // Only one writer
//! {
//!     let _w = lock.write().await.unwrap();
//!     assert!(lock.is_write_locked());
//! }
//! assert!(!lock.is_write_locked());
//! # }
//! ```

use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::core::SyncError;
use crate::wait_queue::WaitQueue;

/// Async writer-preferring reader-writer lock.
pub struct ReadWriteLock {
    state: Mutex<LockState>,
}

struct LockState {
    readers: usize,
    writer: bool,
    waiting_readers: WaitQueue,
    waiting_writers: WaitQueue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Read,
    Write,
}

impl LockState {
    const fn new() -> Self {
        Self {
            readers: 0,
            writer: false,
            waiting_readers: WaitQueue::new(),
            waiting_writers: WaitQueue::new(),
        }
    }

    fn read_blocked(&self) -> bool {
        self.writer || !self.waiting_writers.is_empty()
    }

    fn write_blocked(&self) -> bool {
        self.writer || self.readers > 0 || !self.waiting_writers.is_empty()
    }

    /// Admit every reader queued right now.
    fn grant_readers(&mut self) -> usize {
        let admitted = self.waiting_readers.wake_all();
        self.readers += admitted;
        if admitted > 0 {
            tracing::trace!(admitted, "queued readers admitted");
        }
        admitted
    }

    fn grant_writer(&mut self) -> bool {
        if self.waiting_writers.wake_one() {
            self.writer = true;
            tracing::trace!("queued writer admitted");
            true
        } else {
            false
        }
    }

    fn release_read(&mut self) -> Result<(), SyncError> {
        if self.readers == 0 {
            return Err(SyncError::Misuse("release_read without a read holder".into()));
        }
        self.readers -= 1;
        if self.readers == 0 && !self.grant_writer() {
            // readers only queue behind writers; with none left they may enter
            self.grant_readers();
        }
        Ok(())
    }

    fn release_write(&mut self) -> Result<(), SyncError> {
        if !self.writer {
            return Err(SyncError::Misuse("release_write without a write holder".into()));
        }
        self.writer = false;
        if self.grant_readers() == 0 {
            self.grant_writer();
        }
        Ok(())
    }

    fn release(&mut self, mode: Mode) -> Result<(), SyncError> {
        match mode {
            Mode::Read => self.release_read(),
            Mode::Write => self.release_write(),
        }
    }
}

/// Snapshot of a lock's state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockStats {
    /// Active shared holders.
    pub readers: usize,
    /// Whether an exclusive holder is active.
    pub writer: bool,
    /// Readers suspended in the queue.
    pub waiting_readers: usize,
    /// Writers suspended in the queue.
    pub waiting_writers: usize,
}

impl ReadWriteLock {
    /// Create an unlocked lock.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(LockState::new()),
        }
    }

    /// Acquire shared access.
    ///
    /// Suspends while a writer holds the lock or any writer is queued.
    ///
    /// # Errors
    ///
    /// [`SyncError::Closed`] if the queue entry is torn down without a grant.
    pub async fn acquire_read(&self) -> Result<(), SyncError> {
        let rx = {
            let mut state = self.state.lock();
            if !state.read_blocked() {
                state.readers += 1;
                return Ok(());
            }
            state.waiting_readers.push()
        };
        self.wait(rx, Mode::Read).await
    }

    /// Give up shared access.
    ///
    /// # Errors
    ///
    /// [`SyncError::Misuse`] if no reader holds the lock; state is unchanged.
    pub fn release_read(&self) -> Result<(), SyncError> {
        self.state.lock().release_read()
    }

    /// Acquire exclusive access.
    ///
    /// Suspends while the lock is held in either mode or earlier writers are
    /// still queued.
    ///
    /// # Errors
    ///
    /// [`SyncError::Closed`] if the queue entry is torn down without a grant.
    pub async fn acquire_write(&self) -> Result<(), SyncError> {
        let rx = {
            let mut state = self.state.lock();
            if !state.write_blocked() {
                state.writer = true;
                return Ok(());
            }
            state.waiting_writers.push()
        };
        self.wait(rx, Mode::Write).await
    }

    /// Give up exclusive access, admitting queued readers first.
    ///
    /// # Errors
    ///
    /// [`SyncError::Misuse`] if no writer holds the lock; state is unchanged.
    pub fn release_write(&self) -> Result<(), SyncError> {
        self.state.lock().release_write()
    }

    /// [`ReadWriteLock::acquire_read`] with a deadline.
    ///
    /// # Errors
    ///
    /// [`SyncError::TimedOut`] if shared access was not granted in time.
    pub async fn acquire_read_timeout(&self, timeout: Duration) -> Result<(), SyncError> {
        tokio::time::timeout(timeout, self.acquire_read())
            .await
            .map_err(|_| SyncError::TimedOut(timeout))?
    }

    /// [`ReadWriteLock::acquire_write`] with a deadline.
    ///
    /// # Errors
    ///
    /// [`SyncError::TimedOut`] if exclusive access was not granted in time.
    pub async fn acquire_write_timeout(&self, timeout: Duration) -> Result<(), SyncError> {
        tokio::time::timeout(timeout, self.acquire_write())
            .await
            .map_err(|_| SyncError::TimedOut(timeout))?
    }

    /// Acquire shared access held by the returned guard.
    ///
    /// # Errors
    ///
    /// See [`ReadWriteLock::acquire_read`].
    pub async fn read(&self) -> Result<ReadGuard<'_>, SyncError> {
        self.acquire_read().await?;
        Ok(ReadGuard { lock: self })
    }

    /// Acquire exclusive access held by the returned guard.
    ///
    /// # Errors
    ///
    /// See [`ReadWriteLock::acquire_write`].
    pub async fn write(&self) -> Result<WriteGuard<'_>, SyncError> {
        self.acquire_write().await?;
        Ok(WriteGuard { lock: self })
    }

    /// Active shared holders.
    pub fn readers(&self) -> usize {
        self.state.lock().readers
    }

    /// Whether a writer currently holds the lock.
    pub fn is_write_locked(&self) -> bool {
        self.state.lock().writer
    }

    /// Readers suspended in the queue.
    pub fn waiting_readers(&self) -> usize {
        self.state.lock().waiting_readers.len()
    }

    /// Writers suspended in the queue.
    pub fn waiting_writers(&self) -> usize {
        self.state.lock().waiting_writers.len()
    }

    /// Snapshot of all counters under one lock.
    pub fn stats(&self) -> LockStats {
        let state = self.state.lock();
        LockStats {
            readers: state.readers,
            writer: state.writer,
            waiting_readers: state.waiting_readers.len(),
            waiting_writers: state.waiting_writers.len(),
        }
    }

    async fn wait(&self, rx: oneshot::Receiver<()>, mode: Mode) -> Result<(), SyncError> {
        tracing::trace!(?mode, "lock busy, waiting");
        let mut pending = PendingAccess {
            lock: self,
            rx,
            mode,
            settled: false,
        };
        let outcome = (&mut pending.rx).await;
        pending.settled = true;
        outcome.map_err(|_| SyncError::Closed)
    }
}

impl Default for ReadWriteLock {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ReadWriteLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadWriteLock")
            .field("stats", &self.stats())
            .finish()
    }
}

/// Shared access; released on drop.
#[must_use = "shared access is released as soon as the guard is dropped"]
pub struct ReadGuard<'a> {
    lock: &'a ReadWriteLock,
}

impl Drop for ReadGuard<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.lock.release_read() {
            tracing::error!("read guard release failed: {err}");
        }
    }
}

/// Exclusive access; released on drop.
#[must_use = "exclusive access is released as soon as the guard is dropped"]
pub struct WriteGuard<'a> {
    lock: &'a ReadWriteLock,
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.lock.release_write() {
            tracing::error!("write guard release failed: {err}");
        }
    }
}

/// An acquire still parked in one of the wait queues.
struct PendingAccess<'a> {
    lock: &'a ReadWriteLock,
    rx: oneshot::Receiver<()>,
    mode: Mode,
    settled: bool,
}

impl Drop for PendingAccess<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut state = self.lock.state.lock();
        self.rx.close();
        if self.rx.try_recv().is_ok() {
            // granted after the waiter gave up; release so the turn moves on
            if let Err(err) = state.release(self.mode) {
                tracing::error!("returning abandoned grant failed: {err}");
            }
        }
        state.waiting_readers.prune();
        state.waiting_writers.prune();
        if self.mode == Mode::Write && !state.read_blocked() {
            // readers that were only held back by this writer may enter now
            state.grant_readers();
        }
        tracing::debug!(mode = ?self.mode, "abandoned lock wait");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_multiple_readers() {
        let lock = ReadWriteLock::new();
        lock.acquire_read().await.unwrap();
        lock.acquire_read().await.unwrap();
        lock.acquire_read().await.unwrap();
        assert_eq!(lock.readers(), 3);
        assert!(!lock.is_write_locked());
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let lock = ReadWriteLock::new();
        lock.acquire_write().await.unwrap();
        assert!(lock.is_write_locked());
        lock.release_write().unwrap();

        lock.acquire_read().await.unwrap();
        assert_eq!(lock.readers(), 1);
        lock.release_read().unwrap();
        assert_eq!(lock.stats(), LockStats {
            readers: 0,
            writer: false,
            waiting_readers: 0,
            waiting_writers: 0,
        });
    }

    #[test]
    fn test_release_without_holder_is_misuse() {
        let lock = ReadWriteLock::new();
        assert!(matches!(lock.release_read(), Err(SyncError::Misuse(_))));
        assert!(matches!(lock.release_write(), Err(SyncError::Misuse(_))));
        assert_eq!(lock.readers(), 0);
        assert!(!lock.is_write_locked());
    }

    #[tokio::test]
    async fn test_release_write_admits_reader_batch() {
        let lock = Arc::new(ReadWriteLock::new());
        lock.acquire_write().await.unwrap();

        let mut readers = Vec::new();
        for _ in 0..3 {
            let lock = Arc::clone(&lock);
            readers.push(tokio::spawn(async move { lock.acquire_read().await }));
        }
        let writer = {
            let lock = Arc::clone(&lock);
            tokio::spawn(async move { lock.acquire_write().await })
        };
        tokio::task::yield_now().await;
        assert_eq!(lock.waiting_readers(), 3);
        assert_eq!(lock.waiting_writers(), 1);

        lock.release_write().unwrap();
        assert_eq!(lock.readers(), 3);
        assert!(!lock.is_write_locked());
        for reader in readers {
            reader.await.unwrap().unwrap();
        }

        for _ in 0..3 {
            lock.release_read().unwrap();
        }
        writer.await.unwrap().unwrap();
        assert!(lock.is_write_locked());
    }

    #[tokio::test]
    async fn test_guards_release_on_drop() {
        let lock = ReadWriteLock::new();
        {
            let _w = lock.write().await.unwrap();
            assert!(lock.is_write_locked());
        }
        {
            let _r = lock.read().await.unwrap();
            assert_eq!(lock.readers(), 1);
        }
        assert_eq!(lock.readers(), 0);
        assert!(!lock.is_write_locked());
    }
}
