//! FIFO queue of suspended waiters.
//!
//! Each waiter is a `oneshot` sender; the suspended task holds the matching
//! receiver. Releasers pop from the front and signal, which doubles as a
//! hand-off: a successful `send` means the waiter now owns whatever was
//! being released. A waiter that gives up closes its receiver under the same
//! lock as the releaser, so a closed sender is always skipped rather than
//! granted.

use std::collections::VecDeque;

use tokio::sync::oneshot;

pub(crate) struct WaitQueue {
    waiters: VecDeque<oneshot::Sender<()>>,
}

impl WaitQueue {
    pub(crate) const fn new() -> Self {
        Self {
            waiters: VecDeque::new(),
        }
    }

    /// Enqueue a new waiter at the back and return its receiving side.
    pub(crate) fn push(&mut self) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        self.waiters.push_back(tx);
        rx
    }

    /// Signal the longest-waiting live waiter. Returns `false` if none.
    pub(crate) fn wake_one(&mut self) -> bool {
        while let Some(tx) = self.waiters.pop_front() {
            if tx.send(()).is_ok() {
                return true;
            }
        }
        false
    }

    /// Signal every live waiter currently queued; returns how many.
    pub(crate) fn wake_all(&mut self) -> usize {
        let mut woken = 0;
        while let Some(tx) = self.waiters.pop_front() {
            if tx.send(()).is_ok() {
                woken += 1;
            }
        }
        woken
    }

    /// Drop entries whose waiter has gone away.
    pub(crate) fn prune(&mut self) {
        self.waiters.retain(|tx| !tx.is_closed());
    }

    pub(crate) fn len(&self) -> usize {
        self.waiters.iter().filter(|tx| !tx.is_closed()).count()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.waiters.iter().all(oneshot::Sender::is_closed)
    }
}
