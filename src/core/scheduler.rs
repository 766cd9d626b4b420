//! Bounded-concurrency task scheduler.
//!
//! Tasks are started in submission order whenever fewer than
//! `max_concurrency` are running. Each completion (success, failure or
//! panic) frees a slot and re-runs admission, so the queue drains without an
//! external driver.

use std::collections::VecDeque;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::config::SchedulerConfig;
use crate::core::error::describe_panic;
use crate::core::{Spawn, SyncError};

type Job = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

/// Runs at most `max_concurrency` tasks at once, FIFO.
pub struct Scheduler<S> {
    inner: Arc<SchedulerInner<S>>,
}

struct SchedulerInner<S> {
    max_concurrency: usize,
    state: Mutex<SchedulerState>,
    spawner: S,
}

struct SchedulerState {
    queue: VecDeque<Job>,
    running: usize,
}

/// Snapshot of a scheduler's counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    /// Configured concurrency bound.
    pub max_concurrency: usize,
    /// Tasks queued and not yet started.
    pub pending: usize,
    /// Tasks currently running.
    pub active: usize,
}

impl<S: Spawn> Scheduler<S> {
    /// Create a scheduler running at most `max_concurrency` tasks at once.
    ///
    /// # Errors
    ///
    /// [`SyncError::InvalidConfig`] when `max_concurrency` is zero, since
    /// such a scheduler could never start anything.
    pub fn new(max_concurrency: usize, spawner: S) -> Result<Self, SyncError> {
        if max_concurrency == 0 {
            return Err(SyncError::InvalidConfig(
                "max_concurrency must be greater than 0".into(),
            ));
        }
        Ok(Self {
            inner: Arc::new(SchedulerInner {
                max_concurrency,
                state: Mutex::new(SchedulerState {
                    queue: VecDeque::new(),
                    running: 0,
                }),
                spawner,
            }),
        })
    }

    /// Create a scheduler from validated configuration.
    ///
    /// # Errors
    ///
    /// See [`Scheduler::new`].
    pub fn from_config(cfg: &SchedulerConfig, spawner: S) -> Result<Self, SyncError> {
        Self::new(cfg.max_concurrency, spawner)
    }

    /// Queue `task` and return a handle to its outcome.
    ///
    /// The task starts as soon as a slot is free whether or not the handle is
    /// ever awaited; dropping the handle discards the outcome only. Fallible
    /// tasks report their own errors through `T`; a panic inside the task is
    /// delivered as [`SyncError::TaskPanicked`] and affects no other task.
    pub fn add<F, Fut, T>(&self, task: F) -> TaskHandle<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job = Box::new(move || {
            async move {
                let outcome = AssertUnwindSafe(async move { task().await })
                    .catch_unwind()
                    .await
                    .map_err(|payload| SyncError::TaskPanicked(describe_panic(payload.as_ref())));
                if let Err(SyncError::TaskPanicked(msg)) = &outcome {
                    tracing::warn!("scheduled task panicked: {msg}");
                }
                // the caller may have dropped its handle
                let _ = tx.send(outcome);
            }
            .boxed()
        });

        let pending = {
            let mut state = self.inner.state.lock();
            state.queue.push_back(job);
            state.queue.len()
        };
        tracing::debug!(pending, "task queued");
        SchedulerInner::admit(&self.inner);
        TaskHandle { rx }
    }

    /// Tasks waiting to start.
    pub fn pending(&self) -> usize {
        self.inner.state.lock().queue.len()
    }

    /// Tasks currently running.
    pub fn active_count(&self) -> usize {
        self.inner.state.lock().running
    }

    /// Configured concurrency bound.
    pub fn max_concurrency(&self) -> usize {
        self.inner.max_concurrency
    }

    /// Snapshot of all counters under one lock.
    pub fn stats(&self) -> SchedulerStats {
        let state = self.inner.state.lock();
        SchedulerStats {
            max_concurrency: self.inner.max_concurrency,
            pending: state.queue.len(),
            active: state.running,
        }
    }
}

impl<S: Spawn> SchedulerInner<S> {
    /// Start queued jobs while slots are free.
    fn admit(this: &Arc<Self>) {
        loop {
            let job = {
                let mut state = this.state.lock();
                if state.running >= this.max_concurrency {
                    return;
                }
                let Some(job) = state.queue.pop_front() else {
                    return;
                };
                state.running += 1;
                tracing::trace!(running = state.running, "task started");
                job
            };

            // the slot is freed when the future ends or is dropped unpolled
            let slot = Slot {
                inner: Arc::clone(this),
            };
            this.spawner.spawn(async move {
                job().await;
                drop(slot);
            });
        }
    }

    fn finish(self: Arc<Self>) {
        {
            let mut state = self.state.lock();
            state.running -= 1;
            tracing::trace!(running = state.running, "task finished");
        }
        Self::admit(&self);
    }
}

/// A running slot; dropping it hands the slot back and re-runs admission.
struct Slot<S: Spawn> {
    inner: Arc<SchedulerInner<S>>,
}

impl<S: Spawn> Drop for Slot<S> {
    fn drop(&mut self) {
        Arc::clone(&self.inner).finish();
    }
}

impl<S> Clone for Scheduler<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> std::fmt::Debug for Scheduler<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Scheduler")
            .field("max_concurrency", &self.inner.max_concurrency)
            .field("pending", &state.queue.len())
            .field("active", &state.running)
            .finish()
    }
}

/// Future resolving to the outcome of a task queued with [`Scheduler::add`].
#[must_use = "dropping the handle discards the task's outcome, not the task"]
pub struct TaskHandle<T> {
    rx: oneshot::Receiver<Result<T, SyncError>>,
}

impl<T> Future for TaskHandle<T> {
    type Output = Result<T, SyncError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(SyncError::Closed)))
    }
}
