//! # Prometheus Sync Kit
//!
//! Cooperative, async concurrency-control primitives for the Prometheus AI
//! Platform.
//!
//! The crate offers five independent building blocks from which higher-level
//! orchestration (inference schedulers, resource loaders, rate limiters) is
//! assembled:
//!
//! - [`Semaphore`]: counting permits with FIFO hand-off
//! - [`ReadWriteLock`]: shared/exclusive lock that prefers writers
//! - [`Scheduler`]: runs at most N tasks at once, starting them in order
//! - [`ThrottleQueue`]: drains a queue one item at a time with a fixed pause
//! - [`ObjectPool`]: recycles expensive objects through a bounded free list
//!
//! ## Waiting model
//!
//! Every suspended acquirer is an explicit entry in a FIFO wait queue. A
//! release pops the front entry and hands it the permit or lock turn
//! directly, so a waiter never has to re-check shared state after waking and
//! later arrivals can never overtake it. State transitions happen under a
//! short `parking_lot` critical section that is never held across an
//! `.await`, so the primitives are safe on multi-threaded runtimes.
//!
//! Plain acquisitions wait indefinitely. The `*_timeout` variants add a
//! deadline; abandoning a wait (by timeout or by dropping the future) removes
//! it from the queue without losing a permit.
//!
//! ## Example
//!
//! ```rust,ignore
//! use prometheus_sync_kit::{Scheduler, Semaphore, TokioSpawner};
//! use std::sync::Arc;
//!
//! let gpu_slots = Arc::new(Semaphore::new(2));
//! let scheduler = Scheduler::new(4, TokioSpawner::current()?)?;
//!
//! let handle = scheduler.add({
//!     let gpu_slots = Arc::clone(&gpu_slots);
//!     move || async move {
//!         gpu_slots.with_permit(|| run_inference(prompt)).await
//!     }
//! });
//! let output = handle.await??;
//! ```
//!
//! For complete examples, see the integration tests under `tests/`.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Named-primitive construction from configuration.
pub mod builders;
/// Configuration models for every primitive.
pub mod config;
/// Scheduler, throttle queue, and shared error types.
pub mod core;
/// Object pool.
pub mod object_pool;
/// Runtime adapters.
pub mod runtime;
/// Writer-preferring reader-writer lock.
pub mod rwlock;
/// Counting semaphore.
pub mod semaphore;
/// Shared utilities.
pub mod util;

mod wait_queue;

pub use crate::core::{
    handler_fn, ItemHandler, Scheduler, Spawn, SyncError, TaskHandle, ThrottleQueue,
};
pub use object_pool::{ObjectId, ObjectPool, ObjectPoolBuilder, Pooled};
pub use runtime::TokioSpawner;
pub use rwlock::{ReadGuard, ReadWriteLock, WriteGuard};
pub use semaphore::{Semaphore, SemaphorePermit};
