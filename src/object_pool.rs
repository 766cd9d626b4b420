//! Object pool implementation
//!
//! Recycles expensive-to-construct objects. The pool keeps a free list and
//! an in-use set; every handed-out object carries an [`ObjectId`] so that
//! returning it can be checked against the in-use set.
//!
//! Acquisition never waits: when the free list is empty a fresh object is
//! created on the spot. The optional `max` bounds only the free list, and is
//! applied when objects come back.
//!
//! # Examples
//!
//! ```
//! use prometheus_sync_kit::ObjectPool;
//!
//! let pool = ObjectPool::builder(|| Vec::<u8>::with_capacity(4096))
//!     .with_reset(|buf: &mut Vec<u8>| buf.clear())
//!     .with_max(8)
//!     .with_initial(2)
//!     .build();
//! assert_eq!(pool.available(), 2);
//!
//! let mut buf = pool.acquire();
//! buf.extend_from_slice(b"payload");
//! let id = buf.id();
//! pool.release(buf);
//!
//! let again = pool.acquire();
//! assert_eq!(again.id(), id);
//! assert!(again.is_empty());
//! ```

use std::collections::HashSet;
use std::fmt;
use std::ops::{Deref, DerefMut};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::ObjectPoolConfig;

type CreateFn<T> = Box<dyn Fn() -> T + Send + Sync>;
type ResetFn<T> = Box<dyn Fn(&mut T) + Send + Sync>;

/// Stable identity of a pooled object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectId(Uuid);

impl ObjectId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// An object checked out of (or parked in) an [`ObjectPool`].
pub struct Pooled<T> {
    id: ObjectId,
    value: T,
}

impl<T> Pooled<T> {
    /// Identity of this object, stable across release and re-acquire.
    pub const fn id(&self) -> ObjectId {
        self.id
    }
}

impl<T> Deref for Pooled<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> DerefMut for Pooled<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

impl<T: fmt::Debug> fmt::Debug for Pooled<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pooled")
            .field("id", &self.id)
            .field("value", &self.value)
            .finish()
    }
}

/// Snapshot of pool occupancy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Objects on the free list.
    pub available: usize,
    /// Objects checked out.
    pub active: usize,
    /// `available + active`.
    pub size: usize,
    /// Free-list capacity, `None` when unbounded.
    pub max: Option<usize>,
}

/// Pool of reusable objects.
pub struct ObjectPool<T> {
    create: CreateFn<T>,
    reset: Option<ResetFn<T>>,
    max: Option<usize>,
    state: Mutex<PoolState<T>>,
}

struct PoolState<T> {
    free: Vec<Pooled<T>>,
    in_use: HashSet<ObjectId>,
}

impl<T> ObjectPool<T> {
    /// Pool with default options: no reset, unbounded free list, no pre-warm.
    pub fn new<F>(create: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::builder(create).build()
    }

    /// Start configuring a pool around the `create` factory.
    pub fn builder<F>(create: F) -> ObjectPoolBuilder<T>
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        ObjectPoolBuilder {
            create: Box::new(create),
            reset: None,
            max: None,
            initial: 0,
        }
    }

    /// Take an object, reusing a free one if possible.
    pub fn acquire(&self) -> Pooled<T> {
        {
            let mut state = self.state.lock();
            if let Some(obj) = state.free.pop() {
                state.in_use.insert(obj.id);
                return obj;
            }
        }

        // factory runs outside the lock
        let obj = Pooled {
            id: ObjectId::new(),
            value: (self.create)(),
        };
        tracing::trace!(id = %obj.id, "pooled object created");
        self.state.lock().in_use.insert(obj.id);
        obj
    }

    /// Return an object to the pool.
    ///
    /// Objects the pool does not track as in use (already released, from
    /// another pool, or checked out before [`ObjectPool::clear`]) are dropped
    /// without further effect. Tracked objects are reset, then kept if the
    /// free list has room, otherwise discarded.
    ///
    /// The object stays in the in-use set while `reset` runs. A
    /// [`ObjectPool::clear`] that lands during the reset wins, and the
    /// object is discarded.
    pub fn release(&self, mut obj: Pooled<T>) {
        if !self.state.lock().in_use.contains(&obj.id) {
            tracing::debug!(id = %obj.id, "ignoring release of untracked object");
            return;
        }
        if let Some(reset) = &self.reset {
            reset(&mut obj.value);
        }

        let mut state = self.state.lock();
        if !state.in_use.remove(&obj.id) {
            tracing::debug!(id = %obj.id, "pool cleared during reset, discarding object");
            return;
        }
        if self.max.is_none_or(|max| state.free.len() < max) {
            state.free.push(obj);
        } else {
            tracing::trace!(id = %obj.id, "free list full, discarding object");
        }
    }

    /// Objects on the free list.
    pub fn available(&self) -> usize {
        self.state.lock().free.len()
    }

    /// Objects checked out.
    pub fn active(&self) -> usize {
        self.state.lock().in_use.len()
    }

    /// Objects tracked in total.
    pub fn size(&self) -> usize {
        let state = self.state.lock();
        state.free.len() + state.in_use.len()
    }

    /// Free-list capacity.
    pub const fn max(&self) -> Option<usize> {
        self.max
    }

    /// Forget every object, free or checked out. `reset` is not called.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        let dropped = state.free.len() + state.in_use.len();
        state.free.clear();
        state.in_use.clear();
        tracing::debug!(dropped, "object pool cleared");
    }

    /// Snapshot of occupancy under one lock.
    pub fn stats(&self) -> PoolStats {
        let state = self.state.lock();
        PoolStats {
            available: state.free.len(),
            active: state.in_use.len(),
            size: state.free.len() + state.in_use.len(),
            max: self.max,
        }
    }
}

impl<T> fmt::Debug for ObjectPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectPool")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

/// Builder for [`ObjectPool`].
pub struct ObjectPoolBuilder<T> {
    create: CreateFn<T>,
    reset: Option<ResetFn<T>>,
    max: Option<usize>,
    initial: usize,
}

impl<T> ObjectPoolBuilder<T> {
    /// Callback applied to each object as it is released.
    #[must_use]
    pub fn with_reset<F>(mut self, reset: F) -> Self
    where
        F: Fn(&mut T) + Send + Sync + 'static,
    {
        self.reset = Some(Box::new(reset));
        self
    }

    /// Bound the free list to `max` objects.
    #[must_use]
    pub fn with_max(mut self, max: usize) -> Self {
        self.max = Some(max);
        self
    }

    /// Create `initial` objects up front.
    #[must_use]
    pub fn with_initial(mut self, initial: usize) -> Self {
        self.initial = initial;
        self
    }

    /// Apply `max` and `initial` from configuration.
    #[must_use]
    pub fn with_config(mut self, cfg: &ObjectPoolConfig) -> Self {
        self.max = cfg.max;
        self.initial = cfg.initial;
        self
    }

    /// Build the pool, pre-warming the free list.
    ///
    /// Pre-warmed objects are not subject to `max`; the bound applies on
    /// release only.
    pub fn build(self) -> ObjectPool<T> {
        let free = (0..self.initial)
            .map(|_| Pooled {
                id: ObjectId::new(),
                value: (self.create)(),
            })
            .collect();
        ObjectPool {
            create: self.create,
            reset: self.reset,
            max: self.max,
            state: Mutex::new(PoolState {
                free,
                in_use: HashSet::new(),
            }),
        }
    }
}
