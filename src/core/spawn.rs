//! Runtime seam for background work.

use std::future::Future;

/// Abstraction for spawning the loops that drive [`Scheduler`] and
/// [`ThrottleQueue`] on a runtime.
///
/// [`Scheduler`]: crate::core::Scheduler
/// [`ThrottleQueue`]: crate::core::ThrottleQueue
pub trait Spawn: Send + Sync + 'static {
    /// Spawn a detached future.
    ///
    /// An implementation may drop `fut` without polling it to completion,
    /// e.g. when its runtime has shut down. Callers release whatever the
    /// future owns from its destructor, so a dropped loop or task never
    /// leaves a slot or the processing flag held.
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static;
}
