//! Tokio runtime spawner implementation.

use std::future::Future;
use std::sync::Arc;

use crate::core::{Spawn, SyncError};

/// Tokio-based spawner that runs background loops on a tokio runtime.
#[derive(Clone, Debug)]
pub struct TokioSpawner {
    handle: Arc<tokio::runtime::Handle>,
}

impl TokioSpawner {
    /// Create a `TokioSpawner` from a tokio runtime handle.
    #[must_use]
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self {
            handle: Arc::new(handle),
        }
    }

    /// Bind to the runtime the caller is running on.
    ///
    /// # Errors
    ///
    /// [`SyncError::Runtime`] when called outside a tokio runtime.
    pub fn current() -> Result<Self, SyncError> {
        tokio::runtime::Handle::try_current()
            .map(Self::new)
            .map_err(|e| SyncError::Runtime(e.to_string()))
    }
}

impl Spawn for TokioSpawner {
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handle.spawn(fut);
    }
}
