//! Task-driving primitives, their runtime seam, and the crate error type.

pub mod error;
pub mod handler;
pub mod scheduler;
pub mod spawn;
pub mod throttle;

pub use error::{AppResult, SyncError};
pub use handler::{handler_fn, FnHandler, ItemHandler};
pub use scheduler::{Scheduler, SchedulerStats, TaskHandle};
pub use spawn::Spawn;
pub use throttle::{ThrottleQueue, ThrottleStats, DEFAULT_INTERVAL};
