//! Configuration models for the primitives.

pub mod primitives;

pub use primitives::{
    ObjectPoolConfig, SchedulerConfig, SemaphoreConfig, ThrottleConfig, ToolkitConfig,
    CONFIG_PATH_ENV,
};
