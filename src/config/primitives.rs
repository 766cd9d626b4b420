//! Primitive and toolkit configuration structures.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::core::{AppResult, SyncError, DEFAULT_INTERVAL};

/// Environment variable naming the JSON configuration file.
pub const CONFIG_PATH_ENV: &str = "SYNC_KIT_CONFIG";

const fn default_max_concurrency() -> usize {
    1
}

fn default_interval_ms() -> u64 {
    u64::try_from(DEFAULT_INTERVAL.as_millis()).unwrap_or(u64::MAX)
}

/// Semaphore configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemaphoreConfig {
    /// Permits available at construction. Zero makes a closed gate.
    pub permits: usize,
}

/// Scheduler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Maximum tasks running at once.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

/// Throttle queue configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrottleConfig {
    /// Delay after each handler invocation, in milliseconds.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

/// Object pool configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectPoolConfig {
    /// Free-list capacity; unbounded when absent.
    #[serde(default)]
    pub max: Option<usize>,
    /// Objects created up front.
    #[serde(default)]
    pub initial: usize,
}

/// Root configuration: named instances of each primitive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolkitConfig {
    /// Named semaphores.
    #[serde(default)]
    pub semaphores: HashMap<String, SemaphoreConfig>,
    /// Named schedulers.
    #[serde(default)]
    pub schedulers: HashMap<String, SchedulerConfig>,
    /// Named throttle queues.
    #[serde(default)]
    pub throttles: HashMap<String, ThrottleConfig>,
    /// Named object pools.
    #[serde(default)]
    pub pools: HashMap<String, ObjectPoolConfig>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
        }
    }
}

impl SchedulerConfig {
    /// Validate scheduler configuration values.
    ///
    /// # Errors
    ///
    /// [`SyncError::InvalidConfig`] when `max_concurrency` is zero.
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.max_concurrency == 0 {
            return Err(SyncError::InvalidConfig(
                "max_concurrency must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
        }
    }
}

impl ThrottleConfig {
    /// Interval as a [`Duration`].
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl ObjectPoolConfig {
    /// Validate pool configuration values.
    ///
    /// The pool itself accepts a pre-warm count above `max`; configuration
    /// files are held to the stricter rule.
    ///
    /// # Errors
    ///
    /// [`SyncError::InvalidConfig`] when `initial` exceeds `max`.
    pub fn validate(&self) -> Result<(), SyncError> {
        if let Some(max) = self.max {
            if self.initial > max {
                return Err(SyncError::InvalidConfig(format!(
                    "initial ({}) must not exceed max ({max})",
                    self.initial
                )));
            }
        }
        Ok(())
    }
}

impl ToolkitConfig {
    /// Validate every entry and ensure at least one primitive is defined.
    ///
    /// # Errors
    ///
    /// [`SyncError::InvalidConfig`] naming the first offending entry.
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.semaphores.is_empty()
            && self.schedulers.is_empty()
            && self.throttles.is_empty()
            && self.pools.is_empty()
        {
            return Err(SyncError::InvalidConfig(
                "at least one primitive must be defined".into(),
            ));
        }
        for (name, scheduler) in &self.schedulers {
            scheduler
                .validate()
                .map_err(|e| SyncError::InvalidConfig(format!("scheduler `{name}` invalid: {e}")))?;
        }
        for (name, pool) in &self.pools {
            pool.validate()
                .map_err(|e| SyncError::InvalidConfig(format!("pool `{name}` invalid: {e}")))?;
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// [`SyncError::InvalidConfig`] on parse or validation failure.
    pub fn from_json_str(input: &str) -> Result<Self, SyncError> {
        let cfg: Self = serde_json::from_str(input)
            .map_err(|e| SyncError::InvalidConfig(format!("parse error: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read and validate a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or does not hold a valid config.
    pub fn from_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let cfg = Self::from_json_str(&raw)
            .with_context(|| format!("loading config file {}", path.display()))?;
        Ok(cfg)
    }

    /// Load `.env` if present, then read the file named by
    /// [`CONFIG_PATH_ENV`].
    ///
    /// # Errors
    ///
    /// Fails if the variable is unset or the file is unreadable or invalid.
    pub fn from_env() -> AppResult<Self> {
        if let Err(err) = dotenvy::dotenv() {
            tracing::debug!("no .env loaded: {err}");
        }
        let path = std::env::var(CONFIG_PATH_ENV)
            .with_context(|| format!("{CONFIG_PATH_ENV} is not set"))?;
        Self::from_file(path)
    }
}
