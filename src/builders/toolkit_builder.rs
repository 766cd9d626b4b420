//! Builders to construct primitives from a [`ToolkitConfig`].

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{ObjectPoolConfig, ThrottleConfig, ToolkitConfig};
use crate::core::{ItemHandler, Scheduler, Spawn, SyncError, ThrottleQueue};
use crate::object_pool::ObjectPool;
use crate::semaphore::Semaphore;

/// Named semaphores and schedulers built from one configuration.
#[derive(Debug)]
pub struct Toolkit<S> {
    /// Semaphores by name, shareable across tasks.
    pub semaphores: HashMap<String, Arc<Semaphore>>,
    /// Schedulers by name; clones share the same queue.
    pub schedulers: HashMap<String, Scheduler<S>>,
}

impl<S> Toolkit<S> {
    /// Look up a semaphore by name.
    pub fn semaphore(&self, name: &str) -> Option<Arc<Semaphore>> {
        self.semaphores.get(name).cloned()
    }

    /// Look up a scheduler by name.
    pub fn scheduler(&self, name: &str) -> Option<&Scheduler<S>> {
        self.schedulers.get(name)
    }
}

/// Build every semaphore and scheduler named in `cfg`.
///
/// # Errors
///
/// [`SyncError::InvalidConfig`] if the configuration does not validate.
pub fn build_toolkit<S>(cfg: &ToolkitConfig, spawner: S) -> Result<Toolkit<S>, SyncError>
where
    S: Spawn + Clone,
{
    cfg.validate()?;

    let semaphores = cfg
        .semaphores
        .iter()
        .map(|(name, sem_cfg)| (name.clone(), Arc::new(Semaphore::new(sem_cfg.permits))))
        .collect();

    let mut schedulers = HashMap::new();
    for (name, sched_cfg) in &cfg.schedulers {
        let scheduler = Scheduler::from_config(sched_cfg, spawner.clone())
            .map_err(|e| SyncError::InvalidConfig(format!("scheduler `{name}`: {e}")))?;
        schedulers.insert(name.clone(), scheduler);
    }

    tracing::debug!(
        semaphores = cfg.semaphores.len(),
        schedulers = cfg.schedulers.len(),
        "toolkit built"
    );
    Ok(Toolkit {
        semaphores,
        schedulers,
    })
}

/// Build every throttle queue named in `cfg`, asking `handler_factory` for
/// each queue's handler.
///
/// # Errors
///
/// [`SyncError::InvalidConfig`] if the configuration does not validate, or
/// whatever error the factory returns.
pub fn build_throttle_queues<T, H, S, FH>(
    cfg: &ToolkitConfig,
    mut handler_factory: FH,
    spawner: S,
) -> Result<HashMap<String, ThrottleQueue<T, H, S>>, SyncError>
where
    T: Send + 'static,
    H: ItemHandler<T>,
    S: Spawn + Clone,
    FH: FnMut(&str, &ThrottleConfig) -> Result<H, SyncError>,
{
    cfg.validate()?;

    let mut queues = HashMap::new();
    for (name, throttle_cfg) in &cfg.throttles {
        let handler = handler_factory(name, throttle_cfg)?;
        let queue = ThrottleQueue::from_config(handler, throttle_cfg, spawner.clone());
        queues.insert(name.clone(), queue);
    }
    Ok(queues)
}

/// Build every object pool named in `cfg`, asking `create_factory` for each
/// pool's object factory.
///
/// # Errors
///
/// [`SyncError::InvalidConfig`] if the configuration does not validate, or
/// whatever error the factory returns.
pub fn build_object_pools<T, F, FC>(
    cfg: &ToolkitConfig,
    mut create_factory: FC,
) -> Result<HashMap<String, ObjectPool<T>>, SyncError>
where
    F: Fn() -> T + Send + Sync + 'static,
    FC: FnMut(&str, &ObjectPoolConfig) -> Result<F, SyncError>,
{
    cfg.validate()?;

    let mut pools = HashMap::new();
    for (name, pool_cfg) in &cfg.pools {
        let create = create_factory(name, pool_cfg)?;
        let pool = ObjectPool::builder(create).with_config(pool_cfg).build();
        pools.insert(name.clone(), pool);
    }
    Ok(pools)
}
