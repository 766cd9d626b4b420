//! Item handler abstraction for throttled consumers.

use std::future::Future;

use async_trait::async_trait;

/// Consumer of items drained from a [`ThrottleQueue`].
///
/// The queue awaits each call before starting its inter-item delay, so a
/// slow handler stretches the spacing rather than overlapping with the next
/// item.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use prometheus_sync_kit::core::ItemHandler;
///
/// struct Notifier;
///
/// #[async_trait]
/// impl ItemHandler<String> for Notifier {
///     async fn handle(&self, message: String) -> anyhow::Result<()> {
///         send_notification(&message).await?;
///         Ok(())
///     }
/// }
/// ```
///
/// [`ThrottleQueue`]: crate::core::ThrottleQueue
#[async_trait]
pub trait ItemHandler<T>: Send + Sync + 'static
where
    T: Send + 'static,
{
    /// Process one item.
    ///
    /// An `Err` is logged by the queue; it does not stop processing of the
    /// remaining items.
    async fn handle(&self, item: T) -> anyhow::Result<()>;
}

/// Adapter turning an async closure into an [`ItemHandler`].
#[derive(Clone)]
pub struct FnHandler<F> {
    f: F,
}

/// Wrap `f` as an [`ItemHandler`].
pub const fn handler_fn<T, F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = anyhow::Result<()>>,
{
    FnHandler { f }
}

#[async_trait]
impl<T, F, Fut> ItemHandler<T> for FnHandler<F>
where
    T: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn handle(&self, item: T) -> anyhow::Result<()> {
        (self.f)(item).await
    }
}
