//! The persistence adapter contract shared by every backend.

use async_trait::async_trait;

use crate::error::Result;

/// Computes the next value of a slot from its current value.
///
/// Receives `None` when the slot is empty and no default is configured.
pub type Updater<'a, T> = Box<dyn FnOnce(Option<T>) -> T + Send + 'a>;

/// A single named slot holding at most one value of type `T`.
///
/// Implementations exist for an in-process map ([`MemoryStore`]) and a JSON
/// file ([`FileStore`]); callers hold an `Arc<dyn PersistenceAdapter<T>>` and
/// do not care which one they got.
///
/// There is no locking. Two concurrent [`update`](Self::update) calls on the
/// same slot race and the last write wins.
///
/// [`MemoryStore`]: crate::MemoryStore
/// [`FileStore`]: crate::FileStore
#[async_trait]
pub trait PersistenceAdapter<T>: Send + Sync
where
    T: Send + Sync + 'static,
{
    /// Current value, else a copy of the default, else `None`.
    ///
    /// A value stored as JSON `null` counts as empty on every backend.
    async fn read(&self) -> Result<Option<T>>;

    /// Replace the slot's value wholesale.
    async fn write(&self, value: &T) -> Result<()>;

    /// Empty the slot so the next `read` yields the default.
    async fn clear(&self) -> Result<()>;

    /// Read, apply `updater`, write the result and return it.
    async fn update(&self, updater: Updater<'_, T>) -> Result<T> {
        let current = self.read().await?;
        let next = updater(current);
        self.write(&next).await?;
        Ok(next)
    }
}
