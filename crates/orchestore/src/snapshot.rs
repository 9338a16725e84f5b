//! Snapshot façade: the store the rest of the dashboard talks to.
//!
//! One [`SnapshotStore`] owns one slot holding a [`Snapshot`], with `{}` as
//! the default. Build it once where the application is composed and hand
//! clones to whatever needs it.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::adapter::PersistenceAdapter;
use crate::config::{BackendKind, StoreConfig, DEFAULT_SNAPSHOT_KEY};
use crate::error::Result;
use crate::file::FileStore;
use crate::memory::MemoryBackend;

/// Opaque point-in-time dump of orchestrator state.
pub type Snapshot = Map<String, Value>;

/// Load/save/update/clear over the orchestrator snapshot slot.
#[derive(Clone)]
pub struct SnapshotStore {
    adapter: Arc<dyn PersistenceAdapter<Snapshot>>,
}

impl std::fmt::Debug for SnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotStore").finish_non_exhaustive()
    }
}

impl SnapshotStore {
    /// Wrap an already configured adapter.
    ///
    /// The adapter should carry an empty-object default; [`load`](Self::load)
    /// falls back to `{}` regardless.
    pub fn new(adapter: Arc<dyn PersistenceAdapter<Snapshot>>) -> Self {
        Self { adapter }
    }

    /// Snapshot held under the reserved key of `backend`.
    pub fn memory(backend: &MemoryBackend) -> Self {
        Self::memory_with_key(backend, DEFAULT_SNAPSHOT_KEY)
    }

    pub fn memory_with_key(backend: &MemoryBackend, key: impl Into<String>) -> Self {
        let store = backend.store::<Snapshot>(key).with_default(Snapshot::new());
        Self::new(Arc::new(store))
    }

    /// Snapshot held in a JSON file at `path`.
    pub fn file(path: impl Into<std::path::PathBuf>) -> Self {
        let store = FileStore::<Snapshot>::at_path(path).with_default(Snapshot::new());
        Self::new(Arc::new(store))
    }

    /// Pick the backend named by `config`. `memory` is only consulted for the
    /// memory backend.
    pub fn from_config(config: &StoreConfig, memory: &MemoryBackend) -> Self {
        match config.backend {
            BackendKind::Memory => Self::memory_with_key(memory, config.key.clone()),
            BackendKind::File => Self::file(config.snapshot_path()),
        }
    }

    /// Current snapshot, or `{}` if none has been saved.
    pub async fn load(&self) -> Result<Snapshot> {
        Ok(self.adapter.read().await?.unwrap_or_default())
    }

    /// Replace the stored snapshot.
    pub async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        self.adapter.write(snapshot).await
    }

    /// Read-modify-write the snapshot and return the new value.
    ///
    /// Not serialized against other updates; a concurrent update to the same
    /// slot can overwrite this one.
    pub async fn update<F>(&self, updater: F) -> Result<Snapshot>
    where
        F: FnOnce(Snapshot) -> Snapshot + Send,
    {
        self.adapter
            .update(Box::new(move |current| updater(current.unwrap_or_default())))
            .await
    }

    /// Drop the stored snapshot; the next `load` returns `{}`.
    pub async fn clear(&self) -> Result<()> {
        self.adapter.clear().await
    }
}
