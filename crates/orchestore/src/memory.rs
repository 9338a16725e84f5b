//! In-process backend.
//!
//! A [`MemoryBackend`] is a shared map from slot key to stored JSON. Clone the
//! handle and every [`MemoryStore`] built from it sees the same slots, which
//! gives one map per process when the composing code creates a single
//! backend at startup and passes it around. Nothing survives a restart.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::adapter::PersistenceAdapter;
use crate::clone::{from_stored, to_stored};
use crate::error::Result;

/// Shared key → value map backing any number of [`MemoryStore`]s.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    slots: Arc<DashMap<String, Value>>,
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a typed store over one key of this backend.
    pub fn store<T>(&self, key: impl Into<String>) -> MemoryStore<T> {
        MemoryStore::new(self.clone(), key)
    }

    /// Whether a value is currently held for `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.slots.contains_key(key)
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Adapter over a single key of a [`MemoryBackend`].
#[derive(Debug)]
pub struct MemoryStore<T> {
    backend: MemoryBackend,
    key: String,
    default: Option<T>,
    _value: PhantomData<fn() -> T>,
}

impl<T> MemoryStore<T> {
    pub fn new(backend: MemoryBackend, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
            default: None,
            _value: PhantomData,
        }
    }

    /// Value returned by `read` while the slot is empty.
    pub fn with_default(mut self, default: T) -> Self {
        self.default = Some(default);
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

#[async_trait]
impl<T> PersistenceAdapter<T> for MemoryStore<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    async fn read(&self) -> Result<Option<T>> {
        // Decode under the shard guard but never hold it across an await.
        // A stored JSON `null` reads as empty, the same as a file whose body is `null`.
        let stored = match self.backend.slots.get(&self.key) {
            Some(entry) if !entry.value().is_null() => Some(from_stored(&self.key, entry.value())?),
            _ => None,
        };

        match stored {
            Some(value) => {
                tracing::debug!(key = %self.key, "memory slot read");
                Ok(Some(value))
            }
            None => {
                tracing::debug!(key = %self.key, "memory slot empty");
                Ok(self.default.clone())
            }
        }
    }

    async fn write(&self, value: &T) -> Result<()> {
        let stored = to_stored(value)?;
        self.backend.slots.insert(self.key.clone(), stored);
        tracing::debug!(key = %self.key, "memory slot written");
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        if self.backend.slots.remove(&self.key).is_some() {
            tracing::debug!(key = %self.key, "memory slot cleared");
        }
        Ok(())
    }
}
