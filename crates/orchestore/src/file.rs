//! FileStore: one JSON document on disk.
//!
//! The whole file body is the value, pretty-printed, with no header or
//! checksum. A missing file means "nothing saved yet".
//!
//! Writes overwrite the file in place. Nothing guards against a second
//! process writing the same path.

use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;

use crate::adapter::PersistenceAdapter;
use crate::error::{Result, StoreError};

/// Adapter backed by a single JSON file.
#[derive(Debug)]
pub struct FileStore<T> {
    path: PathBuf,
    default: Option<T>,
    _value: PhantomData<fn() -> T>,
}

/// Resolve the target file: an absolute `file_name` wins, otherwise it is
/// joined onto `directory`.
pub fn resolve_path(directory: impl AsRef<Path>, file_name: impl AsRef<Path>) -> PathBuf {
    let file_name = file_name.as_ref();
    if file_name.is_absolute() {
        file_name.to_path_buf()
    } else {
        directory.as_ref().join(file_name)
    }
}

impl<T> FileStore<T> {
    /// Store at `directory/file_name`, or at `file_name` if it is absolute.
    pub fn new(directory: impl AsRef<Path>, file_name: impl AsRef<Path>) -> Self {
        Self::at_path(resolve_path(directory, file_name))
    }

    /// Store at an exact path.
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            default: None,
            _value: PhantomData,
        }
    }

    /// Value returned by `read` while the file is absent.
    pub fn with_default(mut self, default: T) -> Self {
        self.default = Some(default);
        self
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<T: DeserializeOwned> FileStore<T> {
    async fn read_file(&self) -> Result<Option<T>> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io("read", &self.path, e)),
        };

        // A literal `null` body counts as absent.
        serde_json::from_str::<Option<T>>(&raw).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })
    }
}

#[async_trait]
impl<T> PersistenceAdapter<T> for FileStore<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    async fn read(&self) -> Result<Option<T>> {
        match self.read_file().await? {
            Some(value) => {
                tracing::debug!(path = %self.path.display(), "snapshot file read");
                Ok(Some(value))
            }
            None => {
                tracing::debug!(path = %self.path.display(), "snapshot file absent");
                Ok(self.default.clone())
            }
        }
    }

    async fn write(&self, value: &T) -> Result<()> {
        // Serialize first so a bad value never touches the disk.
        let json = serde_json::to_string_pretty(value).map_err(StoreError::Serialize)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| StoreError::io("create directory", parent, e))?;
            }
        }

        fs::write(&self.path, json)
            .await
            .map_err(|e| StoreError::io("write", &self.path, e))?;

        tracing::debug!(path = %self.path.display(), "snapshot file written");
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "snapshot file removed");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io("remove", &self.path, e)),
        }
    }
}
