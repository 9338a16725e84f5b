//! Snapshot persistence for the invoice dashboard orchestrator.
//!
//! A [`PersistenceAdapter`] is one named slot holding at most one value, with
//! two interchangeable backends:
//! - [`MemoryStore`]: slots in a shared in-process map ([`MemoryBackend`])
//! - [`FileStore`]: one pretty-printed JSON file, parent directories created on demand
//!
//! On top of that sit [`SnapshotStore`], the façade holding the opaque
//! orchestrator [`Snapshot`], and [`StateStore`], the versioned
//! workflows/handoffs document.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use orchestore::{MemoryBackend, SnapshotStore, StoreConfig};
//!
//! # async fn demo() -> orchestore::Result<()> {
//! let (config, _sources) = StoreConfig::load().expect("config");
//! let memory = MemoryBackend::new();
//! let snapshots = SnapshotStore::from_config(&config, &memory);
//!
//! snapshots
//!     .update(|mut snapshot| {
//!         snapshot.insert("lastExport".into(), serde_json::json!("2026-10-01"));
//!         snapshot
//!     })
//!     .await?;
//!
//! let current = snapshots.load().await?;
//! println!("{} keys", current.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Concurrency
//!
//! Nothing is locked. `update` is read-then-write, so two updates of the same
//! slot racing each other lose one result. Callers that need more must
//! serialize access themselves.

pub mod adapter;
pub mod clone;
pub mod config;
pub mod error;
pub mod file;
pub mod memory;
pub mod snapshot;
pub mod state;

// Re-exports for convenience
pub use adapter::{PersistenceAdapter, Updater};
pub use clone::safe_clone;
pub use config::{BackendKind, ConfigError, ConfigSources, StoreConfig, DEFAULT_SNAPSHOT_KEY};
pub use error::{Result, StoreError};
pub use file::FileStore;
pub use memory::{MemoryBackend, MemoryStore};
pub use snapshot::{Snapshot, SnapshotStore};
pub use state::{Handoffs, OrchestratorState, StateStore, STATE_VERSION};
