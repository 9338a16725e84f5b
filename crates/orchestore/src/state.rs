//! Versioned orchestrator state: feature workflows and agent handoffs.
//!
//! Layered on a `PersistenceAdapter<Value>` so it works over either backend.
//! Workflow and handoff records are kept as opaque JSON; the registry that
//! produces them owns their shape.
//!
//! A stored document that cannot be read as state (bad JSON, not an object)
//! is logged and replaced by a fresh default rather than failing the caller.
//! Inside an object each field is read on its own: a missing, `null` or
//! malformed field takes its default and the other fields are kept.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::adapter::PersistenceAdapter;
use crate::clone::to_stored;
use crate::config::{BackendKind, StoreConfig, DEFAULT_STATE_KEY};
use crate::error::Result;
use crate::file::FileStore;
use crate::memory::MemoryBackend;

/// Current on-disk layout version.
pub const STATE_VERSION: u32 = 1;

/// Handoff records grouped by workflow id.
pub type Handoffs = BTreeMap<String, Vec<Value>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorState {
    #[serde(default = "default_version", deserialize_with = "lenient_version")]
    pub version: u32,

    #[serde(default, deserialize_with = "lenient")]
    pub workflows: Vec<Value>,

    #[serde(default, deserialize_with = "lenient")]
    pub handoffs: Handoffs,

    #[serde(default = "Utc::now", deserialize_with = "lenient_timestamp")]
    pub updated_at: DateTime<Utc>,
}

fn default_version() -> u32 {
    STATE_VERSION
}

/// `null` or a value of the wrong type reads as `T::default()`.
fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let Some(raw) = Option::<Value>::deserialize(deserializer)? else {
        return Ok(T::default());
    };
    match serde_json::from_value(raw) {
        Ok(value) => Ok(value),
        Err(e) => {
            tracing::warn!(error = %e, "ignoring malformed orchestrator state field");
            Ok(T::default())
        }
    }
}

fn lenient_version<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(STATE_VERSION))
}

fn lenient_timestamp<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(Value::as_str)
        .and_then(parse_timestamp)
        .unwrap_or_else(Utc::now))
}

/// RFC 3339, a zone-less date-time (taken as UTC), or a bare date (midnight UTC).
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, format) {
            return Some(ts.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ts| ts.and_utc())
}

impl Default for OrchestratorState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            workflows: Vec::new(),
            handoffs: Handoffs::new(),
            updated_at: Utc::now(),
        }
    }
}

/// Loads and saves [`OrchestratorState`] through one adapter slot.
#[derive(Clone)]
pub struct StateStore {
    adapter: Arc<dyn PersistenceAdapter<Value>>,
}

impl std::fmt::Debug for StateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateStore").finish_non_exhaustive()
    }
}

impl StateStore {
    pub fn new(adapter: Arc<dyn PersistenceAdapter<Value>>) -> Self {
        Self { adapter }
    }

    pub fn memory(backend: &MemoryBackend) -> Self {
        Self::new(Arc::new(backend.store::<Value>(DEFAULT_STATE_KEY)))
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(FileStore::<Value>::at_path(path)))
    }

    pub fn from_config(config: &StoreConfig, memory: &MemoryBackend) -> Self {
        match config.backend {
            BackendKind::Memory => Self::memory(memory),
            BackendKind::File => Self::file(config.state_path()),
        }
    }

    /// Stored state, a fresh default when nothing is stored, or a fresh
    /// default when the stored document is unreadable or not an object.
    pub async fn load(&self) -> Result<OrchestratorState> {
        let raw = match self.adapter.read().await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Ok(OrchestratorState::default()),
            Err(e) if e.is_corrupt() => {
                tracing::warn!(error = %e, "failed to parse persisted orchestrator state, resetting");
                return Ok(OrchestratorState::default());
            }
            Err(e) => return Err(e),
        };

        if !raw.is_object() {
            tracing::warn!("persisted orchestrator state is not an object, resetting");
            return Ok(OrchestratorState::default());
        }
        match serde_json::from_value(raw) {
            Ok(state) => Ok(state),
            Err(e) => {
                tracing::warn!(error = %e, "persisted orchestrator state has unexpected shape, resetting");
                Ok(OrchestratorState::default())
            }
        }
    }

    /// Stamp `updated_at` and write the whole document.
    pub async fn save(&self, mut state: OrchestratorState) -> Result<OrchestratorState> {
        state.updated_at = Utc::now();
        let stored = to_stored(&state)?;
        self.adapter.write(&stored).await?;
        tracing::debug!(
            workflows = state.workflows.len(),
            handoffs = state.handoffs.len(),
            "orchestrator state saved"
        );
        Ok(state)
    }

    /// Replace the workflow list, keeping handoffs.
    pub async fn save_workflows(&self, workflows: Vec<Value>) -> Result<OrchestratorState> {
        let mut state = self.load().await?;
        state.workflows = workflows;
        self.save(state).await
    }

    /// Replace all handoffs, keeping workflows.
    pub async fn save_handoffs(&self, handoffs: Handoffs) -> Result<OrchestratorState> {
        let mut state = self.load().await?;
        state.handoffs = handoffs;
        self.save(state).await
    }

    /// Append one handoff record under `workflow_id`.
    pub async fn record_handoff(
        &self,
        workflow_id: impl Into<String>,
        record: Value,
    ) -> Result<OrchestratorState> {
        let mut state = self.load().await?;
        state.handoffs.entry(workflow_id.into()).or_default().push(record);
        self.save(state).await
    }

    pub async fn clear(&self) -> Result<()> {
        self.adapter.clear().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_absent_state_is_default() {
        let store = StateStore::memory(&MemoryBackend::new());
        let state = store.load().await.unwrap();
        assert_eq!(state.version, STATE_VERSION);
        assert!(state.workflows.is_empty());
        assert!(state.handoffs.is_empty());
    }

    #[tokio::test]
    async fn test_partial_document_fills_defaults() {
        let backend = MemoryBackend::new();
        backend
            .store::<Value>(DEFAULT_STATE_KEY)
            .write(&json!({"workflows": [{"id": "FT-001"}]}))
            .await
            .unwrap();

        let state = StateStore::memory(&backend).load().await.unwrap();
        assert_eq!(state.version, 1);
        assert_eq!(state.workflows, vec![json!({"id": "FT-001"})]);
        assert!(state.handoffs.is_empty());
    }

    async fn load_raw(raw: Value) -> OrchestratorState {
        let backend = MemoryBackend::new();
        backend.store::<Value>(DEFAULT_STATE_KEY).write(&raw).await.unwrap();
        StateStore::memory(&backend).load().await.unwrap()
    }

    #[tokio::test]
    async fn test_wrong_field_type_defaults_only_that_field() {
        let state = load_raw(json!({
            "workflows": "not a list",
            "handoffs": {"FT-1": [{"seq": 1}]}
        }))
        .await;

        assert!(state.workflows.is_empty());
        assert_eq!(state.handoffs["FT-1"], vec![json!({"seq": 1})]);
    }

    #[tokio::test]
    async fn test_null_fields_take_defaults() {
        let state = load_raw(json!({
            "version": null,
            "workflows": null,
            "handoffs": {"FT-1": [{"seq": 1}]},
            "updatedAt": null
        }))
        .await;

        assert_eq!(state.version, STATE_VERSION);
        assert!(state.workflows.is_empty());
        assert_eq!(state.handoffs.get("FT-1").map(Vec::len), Some(1));

        let state = load_raw(json!({"workflows": [{"id": "FT-2"}], "handoffs": null})).await;
        assert_eq!(state.workflows.len(), 1);
        assert!(state.handoffs.is_empty());
    }

    #[tokio::test]
    async fn test_date_only_updated_at_is_accepted() {
        let state = load_raw(json!({
            "workflows": [{"id": "FT-1"}],
            "updatedAt": "2025-01-01"
        }))
        .await;

        assert_eq!(state.workflows.len(), 1);
        assert_eq!(state.updated_at.to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }

    #[tokio::test]
    async fn test_unparseable_updated_at_keeps_workflows() {
        let state = load_raw(json!({
            "workflows": [{"id": "FT-1"}],
            "updatedAt": "last tuesday"
        }))
        .await;

        assert_eq!(state.workflows.len(), 1);
        assert!(state.updated_at.timestamp() > 0);
    }

    #[tokio::test]
    async fn test_null_workflows_on_disk_survive_record_handoff() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("orchestrator-state.json");
        std::fs::write(
            &path,
            r#"{"workflows": null, "handoffs": {"FT-1": [{"seq": 1}]}, "updatedAt": "2025-01-01"}"#,
        )
        .unwrap();

        let store = StateStore::file(&path);
        store.record_handoff("FT-1", json!({"seq": 2})).await.unwrap();

        let reopened = StateStore::file(&path).load().await.unwrap();
        assert_eq!(reopened.handoffs["FT-1"], vec![json!({"seq": 1}), json!({"seq": 2})]);
        assert!(reopened.workflows.is_empty());
    }

    #[tokio::test]
    async fn test_non_object_document_resets() {
        let state = load_raw(json!([{"id": "FT-1"}])).await;
        assert!(state.workflows.is_empty());
        assert_eq!(state.version, STATE_VERSION);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = "2025-03-04T05:06:07+00:00";
        for input in [
            "2025-03-04T05:06:07Z",
            "2025-03-04T07:06:07+02:00",
            "2025-03-04T05:06:07",
            "2025-03-04 05:06:07",
        ] {
            assert_eq!(parse_timestamp(input).unwrap().to_rfc3339(), expected, "{input}");
        }
        assert!(parse_timestamp("2025-13-01").is_none());
        assert!(parse_timestamp("").is_none());
    }

    #[tokio::test]
    async fn test_corrupt_file_resets() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("orchestrator-state.json");
        std::fs::write(&path, "{\"version\": 1, \"workflows\": [").unwrap();

        let state = StateStore::file(&path).load().await.unwrap();
        assert_eq!(state.version, STATE_VERSION);
        assert!(state.workflows.is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_path_still_errors() {
        let temp_dir = TempDir::new().unwrap();
        // A directory where the file should be is an I/O failure, not corruption.
        let store = StateStore::file(temp_dir.path());
        assert!(store.load().await.is_err());
    }

    #[tokio::test]
    async fn test_save_stamps_updated_at() {
        let store = StateStore::memory(&MemoryBackend::new());
        let stale = OrchestratorState {
            updated_at: DateTime::<Utc>::from_timestamp(0, 0).unwrap(),
            ..OrchestratorState::default()
        };

        let saved = store.save(stale).await.unwrap();
        assert!(saved.updated_at.timestamp() > 0);
        assert_eq!(store.load().await.unwrap(), saved);
    }

    #[tokio::test]
    async fn test_save_workflows_keeps_handoffs() {
        let store = StateStore::memory(&MemoryBackend::new());
        store
            .record_handoff("FT-001", json!({"from": "design-system", "to": "schema-architect"}))
            .await
            .unwrap();

        let state = store
            .save_workflows(vec![json!({"id": "FT-001", "title": "Invoice filters"})])
            .await
            .unwrap();

        assert_eq!(state.workflows.len(), 1);
        assert_eq!(state.handoffs["FT-001"].len(), 1);
    }

    #[tokio::test]
    async fn test_save_handoffs_keeps_workflows() {
        let store = StateStore::memory(&MemoryBackend::new());
        store.save_workflows(vec![json!({"id": "FT-002"})]).await.unwrap();

        let mut handoffs = Handoffs::new();
        handoffs.insert("FT-002".into(), vec![json!({"status": "completed"})]);
        let state = store.save_handoffs(handoffs).await.unwrap();

        assert_eq!(state.workflows, vec![json!({"id": "FT-002"})]);
        assert_eq!(state.handoffs["FT-002"], vec![json!({"status": "completed"})]);
    }

    #[tokio::test]
    async fn test_record_handoff_appends() {
        let store = StateStore::memory(&MemoryBackend::new());
        store.record_handoff("FT-003", json!({"seq": 1})).await.unwrap();
        let state = store.record_handoff("FT-003", json!({"seq": 2})).await.unwrap();

        assert_eq!(state.handoffs["FT-003"], vec![json!({"seq": 1}), json!({"seq": 2})]);
    }

    #[tokio::test]
    async fn test_file_layout_is_camel_case() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data").join("orchestrator-state.json");
        let store = StateStore::file(&path);

        store.save(OrchestratorState::default()).await.unwrap();

        let body: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(body["version"], json!(1));
        assert!(body.get("updatedAt").is_some());
        assert!(body.get("updated_at").is_none());
    }

    #[tokio::test]
    async fn test_clear_returns_to_default() {
        let store = StateStore::memory(&MemoryBackend::new());
        store.save_workflows(vec![json!({"id": "FT-004"})]).await.unwrap();
        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().workflows.is_empty());
    }
}
