//! CLI command implementations

use anyhow::{bail, Context, Result};
use orchestore::{ConfigSources, Snapshot, SnapshotStore, StateStore, StoreConfig};
use serde_json::Value;

/// Parse a CLI value as JSON, falling back to a plain string.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

pub async fn show(store: &SnapshotStore) -> Result<()> {
    let snapshot = store.load().await.context("Failed to load snapshot")?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

pub async fn save(store: &SnapshotStore, json: &str) -> Result<()> {
    let snapshot = match serde_json::from_str::<Value>(json).context("Failed to parse JSON")? {
        Value::Object(map) => map,
        other => bail!("Snapshot must be a JSON object, got: {}", other),
    };

    store.save(&snapshot).await.context("Failed to save snapshot")?;
    tracing::info!(keys = snapshot.len(), "snapshot saved");
    Ok(())
}

pub async fn set(store: &SnapshotStore, key: String, raw: &str) -> Result<()> {
    let value = parse_value(raw);
    let snapshot = store
        .update(move |mut snapshot: Snapshot| {
            snapshot.insert(key, value);
            snapshot
        })
        .await
        .context("Failed to update snapshot")?;

    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

pub async fn unset(store: &SnapshotStore, key: &str) -> Result<()> {
    let mut removed = false;
    let snapshot = store
        .update(|mut snapshot: Snapshot| {
            removed = snapshot.remove(key).is_some();
            snapshot
        })
        .await
        .context("Failed to update snapshot")?;

    if !removed {
        tracing::warn!(key, "key was not present");
    }
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

pub async fn clear(store: &SnapshotStore) -> Result<()> {
    store.clear().await.context("Failed to clear snapshot")?;
    tracing::info!("snapshot cleared");
    Ok(())
}

pub async fn state(store: &StateStore) -> Result<()> {
    let state = store.load().await.context("Failed to load orchestrator state")?;
    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}

pub fn path(config: &StoreConfig) {
    println!("snapshot: {}", config.snapshot_path().display());
    println!("state:    {}", config.state_path().display());
}

pub fn config(config: &StoreConfig, sources: &ConfigSources) {
    print!("{}", config.to_toml());

    if !sources.files.is_empty() || !sources.env_overrides.is_empty() {
        println!();
        for file in &sources.files {
            println!("# from file: {}", file.display());
        }
        for var in &sources.env_overrides {
            println!("# from env: {}", var);
        }
    }
}
