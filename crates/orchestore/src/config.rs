//! Store configuration with file and environment variable loading.
//!
//! Load order (later wins):
//! 1. Compiled defaults
//! 2. `~/.config/orchestore/config.toml` (user)
//! 3. `./orchestore.toml`, or an explicit path passed by the caller
//! 4. Environment variables (`ORCHESTORE_*`)
//!
//! Config files carry a `[store]` section:
//!
//! ```toml
//! [store]
//! backend = "file"
//! directory = "~/invoice-dashboard/data/orchestrator"
//! file_name = "store.json"
//! state_file_name = "orchestrator-state.json"
//! key = "orchestrator"
//! log_level = "info"
//! ```

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

use crate::file::resolve_path;

/// Default snapshot slot key (memory backend).
pub const DEFAULT_SNAPSHOT_KEY: &str = "orchestrator";

/// Default state slot key (memory backend).
pub const DEFAULT_STATE_KEY: &str = "orchestrator-state";

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid value {value:?} for {field}")]
    InvalidValue { field: &'static str, value: String },
}

/// Which backend holds the slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// Shared in-process map; nothing survives a restart.
    Memory,
    /// One JSON file per slot.
    #[default]
    File,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Memory => f.write_str("memory"),
            BackendKind::File => f.write_str("file"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" | "mem" => Ok(BackendKind::Memory),
            "file" | "fs" => Ok(BackendKind::File),
            _ => Err(ConfigError::InvalidValue {
                field: "backend",
                value: s.to_string(),
            }),
        }
    }
}

/// Configuration for the snapshot and state stores.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    /// Backend used for both stores.
    pub backend: BackendKind,

    /// Directory holding the JSON files (file backend).
    /// Default: data/orchestrator
    pub directory: PathBuf,

    /// Snapshot file, relative to `directory` unless absolute.
    /// Default: store.json
    pub file_name: PathBuf,

    /// Orchestrator state file, relative to `directory` unless absolute.
    /// Default: orchestrator-state.json
    pub state_file_name: PathBuf,

    /// Snapshot slot key (memory backend).
    /// Default: orchestrator
    pub key: String,

    /// Log filter (trace, debug, info, warn, error, or a full EnvFilter directive).
    /// Default: info
    pub log_level: String,
}

impl StoreConfig {
    fn default_directory() -> PathBuf {
        PathBuf::from("data").join("orchestrator")
    }

    fn default_file_name() -> PathBuf {
        PathBuf::from("store.json")
    }

    fn default_state_file_name() -> PathBuf {
        PathBuf::from("orchestrator-state.json")
    }

    fn default_key() -> String {
        DEFAULT_SNAPSHOT_KEY.to_string()
    }

    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            directory: Self::default_directory(),
            file_name: Self::default_file_name(),
            state_file_name: Self::default_state_file_name(),
            key: Self::default_key(),
            log_level: Self::default_log_level(),
        }
    }
}

/// On-disk layout of a config file. Sections other than `[store]` are ignored.
#[derive(Debug, Deserialize)]
struct ConfigFile {
    store: Option<StoreSection>,
}

/// `[store]` keys; any key left out keeps the value it is layered over.
#[derive(Debug, Deserialize)]
struct StoreSection {
    backend: Option<String>,
    directory: Option<String>,
    file_name: Option<String>,
    state_file_name: Option<String>,
    key: Option<String>,
    log_level: Option<String>,
}

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

impl StoreConfig {
    /// Config for a file backend rooted at `directory`.
    pub fn with_directory(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            ..Self::default()
        }
    }

    /// Config for the memory backend.
    pub fn memory() -> Self {
        Self {
            backend: BackendKind::Memory,
            ..Self::default()
        }
    }

    /// Resolved snapshot file path.
    pub fn snapshot_path(&self) -> PathBuf {
        resolve_path(&self.directory, &self.file_name)
    }

    /// Resolved orchestrator state file path.
    pub fn state_path(&self) -> PathBuf {
        resolve_path(&self.directory, &self.state_file_name)
    }

    /// Load from defaults, discovered files and the environment.
    pub fn load() -> Result<(Self, ConfigSources), ConfigError> {
        Self::load_from(None)
    }

    /// Like [`load`](Self::load), with `config_path` replacing `./orchestore.toml`.
    pub fn load_from(config_path: Option<&Path>) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut config = StoreConfig::default();

        for path in discover_config_files(config_path)? {
            config = Self::from_file_over(&path, config)?;
            sources.files.push(path);
        }

        config.apply_overrides(&mut sources, |name| env::var(name).ok());

        Ok((config, sources))
    }

    /// Load a single TOML file on top of the defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        Self::from_file_over(path, StoreConfig::default())
    }

    fn from_file_over(path: &Path, base: StoreConfig) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        parse_toml(&contents, path, base)
    }

    /// Apply `ORCHESTORE_*` overrides read through `lookup`.
    ///
    /// Values that fail to parse are skipped with a warning.
    pub fn apply_overrides<F>(&mut self, sources: &mut ConfigSources, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("ORCHESTORE_BACKEND") {
            match v.parse() {
                Ok(backend) => {
                    self.backend = backend;
                    sources.env_overrides.push("ORCHESTORE_BACKEND".to_string());
                }
                Err(e) => tracing::warn!("ignoring ORCHESTORE_BACKEND: {}", e),
            }
        }
        if let Some(v) = lookup("ORCHESTORE_DIR") {
            self.directory = expand_path(&v);
            sources.env_overrides.push("ORCHESTORE_DIR".to_string());
        }
        if let Some(v) = lookup("ORCHESTORE_FILE") {
            self.file_name = expand_path(&v);
            sources.env_overrides.push("ORCHESTORE_FILE".to_string());
        }
        if let Some(v) = lookup("ORCHESTORE_STATE_FILE") {
            self.state_file_name = expand_path(&v);
            sources.env_overrides.push("ORCHESTORE_STATE_FILE".to_string());
        }
        if let Some(v) = lookup("ORCHESTORE_KEY") {
            self.key = v;
            sources.env_overrides.push("ORCHESTORE_KEY".to_string());
        }
        if let Some(v) = lookup("ORCHESTORE_LOG_LEVEL") {
            self.log_level = v;
            sources.env_overrides.push("ORCHESTORE_LOG_LEVEL".to_string());
        } else if let Some(v) = lookup("RUST_LOG") {
            self.log_level = v;
            sources.env_overrides.push("RUST_LOG".to_string());
        }
    }

    /// Serialize config to a TOML string.
    pub fn to_toml(&self) -> String {
        let mut output = String::new();

        output.push_str("# Orchestore Configuration\n\n");
        output.push_str("[store]\n");
        output.push_str(&format!("backend = {}\n", toml_string(&self.backend.to_string())));
        output.push_str(&format!("directory = {}\n", toml_string(&self.directory.to_string_lossy())));
        output.push_str(&format!("file_name = {}\n", toml_string(&self.file_name.to_string_lossy())));
        output.push_str(&format!(
            "state_file_name = {}\n",
            toml_string(&self.state_file_name.to_string_lossy())
        ));
        output.push_str(&format!("key = {}\n", toml_string(&self.key)));
        output.push_str(&format!("log_level = {}\n", toml_string(&self.log_level)));

        output
    }
}

/// A TOML string literal for `s`, quoted and escaped.
fn toml_string(s: &str) -> String {
    toml::Value::String(s.to_string()).to_string()
}

/// Discover config files, optionally with an explicit override path.
///
/// An explicit path must exist; it replaces `./orchestore.toml`.
pub fn discover_config_files(explicit: Option<&Path>) -> Result<Vec<PathBuf>, ConfigError> {
    let mut files = Vec::new();

    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("orchestore/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    if let Some(path) = explicit {
        if !path.exists() {
            return Err(ConfigError::FileRead {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "config file not found"),
            });
        }
        files.push(path.to_path_buf());
        return Ok(files);
    }

    let local = PathBuf::from("orchestore.toml");
    if local.exists() {
        files.push(local);
    }

    Ok(files)
}

/// Parse a `[store]` section over `base`. Keys that are absent keep their
/// `base` value; a file without a `[store]` section changes nothing.
fn parse_toml(contents: &str, path: &Path, base: StoreConfig) -> Result<StoreConfig, ConfigError> {
    let file: ConfigFile = toml::from_str(contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let Some(section) = file.store else {
        return Ok(base);
    };

    let mut config = base;

    if let Some(v) = section.backend {
        config.backend = v.parse()?;
    }
    if let Some(v) = section.directory {
        config.directory = expand_path(&v);
    }
    if let Some(v) = section.file_name {
        config.file_name = expand_path(&v);
    }
    if let Some(v) = section.state_file_name {
        config.state_file_name = expand_path(&v);
    }
    if let Some(v) = section.key {
        config.key = v;
    }
    if let Some(v) = section.log_level {
        config.log_level = v;
    }

    Ok(config)
}

/// Expand `~/` and `$VAR/` prefixes in a path.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            return home.join(stripped);
        }
    } else if let Some(stripped) = path.strip_prefix('$') {
        let (var_name, rest) = match stripped.find('/') {
            Some(slash_pos) => (&stripped[..slash_pos], Some(&stripped[slash_pos + 1..])),
            None => (stripped, None),
        };
        if let Ok(var_value) = env::var(var_name) {
            let base = PathBuf::from(var_value);
            return match rest {
                Some(rest) => base.join(rest),
                None => base,
            };
        }
    }

    PathBuf::from(path)
}
