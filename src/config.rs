//! Persisted lock configuration.
//!
//! Settings live in a flat key/value namespace, one JSON object on disk.
//! Reads never fail: missing or corrupt values resolve to defaults.

use crate::color::Color;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

/// Namespace identifier of the settings file.
pub const PREFS_NAMESPACE: &str = "GoalockPrefs";

pub const KEY_ENABLED: &str = "enabled";
pub const KEY_GOAL_TEXT: &str = "goalText";
pub const KEY_BACKGROUND_COLOR: &str = "backgroundColor";
pub const KEY_TEXT_COLOR: &str = "textColor";

/// Key written by older builds for the enabled flag.
pub const LEGACY_KEY_ENABLED: &str = "lockScreenServiceEnabled";

/// Goal text shown until the user sets one.
pub const DEFAULT_GOAL_TEXT: &str = "Set your goal";
pub const DEFAULT_BACKGROUND_COLOR: Color = Color::GREEN;
pub const DEFAULT_TEXT_COLOR: Color = Color::WHITE;

/// Resolved lock configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LockConfig {
    /// Whether the coordinator should be running at all
    pub enabled: bool,
    /// Message shown on the overlay
    pub goal_text: String,
    pub background_color: Color,
    pub text_color: Color,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            goal_text: DEFAULT_GOAL_TEXT.to_string(),
            background_color: DEFAULT_BACKGROUND_COLOR,
            text_color: DEFAULT_TEXT_COLOR,
        }
    }
}

/// A partial update; every `Some` field is overwritten independently.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigUpdate {
    pub enabled: Option<bool>,
    pub goal_text: Option<String>,
    pub background_color: Option<Color>,
    pub text_color: Option<Color>,
}

impl ConfigUpdate {
    pub fn goal_text(text: impl Into<String>) -> Self {
        Self {
            goal_text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn colors(background: Color, text: Color) -> Self {
        Self {
            background_color: Some(background),
            text_color: Some(text),
            ..Self::default()
        }
    }

    fn into_entries(self) -> Vec<(&'static str, Value)> {
        let mut entries = Vec::new();
        if let Some(enabled) = self.enabled {
            entries.push((KEY_ENABLED, Value::Bool(enabled)));
        }
        if let Some(text) = self.goal_text {
            entries.push((KEY_GOAL_TEXT, Value::String(text)));
        }
        if let Some(color) = self.background_color {
            entries.push((KEY_BACKGROUND_COLOR, Value::String(color.to_hex())));
        }
        if let Some(color) = self.text_color {
            entries.push((KEY_TEXT_COLOR, Value::String(color.to_hex())));
        }
        entries
    }
}

/// Key/value store backing [`LockConfig`].
///
/// Each write replaces the whole file through a temp-file rename, so a
/// reader in another process sees either the old or the new contents.
/// Concurrent writers are last-write-wins.
#[derive(Debug)]
pub struct ConfigStore {
    path: Option<PathBuf>,
    values: Mutex<Map<String, Value>>,
}

impl ConfigStore {
    /// A store that lives only in memory.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            values: Mutex::new(Map::new()),
        }
    }

    /// Open (or lazily create) the store at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = read_values(&path).unwrap_or_else(|e| {
            warn!(path = %path.display(), "Ignoring unreadable settings file: {e}");
            Map::new()
        });

        Self {
            path: Some(path),
            values: Mutex::new(values),
        }
    }

    /// Open the store at the default per-user location.
    pub fn open_default() -> Self {
        Self::open(Self::default_path())
    }

    /// Default settings file location.
    pub fn default_path() -> PathBuf {
        Self::data_dir().join(format!("{PREFS_NAMESPACE}.json"))
    }

    /// Directory holding the settings file and the activity log.
    pub fn data_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("goalock")
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Current configuration, with defaults substituted for anything missing or malformed.
    pub fn get(&self) -> LockConfig {
        resolve(&self.lock())
    }

    /// Apply a partial update and persist it. Nothing changes if the write fails.
    pub fn set(&self, update: ConfigUpdate) -> Result<(), ConfigError> {
        let mut values = self.lock();
        let mut next = values.clone();
        for (key, value) in update.into_entries() {
            next.insert(key.to_string(), value);
        }
        self.persist(&next)?;
        *values = next;
        Ok(())
    }

    pub fn set_enabled(&self, enabled: bool) -> Result<(), ConfigError> {
        self.set(ConfigUpdate {
            enabled: Some(enabled),
            ..ConfigUpdate::default()
        })
    }

    /// Write a raw value under `key` without validation.
    pub fn set_value(&self, key: &str, value: impl Into<Value>) -> Result<(), ConfigError> {
        let mut values = self.lock();
        let mut next = values.clone();
        next.insert(key.to_string(), value.into());
        self.persist(&next)?;
        *values = next;
        Ok(())
    }

    /// Re-read the backing file. Returns true when the resolved config changed.
    pub fn reload(&self) -> bool {
        let Some(path) = self.path.as_ref() else {
            return false;
        };

        let fresh = match read_values(path) {
            Ok(values) => values,
            Err(e) => {
                warn!(path = %path.display(), "Could not reload settings: {e}");
                return false;
            }
        };

        let mut values = self.lock();
        let before = resolve(&values);
        *values = fresh;
        resolve(&values) != before
    }

    fn lock(&self) -> MutexGuard<'_, Map<String, Value>> {
        self.values.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn persist(&self, values: &Map<String, Value>) -> Result<(), ConfigError> {
        let Some(path) = self.path.as_ref() else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(values)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, content).map_err(|e| ConfigError::IoError(e.to_string()))?;
        std::fs::rename(&tmp, path).map_err(|e| ConfigError::IoError(e.to_string()))?;

        debug!(path = %path.display(), "Settings saved");
        Ok(())
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

fn read_values(path: &Path) -> Result<Map<String, Value>, ConfigError> {
    if !path.exists() {
        return Ok(Map::new());
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
    match serde_json::from_str::<Value>(&content) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ConfigError::ParseError("settings root is not an object".into())),
        Err(e) => Err(ConfigError::ParseError(e.to_string())),
    }
}

fn resolve(values: &Map<String, Value>) -> LockConfig {
    let enabled = values
        .get(KEY_ENABLED)
        .or_else(|| values.get(LEGACY_KEY_ENABLED))
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let goal_text = values
        .get(KEY_GOAL_TEXT)
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| DEFAULT_GOAL_TEXT.to_string());

    LockConfig {
        enabled,
        goal_text,
        background_color: resolve_color(values, KEY_BACKGROUND_COLOR, DEFAULT_BACKGROUND_COLOR),
        text_color: resolve_color(values, KEY_TEXT_COLOR, DEFAULT_TEXT_COLOR),
    }
}

fn resolve_color(values: &Map<String, Value>, key: &str, fallback: Color) -> Color {
    let parsed = match values.get(key) {
        None | Some(Value::Null) => return fallback,
        Some(Value::String(s)) => Color::parse(s).map_err(|e| e.to_string()),
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(Color::from_packed)
            .ok_or_else(|| format!("packed color out of range: {n}")),
        Some(other) => Err(format!("unexpected value: {other}")),
    };

    parsed.unwrap_or_else(|e| {
        warn!(key, "Falling back to default color: {e}");
        fallback
    })
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}
