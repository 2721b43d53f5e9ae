//! User settings key-value store persisted as a flat JSON object.
//!
//! Defaults are merged under whatever the file contains. Every `set` writes
//! the whole object atomically and broadcasts the change so open UI surfaces
//! can react.

use crate::paths;
use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;

/// Capacity of the change broadcast; slow receivers see `Lagged` and resync via `all()`.
const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// A single persisted setting change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingChange {
    pub key: String,
    pub value: Value,
}

/// Colour scheme preference stored under the `theme` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    System,
    Light,
    Dark,
}

impl Theme {
    fn from_value(value: Option<&Value>) -> Self {
        match value.and_then(Value::as_str) {
            Some("light") => Theme::Light,
            Some("dark") => Theme::Dark,
            _ => Theme::System,
        }
    }
}

pub struct SettingsStore {
    path: PathBuf,
    values: Mutex<Map<String, Value>>,
    changes: broadcast::Sender<SettingChange>,
}

fn default_values() -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(
        "theme".to_string(),
        Value::String(crate::defaults::settings_theme().to_string()),
    );
    map.insert(
        "newTabUrl".to_string(),
        Value::String(crate::defaults::settings_new_tab_url().to_string()),
    );
    map
}

impl SettingsStore {
    /// Open the store at the default settings path.
    pub fn open() -> Self {
        Self::open_at(paths::settings_path())
    }

    /// Open the store at `path`. Read or parse failures are logged and the
    /// store starts from defaults; the next `set` overwrites the bad file.
    pub fn open_at(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut values = default_values();

        match read_settings_file(&path) {
            Ok(Some(stored)) => {
                for (key, value) in stored {
                    values.insert(key, value);
                }
            }
            Ok(None) => {}
            Err(e) => log::error!("Failed to load settings, using defaults: {:#}", e),
        }

        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            path,
            values: Mutex::new(values),
            changes,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.values.lock().get(key).cloned()
    }

    /// Snapshot of every setting including defaults.
    pub fn all(&self) -> Map<String, Value> {
        self.values.lock().clone()
    }

    pub fn theme(&self) -> Theme {
        Theme::from_value(self.values.lock().get("theme"))
    }

    /// Store `value` under `key`, persist, and broadcast the change.
    ///
    /// The in-memory value is updated even if the write fails; the error is
    /// returned so the caller can log it.
    pub fn set(&self, key: &str, value: Value) -> Result<()> {
        let snapshot = {
            let mut values = self.values.lock();
            values.insert(key.to_string(), value.clone());
            values.clone()
        };

        let _ = self.changes.send(SettingChange {
            key: key.to_string(),
            value,
        });

        let json =
            serde_json::to_string_pretty(&snapshot).context("Failed to serialize settings")?;
        paths::write_atomic(&self.path, &json)
            .with_context(|| format!("Failed to write settings to {:?}", self.path))?;
        log::debug!("Setting '{}' saved to {:?}", key, self.path);
        Ok(())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SettingChange> {
        self.changes.subscribe()
    }
}

fn read_settings_file(path: &Path) -> Result<Option<Map<String, Value>>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings from {:?}", path))?;
    if contents.trim().is_empty() {
        return Ok(None);
    }
    let map: Map<String, Value> = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse settings from {:?}", path))?;
    Ok(Some(map))
}
