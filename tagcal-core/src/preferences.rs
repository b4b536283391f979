//! Persisted user preferences.
//!
//! The scheduler mirrors the last known notification permission here so the
//! next session can show it before the host is asked. The stored value is a
//! cache; the host's live permission always wins.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::{TagcalError, TagcalResult};

/// Key under which the scheduler stores the notification permission.
pub const NOTIFICATION_PERMISSION_KEY: &str = "notificationPermission";

pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> TagcalResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> TagcalResult<()>;
}

/// Preferences kept in memory only.
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get(&self, key: &str) -> TagcalResult<Option<String>> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> TagcalResult<()> {
        self.values.lock().insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

/// Preferences stored as a flat TOML table, e.g.
/// `~/.local/state/tagcal/preferences.toml`.
#[derive(Debug)]
pub struct FilePreferenceStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl FilePreferenceStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> TagcalResult<Self> {
        let path = path.into();

        let values = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            toml::from_str(&content).map_err(|e| {
                TagcalError::Serialization(format!(
                    "Could not parse preferences at {}: {e}",
                    path.display()
                ))
            })?
        } else {
            BTreeMap::new()
        };

        Ok(FilePreferenceStore {
            path,
            values: Mutex::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, values: &BTreeMap<String, String>) -> TagcalResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content =
            toml::to_string_pretty(values).map_err(|e| TagcalError::Serialization(e.to_string()))?;
        std::fs::write(&self.path, content)?;

        Ok(())
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn get(&self, key: &str) -> TagcalResult<Option<String>> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> TagcalResult<()> {
        let mut values = self.values.lock();
        if values.get(key).map(String::as_str) == Some(value) {
            return Ok(());
        }

        // Memory only changes once the file does.
        let mut updated = values.clone();
        updated.insert(key.to_owned(), value.to_owned());
        self.write(&updated)?;
        *values = updated;

        Ok(())
    }
}
