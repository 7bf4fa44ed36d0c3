use std::path::PathBuf;
use std::sync::RwLock;

use serde_json::{Map, Value};
use tracing::warn;

use crate::application::SettingsStore;

/// Settings persisted as a JSON object in a single file under the data
/// directory.
///
/// Reads come from an in-memory copy loaded at construction; every write
/// updates the copy and rewrites the file. An unreadable or corrupt file is
/// logged and treated as empty rather than failing startup.
pub struct JsonSettingsStore {
    path: PathBuf,
    values: RwLock<Map<String, Value>>,
}

impl JsonSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(values) => values,
                Err(e) => {
                    warn!(
                        "JsonSettingsStore: ignoring corrupt settings file {}: {e}",
                        path.display()
                    );
                    Map::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => {
                warn!(
                    "JsonSettingsStore: could not read {}: {e}",
                    path.display()
                );
                Map::new()
            }
        };

        Self {
            path,
            values: RwLock::new(values),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    fn write_value(&self, key: &str, value: Value) {
        let mut values = self.values.write().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value);
        self.persist(&values);
    }

    /// Best-effort flush; a failed write keeps the in-memory value and logs.
    fn persist(&self, values: &Map<String, Value>) {
        if let Some(parent) = self.path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!(
                    "JsonSettingsStore: could not create {}: {e}",
                    parent.display()
                );
                return;
            }
        }
        let contents = match serde_json::to_string_pretty(values) {
            Ok(contents) => contents,
            Err(e) => {
                warn!("JsonSettingsStore: could not serialize settings: {e}");
                return;
            }
        };
        if let Err(e) = std::fs::write(&self.path, contents) {
            warn!(
                "JsonSettingsStore: could not write {}: {e}",
                self.path.display()
            );
        }
    }
}

impl SettingsStore for JsonSettingsStore {
    fn read_string(&self, key: &str) -> Option<String> {
        let values = self.values.read().unwrap_or_else(|e| e.into_inner());
        values.get(key)?.as_str().map(str::to_string)
    }

    fn read_bool(&self, key: &str, default: bool) -> bool {
        let values = self.values.read().unwrap_or_else(|e| e.into_inner());
        values.get(key).and_then(Value::as_bool).unwrap_or(default)
    }

    fn write_string(&self, key: &str, value: &str) {
        self.write_value(key, Value::from(value));
    }

    fn write_bool(&self, key: &str, value: bool) {
        self.write_value(key, Value::from(value));
    }
}
