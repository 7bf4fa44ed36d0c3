use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value;

use crate::application::SettingsStore;

/// In-memory settings, for tests and ephemeral sessions that should not
/// touch the settings file.
pub struct MemorySettingsStore {
    values: RwLock<HashMap<String, Value>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self {
            values: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemorySettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsStore for MemorySettingsStore {
    fn read_string(&self, key: &str) -> Option<String> {
        let values = self.values.read().unwrap_or_else(|e| e.into_inner());
        values.get(key)?.as_str().map(str::to_string)
    }

    fn read_bool(&self, key: &str, default: bool) -> bool {
        let values = self.values.read().unwrap_or_else(|e| e.into_inner());
        values.get(key).and_then(Value::as_bool).unwrap_or(default)
    }

    fn write_string(&self, key: &str, value: &str) {
        let mut values = self.values.write().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), Value::from(value));
    }

    fn write_bool(&self, key: &str, value: bool) {
        let mut values = self.values.write().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), Value::from(value));
    }
}
