//! Flat key -> mapping store collaborator.
//!
//! The navigation engine treats persistence as opaque: a key loads a JSON
//! mapping (empty when absent) and saving replaces it. Last write wins.

use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StoreError;

/// Key holding the location mapping.
pub const LOCATIONS_KEY: &str = "locations";
/// Key holding player position, route preferences, clock and rules.
pub const OVERVIEW_KEY: &str = "campaign-overview";
/// Key holding the player's character sheet.
pub const CHARACTER_KEY: &str = "character";

/// Persistence collaborator.
pub trait CampaignStore {
    /// Load the mapping under `key`, or an empty object if absent.
    fn load(&self, key: &str) -> Result<Value, StoreError>;

    /// Replace the mapping under `key`.
    fn save(&mut self, key: &str, value: &Value) -> Result<(), StoreError>;
}

/// In-process store, mainly for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a key.
    pub fn with_entry(mut self, key: impl Into<String>, value: Value) -> Self {
        self.entries.insert(key.into(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }
}

impl CampaignStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Value, StoreError> {
        Ok(self
            .entries
            .get(key)
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default())))
    }

    fn save(&mut self, key: &str, value: &Value) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.clone());
        Ok(())
    }
}

/// One pretty-printed `<key>.json` file per key inside a campaign directory.
#[derive(Debug, Clone)]
pub struct JsonDirStore {
    dir: PathBuf,
}

impl JsonDirStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl CampaignStore for JsonDirStore {
    fn load(&self, key: &str) -> Result<Value, StoreError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(Value::Object(Default::default()));
        }
        let text = fs::read_to_string(&path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| StoreError::Json {
            key: key.to_string(),
            source,
        })
    }

    fn save(&mut self, key: &str, value: &Value) -> Result<(), StoreError> {
        let path = self.path_for(key);
        fs::create_dir_all(&self.dir).map_err(|source| StoreError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let text = serde_json::to_string_pretty(value).map_err(|source| StoreError::Json {
            key: key.to_string(),
            source,
        })?;
        fs::write(&path, text).map_err(|source| StoreError::Io { path, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("world-atlas-{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_memory_store_absent_key_is_empty() {
        let store = MemoryStore::new();
        assert_eq!(store.load(LOCATIONS_KEY).unwrap(), json!({}));
    }

    #[test]
    fn test_memory_store_last_write_wins() {
        let mut store = MemoryStore::new();
        store.save("k", &json!({"a": 1})).unwrap();
        store.save("k", &json!({"a": 2})).unwrap();
        assert_eq!(store.load("k").unwrap()["a"], 2);
    }

    #[test]
    fn test_json_dir_store_round_trip() {
        let dir = scratch_dir();
        let mut store = JsonDirStore::new(&dir);

        assert_eq!(store.load(OVERVIEW_KEY).unwrap(), json!({}));
        store
            .save(OVERVIEW_KEY, &json!({"time_of_day": "Night"}))
            .unwrap();
        assert!(dir.join("campaign-overview.json").exists());
        assert_eq!(store.load(OVERVIEW_KEY).unwrap()["time_of_day"], "Night");

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_json_dir_store_malformed_file() {
        let dir = scratch_dir();
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("locations.json"), "{not json").unwrap();

        let store = JsonDirStore::new(&dir);
        let err = store.load(LOCATIONS_KEY).unwrap_err();
        assert!(matches!(err, StoreError::Json { .. }));

        fs::remove_dir_all(&dir).unwrap();
    }
}
