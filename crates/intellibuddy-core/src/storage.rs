use std::fs;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::constants::paths;
use crate::error::{BuddyError, Result};

/// Durable key/value store backing the rate-limit counters, the language
/// throttle, and the user's sticky preferences. One JSON file per key under
/// the product data directory. A missing or unparsable value is "no prior
/// state", never an error.
#[derive(Debug, Clone)]
pub struct Storage {
    base_dir: PathBuf,
}

impl Storage {
    /// Store under the platform data directory (~/.local/share/intellibuddy/).
    pub fn new() -> Result<Self> {
        let base = dirs::data_dir()
            .ok_or_else(|| BuddyError::Storage("could not determine data directory".to_string()))?
            .join(paths::STORAGE_DIR);
        Self::with_dir(base)
    }

    /// Store under a custom directory (useful for testing).
    pub fn with_dir(base_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&base_dir).map_err(|e| {
            BuddyError::Storage(format!("failed to create storage directory: {}", e))
        })?;
        Ok(Self { base_dir })
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{}.json", key))
    }

    /// Read a value. Absent, unreadable, or corrupt entries all yield None.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.key_path(key);
        let contents = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&contents) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("discarding corrupt storage entry {}: {}", key, e);
                None
            }
        }
    }

    /// Write a value. The write goes through a temp file and rename so a
    /// crash mid-write leaves the previous value intact.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let path = self.key_path(key);
        let contents = serde_json::to_string_pretty(value)?;

        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, contents)
            .map_err(|e| BuddyError::Storage(format!("failed to write {}: {}", key, e)))?;
        fs::rename(&tmp_path, &path)
            .map_err(|e| BuddyError::Storage(format!("failed to commit {}: {}", key, e)))?;

        Ok(())
    }

    /// Remove a value. Removing an absent key is not an error.
    pub fn remove(&self, key: &str) -> Result<()> {
        let path = self.key_path(key);
        if path.exists() {
            fs::remove_file(&path)
                .map_err(|e| BuddyError::Storage(format!("failed to remove {}: {}", key, e)))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn roundtrip_and_remove() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::with_dir(dir.path().to_path_buf()).unwrap();

        storage.set("counter", &42u32).unwrap();
        assert_eq!(storage.get::<u32>("counter"), Some(42));

        storage.remove("counter").unwrap();
        assert_eq!(storage.get::<u32>("counter"), None);
        storage.remove("counter").unwrap();
    }

    #[test]
    fn corrupt_entry_reads_as_none() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::with_dir(dir.path().to_path_buf()).unwrap();

        std::fs::write(dir.path().join("broken.json"), "{not json").unwrap();
        assert_eq!(storage.get::<u32>("broken"), None);
    }
}
