//! JSON-file-backed key-value store.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use super::kv::{KeyValueStore, StoreError, StoreResult};

/// Key-value store persisted as a single JSON object in a file.
///
/// The full map is read once at open and rewritten on every `set` - the
/// store holds one small favorites set, so whole-file writes are the
/// simplest durable behavior. Parent directories are created on demand.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: Mutex<HashMap<String, String>>,
}

impl JsonFileStore {
    /// Open a store at `path`, loading existing content if present.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let values = if path.exists() {
            let file = File::open(&path).map_err(|source| StoreError::ReadFailed {
                path: path.clone(),
                source,
            })?;
            serde_json::from_reader(BufReader::new(file))?
        } else {
            HashMap::new()
        };
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    /// The backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, values: &HashMap<String, String>) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| StoreError::WriteFailed {
                path: self.path.clone(),
                source,
            })?;
        }
        let file = File::create(&self.path).map_err(|source| StoreError::WriteFailed {
            path: self.path.clone(),
            source,
        })?;
        serde_json::to_writer_pretty(BufWriter::new(file), values)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut values = self.values.lock();
        values.insert(key.to_string(), value.to_string());
        self.flush(&values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("store.json")).unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn test_set_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = JsonFileStore::open(&path).unwrap();
        store.set("quickAccessLayers", r#"["l1","l2"]"#).unwrap();
        drop(store);

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(
            reopened.get("quickAccessLayers").unwrap().as_deref(),
            Some(r#"["l1","l2"]"#)
        );
    }

    #[test]
    fn test_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/dirs/store.json");

        let store = JsonFileStore::open(&path).unwrap();
        store.set("k", "v").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_corrupt_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "not json at all").unwrap();

        assert!(matches!(
            JsonFileStore::open(&path),
            Err(StoreError::Corrupt(_))
        ));
    }
}
