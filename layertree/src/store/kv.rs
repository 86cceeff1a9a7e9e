//! The key-value store capability and its in-memory implementation.

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;

use parking_lot::RwLock;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during durable-store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing file could not be read.
    #[error("failed to read store file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The backing file could not be written.
    #[error("failed to write store file {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The stored content is not valid JSON.
    #[error("corrupt store content: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Minimal synchronous key-value store.
///
/// Values are raw strings; serialization opinions belong to callers. All
/// operations are local and synchronous - there is no retry policy, a
/// failure is a logic or environment error, not a transient fault.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;
}

/// Volatile in-memory store. State dies with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.values.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.values.write().insert(key.to_string(), value.to_string());
        Ok(())
    }
}
