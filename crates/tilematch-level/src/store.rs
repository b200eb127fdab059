//! Key/value persistence of JSON-serializable values.
//!
//! The engine only needs four operations on a save slot, captured by
//! [`SaveStore`]. Two implementations ship here:
//!
//! - [`MemoryStore`]: a shared in-memory map, for tests and headless runs.
//! - [`JsonFileStore`]: one JSON object in a file, rewritten on every
//!   mutation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::StoreError;

/// A key/value store whose values are anything serde can handle.
///
/// The methods are generic over the value type, so the trait is used as a
/// type parameter (`S: SaveStore`) rather than as a trait object.
pub trait SaveStore: Send + 'static {
    /// Stores `value` under `key`, replacing whatever was there.
    fn write<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), StoreError>;

    /// Reads `key` as a `T`, or returns `default` if the key is absent.
    ///
    /// # Errors
    /// [`StoreError::Decode`] if the stored value isn't a valid `T`.
    fn read<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T, StoreError>;

    fn has_key(&self, key: &str) -> bool;

    /// Removes `key`. Removing a missing key is not an error.
    fn delete_key(&mut self, key: &str) -> Result<(), StoreError>;

    fn delete_all(&mut self) -> Result<(), StoreError>;
}

fn decode<T: DeserializeOwned>(value: Option<&Value>, default: T) -> Result<T, StoreError> {
    match value {
        Some(value) => serde_json::from_value(value.clone()).map_err(StoreError::Decode),
        None => Ok(default),
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Value, StoreError> {
    serde_json::to_value(value).map_err(StoreError::Encode)
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// An in-memory store. Clones share the same map, so a test can hand one
/// clone to the engine and inspect the other.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: Arc<Mutex<BTreeMap<String, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The raw JSON stored under `key`.
    pub fn raw(&self, key: &str) -> Option<Value> {
        self.lock().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Value>> {
        // A panic while holding the guard can't leave the map half-written.
        self.data.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SaveStore for MemoryStore {
    fn write<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), StoreError> {
        let value = encode(value)?;
        self.lock().insert(key.to_owned(), value);
        Ok(())
    }

    fn read<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T, StoreError> {
        decode(self.lock().get(key), default)
    }

    fn has_key(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    fn delete_key(&mut self, key: &str) -> Result<(), StoreError> {
        self.lock().remove(key);
        Ok(())
    }

    fn delete_all(&mut self) -> Result<(), StoreError> {
        self.lock().clear();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// JsonFileStore
// ---------------------------------------------------------------------------

/// A store backed by a single pretty-printed JSON object on disk.
///
/// The file is read once by [`open`](Self::open) and rewritten after each
/// successful `write`, `delete_key` (when the key existed), and
/// `delete_all`.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    data: BTreeMap<String, Value>,
}

impl JsonFileStore {
    /// Opens `path`, loading it if it exists. A missing file is an empty
    /// store; it is created on the first mutation.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let data = if path.exists() {
            let json = std::fs::read_to_string(&path)?;
            if json.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&json).map_err(StoreError::Decode)?
            }
        } else {
            BTreeMap::new()
        };
        tracing::debug!(path = %path.display(), keys = data.len(), "save file opened");
        Ok(Self { path, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(&self.data).map_err(StoreError::Encode)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

impl SaveStore for JsonFileStore {
    fn write<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), StoreError> {
        let value = encode(value)?;
        self.data.insert(key.to_owned(), value);
        self.flush()
    }

    fn read<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T, StoreError> {
        decode(self.data.get(key), default)
    }

    fn has_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    fn delete_key(&mut self, key: &str) -> Result<(), StoreError> {
        if self.data.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }

    fn delete_all(&mut self) -> Result<(), StoreError> {
        self.data.clear();
        self.flush()
    }
}
