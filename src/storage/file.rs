//! # File-Backed Persistence Slot
//!
//! Durable slot that keeps every key in a single JSON document on disk. The document is
//! loaded once when the slot is opened and rewritten on each `set`, so state survives
//! process restarts the way browser storage survives page reloads.

use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::PersistenceSlot;
use crate::core::error::{MockError, MockResult};

/// File-backed slot implementation
#[derive(Debug)]
pub struct FileSlot {
    path: PathBuf,
    document: Mutex<Map<String, Value>>,
}

impl FileSlot {
    /// Open (or lazily create) the storage document at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> MockResult<Self> {
        let path = path.as_ref().to_path_buf();

        let document = if path.exists() {
            let content = fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                Map::new()
            } else {
                match serde_json::from_str::<Value>(&content)? {
                    Value::Object(map) => map,
                    _ => {
                        return Err(MockError::persistence(
                            path.display().to_string(),
                            "storage document is not a JSON object",
                        ))
                    }
                }
            }
        } else {
            Map::new()
        };

        info!(path = %path.display(), keys = document.len(), "Opened storage file");

        Ok(Self {
            path,
            document: Mutex::new(document),
        })
    }

    /// Location of the storage document
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, key: &str, document: &Map<String, Value>) -> MockResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| MockError::persistence(key, e.to_string()))?;
            }
        }

        let content = serde_json::to_string_pretty(document)?;

        // Write next to the target and rename so a crash never leaves a torn document.
        let staging = staging_path(&self.path);
        fs::write(&staging, content).map_err(|e| MockError::persistence(key, e.to_string()))?;
        fs::rename(&staging, &self.path).map_err(|e| MockError::persistence(key, e.to_string()))?;

        debug!(key, path = %self.path.display(), "Flushed storage file");
        Ok(())
    }
}

/// Sibling of `path` with `.tmp` appended to the full file name
fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

impl PersistenceSlot for FileSlot {
    fn get(&self, key: &str) -> MockResult<Option<Value>> {
        Ok(self.document.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &Value) -> MockResult<()> {
        let mut document = self.document.lock();
        let previous = document.insert(key.to_string(), value.clone());

        if let Err(err) = self.flush(key, &document) {
            match previous {
                Some(previous) => document.insert(key.to_string(), previous),
                None => document.remove(key),
            };
            return Err(err);
        }

        Ok(())
    }

    fn keys(&self) -> MockResult<Vec<String>> {
        Ok(self.document.lock().keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("backend.json");

        {
            let slot = FileSlot::open(&path).unwrap();
            slot.set("users", &json!([{"id": 1, "name": "terry"}])).unwrap();
        }

        let reopened = FileSlot::open(&path).unwrap();
        assert_eq!(
            reopened.get("users").unwrap(),
            Some(json!([{"id": 1, "name": "terry"}]))
        );
        assert_eq!(reopened.keys().unwrap(), vec!["users".to_string()]);
    }

    #[test]
    fn test_rejects_non_object_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backend.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();

        let err = FileSlot::open(&path).unwrap_err();
        assert!(matches!(err, MockError::Persistence { .. }));
    }

    #[test]
    fn test_tmp_named_document_is_staged_elsewhere() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backend.tmp");

        assert_eq!(staging_path(&path), dir.path().join("backend.tmp.tmp"));

        {
            let slot = FileSlot::open(&path).unwrap();
            slot.set("users", &json!([{"id": 1}])).unwrap();
        }

        assert!(!dir.path().join("backend.tmp.tmp").exists());
        let reopened = FileSlot::open(&path).unwrap();
        assert_eq!(reopened.get("users").unwrap(), Some(json!([{"id": 1}])));
    }

    #[test]
    fn test_empty_file_is_empty_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backend.json");
        std::fs::write(&path, "").unwrap();

        let slot = FileSlot::open(&path).unwrap();
        assert!(slot.keys().unwrap().is_empty());
    }
}
