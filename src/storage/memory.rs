//! # In-Memory Persistence Slot
//!
//! Process-local slot backed by a `HashMap`. Used by default when no storage file is
//! configured, and by tests as an isolated fake.

use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use super::PersistenceSlot;
use crate::core::error::MockResult;

/// In-memory slot implementation
#[derive(Debug, Default)]
pub struct MemorySlot {
    /// Stored documents
    entries: RwLock<HashMap<String, Value>>,

    /// Number of successful writes, for observing persistence behaviour
    writes: AtomicU64,
}

impl MemorySlot {
    /// Create an empty slot
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `set` calls served so far
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }
}

impl PersistenceSlot for MemorySlot {
    fn get(&self, key: &str) -> MockResult<Option<Value>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &Value) -> MockResult<()> {
        self.entries.write().insert(key.to_string(), value.clone());
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn keys(&self) -> MockResult<Vec<String>> {
        let mut keys: Vec<String> = self.entries.read().keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}
