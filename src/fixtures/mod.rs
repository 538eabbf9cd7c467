//! # Fixture Registry
//!
//! Named seed datasets and the bookkeeping around them.
//!
//! Seeding is drift-aware: a dataset is written to storage when nothing is stored under its
//! key yet, or when it differs from the snapshot recorded the last time it was seeded.
//! Otherwise whatever is stored (possibly edited at runtime) is left alone. Snapshots live in
//! the same persistence slot under a reserved prefix, so drift is detected across restarts.
//!
//! The registry also records which fixture keys have an explicit route so the auto-router
//! can wire standard REST routes for the rest.

use parking_lot::RwLock;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info};

use crate::core::error::{MockError, MockResult};
use crate::core::types::Record;
use crate::storage::PersistenceSlot;

/// Slot key prefix for recorded seed snapshots
pub const SNAPSHOT_PREFIX: &str = "__fixtures__/";

/// Outcome of seeding a single fixture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    /// Nothing was stored yet; the dataset was written
    Seeded,
    /// The declared dataset changed since the last seed; stored data was overwritten
    Reseeded,
    /// Dataset unchanged; stored data kept as is
    Kept,
}

/// One declared fixture
#[derive(Debug, Clone)]
struct FixtureEntry {
    configured: bool,
    records: usize,
}

/// Registry of seed datasets
pub struct FixtureRegistry {
    slot: Arc<dyn PersistenceSlot>,
    entries: RwLock<BTreeMap<String, FixtureEntry>>,
}

impl FixtureRegistry {
    /// Create an empty registry seeding into `slot`
    pub fn new(slot: Arc<dyn PersistenceSlot>) -> Self {
        Self {
            slot,
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// Declare the seed dataset for `key`
    ///
    /// Writes `dataset` to storage if nothing is stored under `key`, or if the recorded
    /// snapshot of the previous seed differs from `dataset`. Otherwise stored data is kept.
    pub fn set_initial_data(&self, key: &str, dataset: Vec<Record>) -> MockResult<SeedOutcome> {
        if key.starts_with(SNAPSHOT_PREFIX) {
            return Err(MockError::config(format!(
                "Fixture key '{}' uses the reserved prefix '{}'",
                key, SNAPSHOT_PREFIX
            )));
        }

        let declared = Value::Array(dataset.into_iter().map(Value::Object).collect());
        let snapshot_key = snapshot_key(key);

        let stored = self.slot.get(key)?;
        let snapshot = self.slot.get(&snapshot_key)?;

        let outcome = match (&stored, &snapshot) {
            (None, _) => SeedOutcome::Seeded,
            (Some(_), Some(previous)) if *previous == declared => SeedOutcome::Kept,
            (Some(_), _) => SeedOutcome::Reseeded,
        };

        if outcome != SeedOutcome::Kept {
            self.slot.set(key, &declared)?;
            self.slot.set(&snapshot_key, &declared)?;
        }

        let records = declared.as_array().map(Vec::len).unwrap_or_default();
        {
            let mut entries = self.entries.write();
            let configured = entries.get(key).map(|entry| entry.configured).unwrap_or(false);
            entries.insert(key.to_string(), FixtureEntry { configured, records });
        }

        match outcome {
            SeedOutcome::Kept => debug!(fixture = key, "Fixture unchanged, keeping stored data"),
            _ => info!(fixture = key, records, outcome = ?outcome, "Seeded fixture"),
        }

        Ok(outcome)
    }

    /// Alias of [`FixtureRegistry::set_initial_data`] matching the configuration API
    pub fn declare_fixture(&self, key: &str, dataset: Vec<Record>) -> MockResult<SeedOutcome> {
        self.set_initial_data(key, dataset)
    }

    /// Mark the collection addressed by `url_path` as having an explicit route
    ///
    /// The collection name is the leading path segment, so both `/users` and
    /// `/users/{id}` mark `users`. Paths whose leading segment is not a fixture key are
    /// ignored. Returns whether a fixture was marked.
    pub fn mark_route_configured(&self, url_path: &str) -> bool {
        let Some(name) = collection_name_from_path(url_path) else {
            return false;
        };

        match self.entries.write().get_mut(name) {
            Some(entry) => {
                entry.configured = true;
                true
            }
            None => false,
        }
    }

    /// Fixture keys that no explicit route was registered for
    pub fn get_unconfigured_collections(&self) -> BTreeSet<String> {
        self.entries
            .read()
            .iter()
            .filter(|(_, entry)| !entry.configured)
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Check whether `key` has an explicit route
    pub fn is_configured(&self, key: &str) -> bool {
        self.entries
            .read()
            .get(key)
            .map(|entry| entry.configured)
            .unwrap_or(false)
    }

    /// Every declared fixture key
    pub fn keys(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    /// Number of records in the declared dataset for `key`
    pub fn declared_len(&self, key: &str) -> Option<usize> {
        self.entries.read().get(key).map(|entry| entry.records)
    }

    /// Slot the registry seeds into
    pub fn slot(&self) -> Arc<dyn PersistenceSlot> {
        self.slot.clone()
    }
}

fn snapshot_key(key: &str) -> String {
    format!("{}{}", SNAPSHOT_PREFIX, key)
}

/// Leading path segment of a concrete or template path
///
/// `/users/{id}` yields `users`, `users` yields `users`, `/` yields `None`.
pub fn collection_name_from_path(path: &str) -> Option<&str> {
    path.trim_start_matches('/')
        .split(['/', '?'])
        .next()
        .filter(|segment| !segment.is_empty())
}
