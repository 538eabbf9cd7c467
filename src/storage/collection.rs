//! # Collection Store
//!
//! CRUD over a named collection of records with store-assigned integer IDs.
//!
//! Every operation answers with a response envelope. Missing records and client-chosen
//! IDs are reported as 404/400 envelopes; only persistence failures come back as `Err`.
//! Mutations write the full record list to the bound slot before returning. A store
//! without a name is in-memory only.

use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use super::PersistenceSlot;
use crate::core::error::{MockError, MockResult};
use crate::core::types::{record_id_key, record_numeric_id, MockResponse, Record, ID_FIELD};

/// Loaded records plus the highest ID ever handed out
#[derive(Debug, Default)]
struct CollectionState {
    records: Vec<Record>,
    high_water: i64,
}

/// Store for one named collection
pub struct CollectionStore {
    /// Collection name, also the slot key; `None` for anonymous stores
    name: Option<String>,

    /// Slot the records are persisted to
    slot: Option<Arc<dyn PersistenceSlot>>,

    /// Lazily hydrated state; the lock serialises every operation on this collection
    state: Mutex<Option<CollectionState>>,
}

impl std::fmt::Debug for CollectionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionStore")
            .field("name", &self.name)
            .field("persistent", &self.slot.is_some())
            .finish()
    }
}

impl CollectionStore {
    /// Create a store bound to the slot key `name`
    pub fn new<S: Into<String>>(name: S, slot: Arc<dyn PersistenceSlot>) -> Self {
        Self {
            name: Some(name.into()),
            slot: Some(slot),
            state: Mutex::new(None),
        }
    }

    /// Create an in-memory store that never persists
    pub fn anonymous() -> Self {
        Self {
            name: None,
            slot: None,
            state: Mutex::new(None),
        }
    }

    /// Collection name, if bound
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// `GET collection`: every record, in insertion order
    pub fn find_all(&self) -> MockResult<MockResponse> {
        self.with_state(|state| Ok(MockResponse::items(state.records.clone())))
    }

    /// `GET item`: the record whose ID matches `id`
    pub fn find_one(&self, id: &str) -> MockResult<MockResponse> {
        self.with_state(|state| {
            Ok(match position_of(&state.records, id) {
                Some(index) => MockResponse::item(state.records[index].clone()),
                None => self.not_found(id),
            })
        })
    }

    /// `POST collection`: append a record and assign its ID
    pub fn create(&self, data: Value) -> MockResult<MockResponse> {
        let mut record = match data {
            Value::Object(record) => record,
            _ => {
                return Ok(MockError::invalid_request("request body must be a JSON object").into_response())
            }
        };

        if record.contains_key(ID_FIELD) {
            return Ok(MockError::invalid_request("id must not be supplied when creating a record")
                .into_response());
        }

        self.with_state(|state| {
            let previous_high_water = state.high_water;
            let Some(id) = previous_high_water.checked_add(1) else {
                warn!(collection = ?self.name, "No record IDs left to assign");
                return Ok(MockError::invalid_request("no record ids left to assign in this collection")
                    .into_response());
            };
            record.insert(ID_FIELD.to_string(), Value::from(id));
            state.records.push(record.clone());
            state.high_water = id;

            if let Err(err) = self.persist(&state.records) {
                state.records.pop();
                state.high_water = previous_high_water;
                return Err(err);
            }

            debug!(collection = ?self.name, id, "Created record");
            Ok(MockResponse::item(record))
        })
    }

    /// `PUT item`: shallow-merge `data` into the existing record
    ///
    /// Fields present in `data` overwrite, all others are left untouched. The record keeps
    /// its stored ID even if the patch carries a different one.
    pub fn update(&self, id: &str, data: Value) -> MockResult<MockResponse> {
        let patch = match data {
            Value::Object(patch) => patch,
            _ => {
                return Ok(MockError::invalid_request("request body must be a JSON object").into_response())
            }
        };

        self.with_state(|state| {
            let Some(index) = position_of(&state.records, id) else {
                return Ok(self.not_found(id));
            };

            let previous = state.records[index].clone();
            let stored_id = previous.get(ID_FIELD).cloned();
            {
                let record = &mut state.records[index];
                for (key, value) in patch {
                    record.insert(key, value);
                }
                if let Some(stored_id) = stored_id {
                    record.insert(ID_FIELD.to_string(), stored_id);
                }
            }

            if let Err(err) = self.persist(&state.records) {
                state.records[index] = previous;
                return Err(err);
            }

            debug!(collection = ?self.name, id, "Updated record");
            Ok(MockResponse::item(state.records[index].clone()))
        })
    }

    /// `DELETE item`: remove and return the record
    pub fn delete(&self, id: &str) -> MockResult<MockResponse> {
        self.with_state(|state| {
            let Some(index) = position_of(&state.records, id) else {
                return Ok(self.not_found(id));
            };

            let removed = state.records.remove(index);
            if let Err(err) = self.persist(&state.records) {
                state.records.insert(index, removed);
                return Err(err);
            }

            debug!(collection = ?self.name, id, "Deleted record");
            Ok(MockResponse::item(removed))
        })
    }

    /// Number of records currently held
    pub fn len(&self) -> MockResult<usize> {
        self.with_state(|state| Ok(state.records.len()))
    }

    /// Check whether the collection is empty
    pub fn is_empty(&self) -> MockResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Copy of the current records
    pub fn snapshot(&self) -> MockResult<Vec<Record>> {
        self.with_state(|state| Ok(state.records.clone()))
    }

    fn not_found(&self, id: &str) -> MockResponse {
        let collection = self.name.as_deref().unwrap_or("collection");
        MockError::not_found(format!("no record with id {} in {}", id, collection)).into_response()
    }

    /// Run `f` against the hydrated state while holding the collection lock
    fn with_state<T>(&self, f: impl FnOnce(&mut CollectionState) -> MockResult<T>) -> MockResult<T> {
        let mut guard = self.state.lock();
        if guard.is_none() {
            *guard = Some(self.load()?);
        }

        match guard.as_mut() {
            Some(state) => f(state),
            None => Err(MockError::persistence(
                self.name.clone().unwrap_or_default(),
                "collection state unavailable",
            )),
        }
    }

    fn load(&self) -> MockResult<CollectionState> {
        let (Some(name), Some(slot)) = (&self.name, &self.slot) else {
            return Ok(CollectionState::default());
        };

        let records: Vec<Record> = match slot.get(name)? {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(values)) => values
                .into_iter()
                .filter_map(|value| match value {
                    Value::Object(record) => Some(record),
                    other => {
                        warn!(collection = %name, value = %other, "Skipping non-object record in storage");
                        None
                    }
                })
                .collect(),
            Some(_) => {
                return Err(MockError::persistence(
                    name.clone(),
                    "stored collection is not a JSON array",
                ))
            }
        };

        // IDs start at 1 even when every stored ID is zero or negative.
        let high_water = records
            .iter()
            .filter_map(|record| record.get(ID_FIELD).and_then(record_numeric_id))
            .fold(0, i64::max);

        debug!(collection = %name, records = records.len(), "Hydrated collection from storage");
        Ok(CollectionState { records, high_water })
    }

    fn persist(&self, records: &[Record]) -> MockResult<()> {
        let (Some(name), Some(slot)) = (&self.name, &self.slot) else {
            return Ok(());
        };

        let value = Value::Array(records.iter().cloned().map(Value::Object).collect());
        slot.set(name, &value)
    }
}

fn position_of(records: &[Record], id: &str) -> Option<usize> {
    records
        .iter()
        .position(|record| record.get(ID_FIELD).and_then(record_id_key).as_deref() == Some(id))
}
