//! # Storage Module
//!
//! Persistence slots and the collection stores built on top of them.
//!
//! A persistence slot is a plain key-value area holding JSON documents. Collection stores
//! write their full record list under their collection name, and the fixture registry
//! keeps its seed snapshots next to them. The slot is injected explicitly so every store
//! and registry can be tested against an in-memory fake.

pub mod collection;
pub mod file;
pub mod memory;

pub use collection::CollectionStore;
pub use file::FileSlot;
pub use memory::MemorySlot;

use serde_json::Value;

use crate::core::error::MockResult;

/// Key-value area used for durable state
///
/// Only single-key atomicity is expected: a `set` either fully replaces the value under
/// its key or fails. Writes are synchronous; once `set` returns, the value is persisted.
pub trait PersistenceSlot: Send + Sync {
    /// Read the value stored under `key`
    fn get(&self, key: &str) -> MockResult<Option<Value>>;

    /// Replace the value stored under `key`
    fn set(&self, key: &str, value: &Value) -> MockResult<()>;

    /// Keys currently stored, sorted
    fn keys(&self) -> MockResult<Vec<String>>;
}
