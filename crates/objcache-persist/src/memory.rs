//! In-memory record store for testing and ephemeral use.
//!
//! [`InMemoryRecordStore`] keeps records in a `HashMap` protected by a
//! `RwLock`. Data is lost when the store is dropped.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{PersistError, PersistResult};
use crate::key::RecordKey;
use crate::traits::RecordStore;

/// An in-memory implementation of [`RecordStore`].
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: RwLock<HashMap<RecordKey, String>>,
}

impl InMemoryRecordStore {
    /// Create a new empty record store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    /// Returns `true` if no records are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> PersistError {
    PersistError::Backend(format!("lock poisoned: {e}"))
}

impl RecordStore for InMemoryRecordStore {
    fn read(&self, key: &RecordKey) -> PersistResult<Option<String>> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records.get(key).cloned())
    }

    fn write(&self, key: &RecordKey, contents: &str) -> PersistResult<()> {
        let mut records = self.records.write().map_err(poisoned)?;
        records.insert(key.clone(), contents.to_string());
        Ok(())
    }

    fn delete(&self, key: &RecordKey) -> PersistResult<bool> {
        let mut records = self.records.write().map_err(poisoned)?;
        Ok(records.remove(key).is_some())
    }

    fn list(&self) -> PersistResult<Vec<RecordKey>> {
        let records = self.records.read().map_err(poisoned)?;
        let mut keys: Vec<RecordKey> = records.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}
