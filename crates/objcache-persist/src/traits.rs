//! The [`RecordStore`] trait defining durable record storage.

use crate::error::PersistResult;
use crate::key::RecordKey;

/// Storage backend for durable cache records.
///
/// Implementations must be thread-safe (`Send + Sync`). A record is written
/// and read whole: `write` replaces any previous content for the key, and a
/// reader observes either the previous or the new content, never a mix.
pub trait RecordStore: Send + Sync {
    /// Read a record's full text.
    ///
    /// Returns `Ok(None)` if the record does not exist.
    fn read(&self, key: &RecordKey) -> PersistResult<Option<String>>;

    /// Create or fully overwrite a record.
    fn write(&self, key: &RecordKey, contents: &str) -> PersistResult<()>;

    /// Delete a record.
    ///
    /// Returns `Ok(true)` if it existed, `Ok(false)` if it did not.
    fn delete(&self, key: &RecordKey) -> PersistResult<bool>;

    /// List the keys of all stored records, sorted.
    fn list(&self) -> PersistResult<Vec<RecordKey>>;

    /// Check whether a record exists.
    fn exists(&self, key: &RecordKey) -> PersistResult<bool> {
        Ok(self.read(key)?.is_some())
    }
}
