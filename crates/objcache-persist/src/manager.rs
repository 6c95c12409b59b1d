use std::sync::Arc;

use objcache_types::{AgentChecksumTable, AgentId};
use tracing::{debug, warn};

use crate::codec;
use crate::error::{PersistError, PersistResult};
use crate::key::RecordKey;
use crate::traits::RecordStore;

/// What a plain [`PersistenceManager::load`] found.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadedRecord {
    /// No usable prior record: the agent has never been cached here, or
    /// the record is empty.
    Missing,
    /// The record decoded into a table.
    Found(AgentChecksumTable),
}

/// Result of [`PersistenceManager::load_or_recover`]. Every variant yields a
/// table the session can start with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadResolution {
    /// The prior checkpoint decoded cleanly.
    Restored(AgentChecksumTable),
    /// There was no prior checkpoint.
    Fresh,
    /// The checkpoint was corrupt and has been deleted.
    Recovered,
    /// The checkpoint could not be read; it was left in place.
    Unavailable,
}

impl LoadResolution {
    /// The table to install: the restored one, or an empty table.
    pub fn into_table(self) -> AgentChecksumTable {
        match self {
            Self::Restored(table) => table,
            Self::Fresh | Self::Recovered | Self::Unavailable => AgentChecksumTable::new(),
        }
    }
}

/// Reads and writes agent checkpoints through a [`RecordStore`].
///
/// Record identity is the pair `(agent, region)`: an agent is checkpointed
/// independently in every region it visits.
#[derive(Clone)]
pub struct PersistenceManager {
    records: Arc<dyn RecordStore>,
}

impl PersistenceManager {
    pub fn new(records: Arc<dyn RecordStore>) -> Self {
        Self { records }
    }

    /// The underlying record store.
    pub fn records(&self) -> &Arc<dyn RecordStore> {
        &self.records
    }

    /// Load the checkpoint for `(agent, region)`.
    ///
    /// A missing or blank record is [`LoadedRecord::Missing`]. A record that
    /// does not decode is [`PersistError::Corrupt`]; it is left in place for
    /// the caller to [`purge`](Self::purge).
    pub fn load(&self, agent: AgentId, region: &str) -> PersistResult<LoadedRecord> {
        let key = RecordKey::new(agent, region)?;
        let Some(text) = self.records.read(&key)? else {
            return Ok(LoadedRecord::Missing);
        };
        if text.trim().is_empty() {
            return Ok(LoadedRecord::Missing);
        }
        let table = codec::decode(&text).map_err(|source| PersistError::Corrupt {
            key: key.to_string(),
            source,
        })?;
        Ok(LoadedRecord::Found(table))
    }

    /// Write the full checkpoint for `(agent, region)`, replacing any prior
    /// one. Returns the number of entries written.
    pub fn save(
        &self,
        agent: AgentId,
        region: &str,
        table: &AgentChecksumTable,
    ) -> PersistResult<usize> {
        let key = RecordKey::new(agent, region)?;
        self.records
            .write(&key, &codec::encode_record(table))
            .map_err(|e| PersistError::WriteFailure {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
        debug!(agent = %agent, region, entries = table.len(), "checkpoint saved");
        Ok(table.len())
    }

    /// Delete the checkpoint for `(agent, region)`. Returns whether it existed.
    pub fn purge(&self, agent: AgentId, region: &str) -> PersistResult<bool> {
        let key = RecordKey::new(agent, region)?;
        self.records.delete(&key)
    }

    /// Load with the availability-first recovery policy.
    ///
    /// Never fails. A corrupt checkpoint is deleted so it is not decoded
    /// again. Any other read failure leaves the record alone.
    pub fn load_or_recover(&self, agent: AgentId, region: &str) -> LoadResolution {
        match self.load(agent, region) {
            Ok(LoadedRecord::Found(table)) => {
                debug!(agent = %agent, region, entries = table.len(), "checkpoint restored");
                LoadResolution::Restored(table)
            }
            Ok(LoadedRecord::Missing) => {
                debug!(agent = %agent, region, "no checkpoint");
                LoadResolution::Fresh
            }
            Err(PersistError::Corrupt { key, source }) => {
                warn!(agent = %agent, region, record = %key, error = %source, "corrupt checkpoint; deleting");
                if let Err(e) = self.purge(agent, region) {
                    warn!(agent = %agent, region, record = %key, error = %e, "failed to delete corrupt checkpoint");
                }
                LoadResolution::Recovered
            }
            Err(e) => {
                warn!(agent = %agent, region, error = %e, "checkpoint unreadable; starting empty");
                LoadResolution::Unavailable
            }
        }
    }
}

impl std::fmt::Debug for PersistenceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceManager").finish_non_exhaustive()
    }
}
