use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use objcache_types::{AgentChecksumTable, AgentId, CacheMissKind, Checksum, ObjectId};
use tracing::trace;

use crate::traits::ObjectCache;

/// Mutex-guarded map from agent to its checksum table.
///
/// A single coarse lock covers the whole map. Every operation is a hash
/// lookup plus at most one insert or remove, so contention stays low at
/// expected agent counts.
pub struct ObjectCacheStore {
    agents: Mutex<HashMap<AgentId, AgentChecksumTable>>,
}

impl ObjectCacheStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            agents: Mutex::new(HashMap::new()),
        }
    }

    // Every critical section leaves the map consistent, so a panic in some
    // other holder does not invalidate what it guards.
    fn agents(&self) -> MutexGuard<'_, HashMap<AgentId, AgentChecksumTable>> {
        self.agents.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Install a table loaded from durable storage.
    ///
    /// Entries already recorded for the agent (added while the load was in
    /// flight) win over loaded ones. Returns the number of entries the agent
    /// holds afterwards.
    pub fn install(&self, agent: AgentId, loaded: AgentChecksumTable) -> usize {
        let mut agents = self.agents();
        let table = agents.entry(agent).or_default();
        table.absorb_missing(loaded);
        table.len()
    }

    /// Remove and return the agent's table in one critical section.
    pub fn evict(&self, agent: AgentId) -> Option<AgentChecksumTable> {
        self.agents().remove(&agent)
    }

    /// A copy of the agent's current table.
    pub fn snapshot(&self, agent: AgentId) -> Option<AgentChecksumTable> {
        self.agents().get(&agent).cloned()
    }

    /// Returns `true` if the agent currently has a table.
    pub fn contains_agent(&self, agent: AgentId) -> bool {
        self.agents().contains_key(&agent)
    }

    /// Number of agents with a table.
    pub fn agent_count(&self) -> usize {
        self.agents().len()
    }

    /// Number of objects cached for the agent (0 if unknown).
    pub fn cached_object_count(&self, agent: AgentId) -> usize {
        self.agents().get(&agent).map_or(0, AgentChecksumTable::len)
    }
}

impl Default for ObjectCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectCache for ObjectCacheStore {
    fn use_cached_object(&self, agent: AgentId, object: ObjectId, checksum: Checksum) -> bool {
        self.agents()
            .get(&agent)
            .is_some_and(|table| table.matches(&object, checksum))
    }

    fn add_cached_object(&self, agent: AgentId, object: ObjectId, checksum: Checksum) {
        self.agents()
            .entry(agent)
            .or_default()
            .insert(object, checksum);
    }

    fn remove_object(&self, agent: AgentId, object: ObjectId, reason: CacheMissKind) {
        let removed = self
            .agents()
            .get_mut(&agent)
            .and_then(|table| table.remove(&object));
        trace!(agent = %agent, object = %object, %reason, removed = removed.is_some(), "cache miss");
    }
}

impl std::fmt::Debug for ObjectCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.agent_count();
        f.debug_struct("ObjectCacheStore")
            .field("agent_count", &count)
            .finish()
    }
}
