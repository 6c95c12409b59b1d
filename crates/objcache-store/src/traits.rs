//! The [`ObjectCache`] trait exposed to object-processing code.

use objcache_types::{AgentId, CacheMissKind, Checksum, ObjectId};

/// Decision interface over per-agent object checksums.
///
/// Implementations must be thread-safe (`Send + Sync`); calls arrive from
/// many object-processing workers at once. For a single agent, calls must
/// be linearized: no two updates to the same agent's table interleave
/// partially.
pub trait ObjectCache: Send + Sync {
    /// Returns `true` iff the agent has a table, the table holds `object`,
    /// and the stored checksum equals `checksum` exactly.
    ///
    /// Anything else, including an unknown agent, is `false`.
    fn use_cached_object(&self, agent: AgentId, object: ObjectId, checksum: Checksum) -> bool;

    /// Record that `agent` now holds `object` at `checksum`.
    ///
    /// Creates the agent's table if absent and overwrites any previous
    /// checksum. Idempotent.
    fn add_cached_object(&self, agent: AgentId, object: ObjectId, checksum: Checksum);

    /// Forget `object` for `agent`. A no-op if either is unknown.
    ///
    /// `reason` is informational and does not change what is removed.
    fn remove_object(&self, agent: AgentId, object: ObjectId, reason: CacheMissKind);
}
