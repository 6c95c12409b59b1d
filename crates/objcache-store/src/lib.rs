//! Per-agent object checksum cache.
//!
//! This crate holds the only mutable state shared across the object cache:
//! the mapping from each connected agent to its [`AgentChecksumTable`].
//! Object processing asks it whether an agent already holds the current
//! version of an object, and records what it sends.
//!
//! # Design Rules
//!
//! 1. One mutex guards the whole agent map. Whole-table installs and
//!    evictions and single-entry updates all go through it.
//! 2. The decision API never fails. An unknown agent or object is the
//!    ordinary "no cache" answer.
//! 3. Checksums match by equality only.
//! 4. No disk I/O happens here. Loading and saving tables belongs to
//!    `objcache-persist` and `objcache-lifecycle`.
//!
//! [`AgentChecksumTable`]: objcache_types::AgentChecksumTable

pub mod memory;
pub mod traits;

pub use memory::ObjectCacheStore;
pub use traits::ObjectCache;
