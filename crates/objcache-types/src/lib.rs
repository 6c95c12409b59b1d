//! Foundation types for the object cache.
//!
//! The object cache remembers, per connected agent, which content checksum of
//! each in-world object that agent already holds. Every other objcache crate
//! depends on `objcache-types`.
//!
//! # Key Types
//!
//! - [`AgentId`] — 128-bit identity of a connected client session
//! - [`ObjectId`] — 128-bit identity of an in-world object
//! - [`Checksum`] — 32-bit content version, compared for equality only
//! - [`AgentChecksumTable`] — one agent's `ObjectId -> Checksum` map
//! - [`CacheMissKind`] — informational reason code for object removal

pub mod checksum;
pub mod error;
pub mod id;
pub mod miss;
pub mod table;

pub use checksum::Checksum;
pub use error::TypeError;
pub use id::{AgentId, ObjectId};
pub use miss::CacheMissKind;
pub use table::AgentChecksumTable;
