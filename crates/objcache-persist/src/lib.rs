//! Durable checkpoints for the object cache.
//!
//! Between sessions each agent's [`AgentChecksumTable`] is kept as one text
//! record per `(agent, region)` pair. This crate owns the record format, the
//! naming of records, the storage backends, and the recovery policy applied
//! when a record cannot be read back.
//!
//! # Record format
//!
//! A JSON object from canonical UUID string to unsigned 32-bit checksum:
//!
//! ```text
//! {"550e8400-e29b-41d4-a716-446655440000":17,"6ba7b810-9dad-11d1-80b4-00c04fd430c8":3}
//! ```
//!
//! An empty table is `{}`. A record that does not decode as a whole is
//! corrupt; partial tables are never produced.
//!
//! # Modules
//!
//! - [`codec`] — table ⇄ text
//! - [`key`] — [`RecordKey`], the collision-free name of a record
//! - [`traits`] — the [`RecordStore`] storage interface
//! - [`fs`] — [`FsRecordStore`], one file per record
//! - [`memory`] — [`InMemoryRecordStore`] for tests and embedding
//! - [`manager`] — [`PersistenceManager`], load/save/purge plus recovery
//!
//! [`AgentChecksumTable`]: objcache_types::AgentChecksumTable

pub mod codec;
pub mod error;
pub mod fs;
pub mod key;
pub mod manager;
pub mod memory;
pub mod traits;

pub use codec::{decode, encode, encode_record};
pub use error::{CodecError, PersistError, PersistResult};
pub use fs::FsRecordStore;
pub use key::RecordKey;
pub use manager::{LoadResolution, LoadedRecord, PersistenceManager};
pub use memory::InMemoryRecordStore;
pub use traits::RecordStore;
