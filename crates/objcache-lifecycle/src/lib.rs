//! Session lifecycle for the object cache.
//!
//! Ties the in-memory [`ObjectCacheStore`] to durable checkpoints. When an
//! agent connects, its checkpoint is loaded on the tokio runtime without
//! blocking the caller; when it leaves, its table is evicted and written
//! back before the disconnect returns.
//!
//! # Architecture
//!
//! - **Loading** never blocks a connect. Until the load lands, queries for
//!   the agent answer "no cache", which is always safe.
//! - **Saving** happens once per active session, on the disconnecting
//!   thread. Transitional sessions drop their table unsaved.
//! - **Failures** never reach the client session. Corrupt checkpoints are
//!   deleted; unreadable or unwritable ones are logged and skipped.
//!
//! # Modules
//!
//! - [`config`] — [`CacheConfig`], the `[object_cache]` TOML section
//! - [`controller`] — [`CacheLifecycle`], connect/disconnect handling
//! - [`session`] — per-agent [`SessionState`] and operation outcomes
//! - [`error`] — startup errors
//!
//! [`ObjectCacheStore`]: objcache_store::ObjectCacheStore

pub mod config;
pub mod controller;
pub mod error;
pub mod session;

pub use config::{CacheConfig, ConfigFile, DEFAULT_RECORD_DIR, MODULE_NAME};
pub use controller::CacheLifecycle;
pub use error::{LifecycleError, LifecycleResult};
pub use session::{DisconnectOutcome, LoadHandle, LoadOutcome, SessionState};
