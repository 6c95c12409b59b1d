use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use objcache_persist::{FsRecordStore, LoadResolution, PersistenceManager, RecordStore};
use objcache_store::{ObjectCache, ObjectCacheStore};
use objcache_types::{AgentId, CacheMissKind, Checksum, ObjectId};
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use crate::config::CacheConfig;
use crate::error::{LifecycleError, LifecycleResult};
use crate::session::{DisconnectOutcome, LoadHandle, LoadOutcome, SessionState};

/// Per-agent bookkeeping. Absent from the map means `Disconnected`.
struct Session {
    state: SessionState,
    /// Distinguishes this session from earlier or later ones of the same
    /// agent, so a stale load result is never installed.
    generation: u64,
    task: Option<AbortHandle>,
}

struct Inner {
    region: String,
    cache: Arc<ObjectCacheStore>,
    persistence: PersistenceManager,
    // Lock order: `sessions` before the store's own lock.
    sessions: Mutex<HashMap<AgentId, Session>>,
    next_generation: AtomicU64,
    runtime: Handle,
}

impl Inner {
    fn sessions(&self) -> MutexGuard<'_, HashMap<AgentId, Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_generation(&self) -> u64 {
        self.next_generation.fetch_add(1, Ordering::Relaxed)
    }

    /// Install a finished load if the session that asked for it is still
    /// waiting for it.
    fn complete_load(&self, agent: AgentId, generation: u64, resolution: LoadResolution) -> LoadOutcome {
        let mut sessions = self.sessions();
        let Some(session) = sessions
            .get_mut(&agent)
            .filter(|s| s.generation == generation && s.state == SessionState::Loading)
        else {
            debug!(agent = %agent, generation, "discarding stale checkpoint load");
            return LoadOutcome::Cancelled;
        };

        let outcome = match &resolution {
            LoadResolution::Restored(table) => LoadOutcome::Restored {
                entries: table.len(),
            },
            LoadResolution::Fresh => LoadOutcome::Fresh,
            LoadResolution::Recovered => LoadOutcome::Recovered,
            LoadResolution::Unavailable => LoadOutcome::Unavailable,
        };
        let entries = self.cache.install(agent, resolution.into_table());
        session.state = SessionState::Active;
        session.task = None;

        debug!(agent = %agent, region = %self.region, entries, "agent cache active");
        outcome
    }
}

/// Drives each agent's cache through connect and disconnect for one region.
///
/// Connects schedule the checkpoint load on the tokio runtime and return at
/// once; until it lands, queries for that agent see no cache. Disconnects
/// evict the table and write it out on the calling thread.
#[derive(Clone)]
pub struct CacheLifecycle {
    inner: Arc<Inner>,
}

impl CacheLifecycle {
    /// Create a lifecycle for `region` that schedules loads on `runtime`.
    pub fn new(persistence: PersistenceManager, region: &str, runtime: Handle) -> LifecycleResult<Self> {
        if region.is_empty() {
            return Err(LifecycleError::Config("region name must not be empty".into()));
        }
        Ok(Self {
            inner: Arc::new(Inner {
                region: region.to_string(),
                cache: Arc::new(ObjectCacheStore::new()),
                persistence,
                sessions: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(0),
                runtime,
            }),
        })
    }

    /// Like [`CacheLifecycle::new`], using the runtime of the calling context.
    pub fn with_current_runtime(persistence: PersistenceManager, region: &str) -> LifecycleResult<Self> {
        let runtime = Handle::try_current().map_err(|_| LifecycleError::NoRuntime)?;
        Self::new(persistence, region, runtime)
    }

    /// Start from configuration, keeping records on the filesystem.
    ///
    /// Fails with [`LifecycleError::Disabled`] unless the configuration
    /// selects this module. The record directory is created if missing.
    pub fn from_config(config: &CacheConfig, region: &str) -> LifecycleResult<Self> {
        if !config.is_enabled() {
            return Err(LifecycleError::Disabled {
                module: config.module.clone(),
            });
        }
        let records: Arc<dyn RecordStore> = Arc::new(FsRecordStore::open(&config.path_to_save_files)?);
        let lifecycle = Self::with_current_runtime(PersistenceManager::new(records), region)?;
        info!(
            region,
            path = %config.path_to_save_files.display(),
            "object cache enabled"
        );
        Ok(lifecycle)
    }

    pub fn region(&self) -> &str {
        &self.inner.region
    }

    /// The shared store answering cache queries.
    pub fn cache(&self) -> Arc<ObjectCacheStore> {
        Arc::clone(&self.inner.cache)
    }

    pub fn persistence(&self) -> &PersistenceManager {
        &self.inner.persistence
    }

    /// Current lifecycle state of `agent`.
    pub fn state(&self, agent: AgentId) -> SessionState {
        self.inner
            .sessions()
            .get(&agent)
            .map_or(SessionState::Disconnected, |s| s.state)
    }

    /// Handle an agent connecting to this region.
    ///
    /// Schedules the checkpoint load and returns without waiting for it.
    pub fn on_agent_connected(&self, agent: AgentId) -> LoadHandle {
        let mut sessions = self.inner.sessions();
        if let Some(session) = sessions.get(&agent) {
            if matches!(session.state, SessionState::Loading | SessionState::Active) {
                debug!(agent = %agent, state = %session.state, "duplicate connect ignored");
                return LoadHandle::ready(LoadOutcome::Skipped);
            }
        }

        let generation = self.inner.next_generation();
        let inner = Arc::clone(&self.inner);
        // The session entry is inserted before `sessions` unlocks, so the
        // task can never complete against a missing entry.
        let task = self.inner.runtime.spawn(async move {
            let persistence = inner.persistence.clone();
            let region = inner.region.clone();
            let resolution = match tokio::task::spawn_blocking(move || {
                persistence.load_or_recover(agent, &region)
            })
            .await
            {
                Ok(resolution) => resolution,
                Err(e) => {
                    warn!(agent = %agent, error = %e, "checkpoint load task failed");
                    LoadResolution::Unavailable
                }
            };
            inner.complete_load(agent, generation, resolution)
        });

        sessions.insert(
            agent,
            Session {
                state: SessionState::Loading,
                generation,
                task: Some(task.abort_handle()),
            },
        );
        debug!(agent = %agent, region = %self.inner.region, generation, "checkpoint load scheduled");
        LoadHandle::pending(task)
    }

    /// Handle an agent leaving.
    ///
    /// The agent's table is evicted in one step, then written to the
    /// `(agent, region)` checkpoint if the session was active. Blocks until
    /// the write finishes. A failed write is logged and reported but the
    /// eviction stands.
    pub fn on_agent_disconnected(
        &self,
        agent: AgentId,
        region: &str,
        active_session: bool,
    ) -> DisconnectOutcome {
        let (table, generation) = {
            let mut sessions = self.inner.sessions();
            let prior = sessions.remove(&agent);
            let table = self.inner.cache.evict(agent);

            if let Some(Session {
                state: SessionState::Loading,
                task,
                ..
            }) = prior
            {
                if let Some(task) = task {
                    task.abort();
                }
                debug!(agent = %agent, "disconnected while loading; load cancelled");
                return DisconnectOutcome::CancelledLoad;
            }
            if !active_session {
                debug!(agent = %agent, "transitional session closed; not saving");
                return DisconnectOutcome::Transitional;
            }
            let Some(table) = table else {
                debug!(agent = %agent, "no cached objects to save");
                return DisconnectOutcome::NothingCached;
            };

            let generation = self.inner.next_generation();
            sessions.insert(
                agent,
                Session {
                    state: SessionState::Saving,
                    generation,
                    task: None,
                },
            );
            (table, generation)
        };

        let outcome = match self.inner.persistence.save(agent, region, &table) {
            Ok(entries) => DisconnectOutcome::Saved { entries },
            Err(e) => {
                warn!(agent = %agent, region, error = %e, "failed to save checkpoint");
                DisconnectOutcome::SaveFailed {
                    reason: e.to_string(),
                }
            }
        };

        let mut sessions = self.inner.sessions();
        if sessions.get(&agent).is_some_and(|s| s.generation == generation) {
            sessions.remove(&agent);
        }
        outcome
    }
}

impl ObjectCache for CacheLifecycle {
    fn use_cached_object(&self, agent: AgentId, object: ObjectId, checksum: Checksum) -> bool {
        self.inner.cache.use_cached_object(agent, object, checksum)
    }

    fn add_cached_object(&self, agent: AgentId, object: ObjectId, checksum: Checksum) {
        self.inner.cache.add_cached_object(agent, object, checksum)
    }

    fn remove_object(&self, agent: AgentId, object: ObjectId, reason: CacheMissKind) {
        self.inner.cache.remove_object(agent, object, reason)
    }
}

impl std::fmt::Debug for CacheLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheLifecycle")
            .field("region", &self.inner.region)
            .field("cache", &self.inner.cache)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::Condvar;
    use std::time::Duration;

    use objcache_persist::{
        InMemoryRecordStore, LoadedRecord, PersistResult, RecordKey,
    };
    use objcache_types::AgentChecksumTable;

    const REGION: &str = "Sandbox";

    fn agent(n: u8) -> AgentId {
        AgentId::from_bytes([n; 16])
    }

    fn obj(n: u8) -> ObjectId {
        ObjectId::from_bytes([n; 16])
    }

    fn crc(n: u32) -> Checksum {
        Checksum::new(n)
    }

    fn memory_lifecycle() -> (Arc<InMemoryRecordStore>, CacheLifecycle) {
        let records = Arc::new(InMemoryRecordStore::new());
        let lifecycle =
            CacheLifecycle::with_current_runtime(PersistenceManager::new(records.clone()), REGION)
                .unwrap();
        (records, lifecycle)
    }

    /// Record store whose reads block until released.
    #[derive(Default)]
    struct GatedRecordStore {
        records: InMemoryRecordStore,
        open: Mutex<bool>,
        cond: Condvar,
        entered: AtomicBool,
    }

    impl GatedRecordStore {
        fn release(&self) {
            *self.open.lock().unwrap() = true;
            self.cond.notify_all();
        }

        async fn until_entered(&self) {
            while !self.entered.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        }
    }

    impl RecordStore for GatedRecordStore {
        fn read(&self, key: &RecordKey) -> PersistResult<Option<String>> {
            self.entered.store(true, Ordering::SeqCst);
            let mut open = self.open.lock().unwrap();
            while !*open {
                open = self.cond.wait(open).unwrap();
            }
            drop(open);
            self.records.read(key)
        }

        fn write(&self, key: &RecordKey, contents: &str) -> PersistResult<()> {
            self.records.write(key, contents)
        }

        fn delete(&self, key: &RecordKey) -> PersistResult<bool> {
            self.records.delete(key)
        }

        fn list(&self) -> PersistResult<Vec<RecordKey>> {
            self.records.list()
        }
    }

    fn gated_lifecycle() -> (Arc<GatedRecordStore>, CacheLifecycle) {
        let records = Arc::new(GatedRecordStore::default());
        let lifecycle =
            CacheLifecycle::with_current_runtime(PersistenceManager::new(records.clone()), REGION)
                .unwrap();
        (records, lifecycle)
    }

    // -----------------------------------------------------------------------
    // Connect / disconnect round trip
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn disconnect_flushes_and_reconnect_restores() {
        let dir = tempfile::tempdir().unwrap();
        let config = CacheConfig {
            path_to_save_files: dir.path().join("ObjectCache"),
            ..CacheConfig::default()
        };
        let lifecycle = CacheLifecycle::from_config(&config, REGION).unwrap();

        assert_eq!(lifecycle.on_agent_connected(agent(1)).wait().await, LoadOutcome::Fresh);
        assert_eq!(lifecycle.state(agent(1)), SessionState::Active);

        lifecycle.add_cached_object(agent(1), obj(1), crc(7));
        let outcome = lifecycle.on_agent_disconnected(agent(1), REGION, true);
        assert_eq!(outcome, DisconnectOutcome::Saved { entries: 1 });
        assert_eq!(lifecycle.state(agent(1)), SessionState::Disconnected);
        assert!(!lifecycle.use_cached_object(agent(1), obj(1), crc(7)));

        let expected: AgentChecksumTable = [(obj(1), crc(7))].into_iter().collect();
        assert_eq!(
            lifecycle.persistence().load(agent(1), REGION).unwrap(),
            LoadedRecord::Found(expected)
        );

        let outcome = lifecycle.on_agent_connected(agent(1)).wait().await;
        assert_eq!(outcome, LoadOutcome::Restored { entries: 1 });
        assert!(lifecycle.use_cached_object(agent(1), obj(1), crc(7)));
        assert!(!lifecycle.use_cached_object(agent(1), obj(1), crc(8)));
    }

    #[tokio::test]
    async fn corrupt_checkpoint_is_deleted_and_agent_starts_empty() {
        let (records, lifecycle) = memory_lifecycle();
        let key = RecordKey::new(agent(1), REGION).unwrap();
        records.write(&key, "{\"garbage\": -3").unwrap();

        let outcome = lifecycle.on_agent_connected(agent(1)).wait().await;
        assert_eq!(outcome, LoadOutcome::Recovered);
        assert_eq!(lifecycle.state(agent(1)), SessionState::Active);
        assert!(!records.exists(&key).unwrap());
        assert!(!lifecycle.use_cached_object(agent(1), obj(1), crc(0)));
        assert_eq!(lifecycle.cache().cached_object_count(agent(1)), 0);
    }

    #[tokio::test]
    async fn transitional_disconnect_evicts_without_saving() {
        let (records, lifecycle) = memory_lifecycle();
        lifecycle.on_agent_connected(agent(1)).wait().await;
        lifecycle.add_cached_object(agent(1), obj(1), crc(3));

        let outcome = lifecycle.on_agent_disconnected(agent(1), REGION, false);
        assert_eq!(outcome, DisconnectOutcome::Transitional);
        assert!(records.is_empty());
        assert!(!lifecycle.cache().contains_agent(agent(1)));
        assert_eq!(lifecycle.state(agent(1)), SessionState::Disconnected);
    }

    #[tokio::test]
    async fn unknown_agent_disconnect_has_nothing_to_save() {
        let (records, lifecycle) = memory_lifecycle();
        let outcome = lifecycle.on_agent_disconnected(agent(9), REGION, true);
        assert_eq!(outcome, DisconnectOutcome::NothingCached);
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn empty_active_table_is_saved_as_empty_record() {
        let (records, lifecycle) = memory_lifecycle();
        lifecycle.on_agent_connected(agent(1)).wait().await;

        let outcome = lifecycle.on_agent_disconnected(agent(1), REGION, true);
        assert_eq!(outcome, DisconnectOutcome::Saved { entries: 0 });
        let key = RecordKey::new(agent(1), REGION).unwrap();
        assert_eq!(records.read(&key).unwrap().as_deref(), Some("{}\n"));
    }

    #[tokio::test]
    async fn duplicate_connect_is_skipped() {
        let (_records, lifecycle) = memory_lifecycle();
        lifecycle.on_agent_connected(agent(1)).wait().await;
        lifecycle.add_cached_object(agent(1), obj(1), crc(1));

        assert_eq!(lifecycle.on_agent_connected(agent(1)).wait().await, LoadOutcome::Skipped);
        assert!(lifecycle.use_cached_object(agent(1), obj(1), crc(1)));
    }

    #[tokio::test]
    async fn save_failure_is_reported_and_eviction_stands() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("records");
        let records: Arc<dyn RecordStore> = Arc::new(FsRecordStore::open(&root).unwrap());
        let lifecycle =
            CacheLifecycle::with_current_runtime(PersistenceManager::new(records), REGION).unwrap();

        lifecycle.on_agent_connected(agent(1)).wait().await;
        lifecycle.add_cached_object(agent(1), obj(1), crc(5));
        std::fs::remove_dir_all(&root).unwrap();

        let outcome = lifecycle.on_agent_disconnected(agent(1), REGION, true);
        assert!(matches!(outcome, DisconnectOutcome::SaveFailed { .. }));
        assert!(!lifecycle.cache().contains_agent(agent(1)));
        assert_eq!(lifecycle.state(agent(1)), SessionState::Disconnected);
    }

    #[tokio::test]
    async fn saves_under_the_disconnect_region() {
        let (records, lifecycle) = memory_lifecycle();
        lifecycle.on_agent_connected(agent(1)).wait().await;
        lifecycle.add_cached_object(agent(1), obj(1), crc(5));

        lifecycle.on_agent_disconnected(agent(1), "Elsewhere", true);
        let key = RecordKey::new(agent(1), "Elsewhere").unwrap();
        assert!(records.exists(&key).unwrap());
        assert!(!records.exists(&RecordKey::new(agent(1), REGION).unwrap()).unwrap());
    }

    // -----------------------------------------------------------------------
    // Loading window
    // -----------------------------------------------------------------------

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn queries_before_load_completes_see_no_cache() {
        let (records, lifecycle) = gated_lifecycle();
        let key = RecordKey::new(agent(1), REGION).unwrap();
        records
            .write(&key, &objcache_persist::encode_record(
                &[(obj(1), crc(1)), (obj(2), crc(2))].into_iter().collect(),
            ))
            .unwrap();

        let handle = lifecycle.on_agent_connected(agent(1));
        records.until_entered().await;
        assert_eq!(lifecycle.state(agent(1)), SessionState::Loading);
        assert!(!lifecycle.use_cached_object(agent(1), obj(1), crc(1)));

        // An add during the load survives it and wins over the checkpoint.
        lifecycle.add_cached_object(agent(1), obj(2), crc(20));

        records.release();
        assert_eq!(handle.wait().await, LoadOutcome::Restored { entries: 2 });
        assert!(lifecycle.use_cached_object(agent(1), obj(1), crc(1)));
        assert!(lifecycle.use_cached_object(agent(1), obj(2), crc(20)));
        assert!(!lifecycle.use_cached_object(agent(1), obj(2), crc(2)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn disconnect_while_loading_discards_result_and_skips_save() {
        let (records, lifecycle) = gated_lifecycle();
        let key = RecordKey::new(agent(1), REGION).unwrap();
        records.write(&key, "{}").unwrap();

        let handle = lifecycle.on_agent_connected(agent(1));
        records.until_entered().await;
        lifecycle.add_cached_object(agent(1), obj(1), crc(1));

        let outcome = lifecycle.on_agent_disconnected(agent(1), REGION, true);
        assert_eq!(outcome, DisconnectOutcome::CancelledLoad);

        records.release();
        assert_eq!(handle.wait().await, LoadOutcome::Cancelled);

        // Give the orphaned blocking read time to finish; nothing may land.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!lifecycle.cache().contains_agent(agent(1)));
        assert_eq!(lifecycle.state(agent(1)), SessionState::Disconnected);
        assert_eq!(records.records.read(&key).unwrap().as_deref(), Some("{}"));
    }

    #[tokio::test]
    async fn stale_load_result_is_not_installed() {
        let (_records, lifecycle) = memory_lifecycle();
        let table: AgentChecksumTable = [(obj(1), crc(1))].into_iter().collect();

        // No session at all.
        let outcome = lifecycle
            .inner
            .complete_load(agent(1), 0, LoadResolution::Restored(table.clone()));
        assert_eq!(outcome, LoadOutcome::Cancelled);
        assert!(!lifecycle.cache().contains_agent(agent(1)));

        // A newer session of the same agent.
        lifecycle.on_agent_connected(agent(1)).wait().await;
        lifecycle.on_agent_disconnected(agent(1), REGION, false);
        let handle = lifecycle.on_agent_connected(agent(1));
        let outcome = lifecycle
            .inner
            .complete_load(agent(1), 0, LoadResolution::Restored(table));
        assert_eq!(outcome, LoadOutcome::Cancelled);
        assert_eq!(handle.wait().await, LoadOutcome::Fresh);
        assert!(!lifecycle.use_cached_object(agent(1), obj(1), crc(1)));
    }

    // -----------------------------------------------------------------------
    // Construction and concurrency
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn disabled_config_refuses_to_start() {
        let config = CacheConfig {
            module: "SomethingElse".into(),
            ..CacheConfig::default()
        };
        let err = CacheLifecycle::from_config(&config, REGION).unwrap_err();
        assert!(matches!(err, LifecycleError::Disabled { .. }));
    }

    #[tokio::test]
    async fn from_config_creates_record_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("nested").join("ObjectCache");
        let config = CacheConfig {
            path_to_save_files: root.clone(),
            ..CacheConfig::default()
        };
        let lifecycle = CacheLifecycle::from_config(&config, REGION).unwrap();
        assert!(root.is_dir());
        assert_eq!(lifecycle.region(), REGION);
    }

    #[test]
    fn requires_a_runtime() {
        let records: Arc<dyn RecordStore> = Arc::new(InMemoryRecordStore::new());
        let err = CacheLifecycle::with_current_runtime(PersistenceManager::new(records), REGION)
            .unwrap_err();
        assert!(matches!(err, LifecycleError::NoRuntime));
    }

    #[tokio::test]
    async fn empty_region_is_rejected() {
        let records: Arc<dyn RecordStore> = Arc::new(InMemoryRecordStore::new());
        let err =
            CacheLifecycle::with_current_runtime(PersistenceManager::new(records), "").unwrap_err();
        assert!(matches!(err, LifecycleError::Config(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn many_agents_cycle_concurrently() {
        let (records, lifecycle) = memory_lifecycle();
        let mut tasks = Vec::new();

        for n in 0u8..16 {
            let lifecycle = lifecycle.clone();
            tasks.push(tokio::spawn(async move {
                lifecycle.on_agent_connected(agent(n)).wait().await;
                for i in 0u8..10 {
                    lifecycle.add_cached_object(agent(n), obj(i), crc(u32::from(n)));
                }
                lifecycle.remove_object(agent(n), obj(0), CacheMissKind::Full);
                lifecycle.on_agent_disconnected(agent(n), REGION, true)
            }));
        }

        for task in tasks {
            assert_eq!(task.await.unwrap(), DisconnectOutcome::Saved { entries: 9 });
        }
        assert_eq!(records.len(), 16);
        assert_eq!(lifecycle.cache().agent_count(), 0);
    }
}
