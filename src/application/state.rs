use crate::application::bootstrap::bootstrap_workspace;
use crate::application::garbage_collector::{collect_garbage, GarbageCollectionReport};
use crate::domain::completion::{DateIdLists, SubtaskStates};
use crate::domain::ids::{entity_id, next_id_millis};
use crate::domain::keys::{
    tasks_key, DELETED_IDS, MASTER_ROUTINES, ROUTINE_COMPLETIONS, ROUTINE_OVERRIDES,
    SETTINGS_INBOX_LIMIT, SETTINGS_SOUND_ENABLED, SUBTASK_STATES, UNSCHEDULED_INBOX,
};
use crate::domain::models::{clamp_inbox_limit, EntityKind, InboxItem, Routine, Settings, Task};
use crate::infrastructure::command_log::CommandLog;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::storage::{InMemoryKeyValueStore, KeyValueStore, NamespacedStore, SqliteKeyValueStore};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

pub type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Everything the planner needs, passed explicitly to every operation.
///
/// Runtime collections sit behind a mutex so operations take `&AppState`;
/// each operation locks, mutates, persists and releases before returning.
pub struct AppState {
    store: Box<dyn KeyValueStore>,
    config: AppConfig,
    time_zone: Tz,
    now_provider: NowProvider,
    log: CommandLog,
    backups_dir: Option<PathBuf>,
    runtime: Mutex<RuntimeState>,
    startup_report: GarbageCollectionReport,
}

#[derive(Debug, Clone)]
pub(crate) struct RuntimeState {
    pub current_date: NaiveDate,
    pub tasks: Vec<Task>,
    pub routines: Vec<Routine>,
    pub overrides: DateIdLists,
    pub completions: DateIdLists,
    pub subtask_states: SubtaskStates,
    pub inbox: Vec<InboxItem>,
    pub inbox_limit: u32,
    pub sound_enabled: bool,
    pub deleted_ids: Vec<String>,
    pub last_issued_millis: i64,
}

impl RuntimeState {
    fn empty(current_date: NaiveDate, inbox_limit: u32) -> Self {
        Self {
            current_date,
            tasks: Vec::new(),
            routines: Vec::new(),
            overrides: DateIdLists::new(),
            completions: DateIdLists::new(),
            subtask_states: SubtaskStates::new(),
            inbox: Vec::new(),
            inbox_limit,
            sound_enabled: true,
            deleted_ids: Vec::new(),
            last_issued_millis: 0,
        }
    }

    /// Records a tombstone once; returns whether it was new.
    pub fn track_deleted_id(&mut self, id: &str) -> bool {
        if self.deleted_ids.iter().any(|candidate| candidate == id) {
            return false;
        }
        self.deleted_ids.push(id.to_string());
        true
    }
}

impl AppState {
    /// Opens (or creates) a workspace backed by SQLite and the command log.
    pub fn new(workspace_root: PathBuf) -> Result<Self, InfraError> {
        let workspace = bootstrap_workspace(&workspace_root)?;
        let config = workspace.config;
        let store = NamespacedStore::new(
            SqliteKeyValueStore::new(&workspace.database_path),
            config.storage_prefix.clone(),
        );

        let mut state = Self::with_store(
            Box::new(store),
            config,
            Arc::new(Utc::now),
            CommandLog::new(&workspace.logs_dir),
        )?;
        state.backups_dir = Some(workspace.backups_dir);
        Ok(state)
    }

    /// Volatile state with no log, for embedding and tests.
    pub fn in_memory(config: AppConfig, now_provider: NowProvider) -> Result<Self, InfraError> {
        let store = NamespacedStore::new(InMemoryKeyValueStore::default(), config.storage_prefix.clone());
        Self::with_store(Box::new(store), config, now_provider, CommandLog::disabled())
    }

    /// Runs the garbage collector, then loads today's data. Nothing is read
    /// from the store before the sweep.
    pub fn with_store(
        store: Box<dyn KeyValueStore>,
        config: AppConfig,
        now_provider: NowProvider,
        log: CommandLog,
    ) -> Result<Self, InfraError> {
        config.validate()?;
        let time_zone = config.time_zone()?;
        let today = (now_provider)().with_timezone(&time_zone).date_naive();
        let default_inbox_limit = config.default_inbox_limit;

        let mut state = Self {
            store,
            config,
            time_zone,
            now_provider,
            log,
            backups_dir: None,
            runtime: Mutex::new(RuntimeState::empty(today, default_inbox_limit)),
            startup_report: GarbageCollectionReport::default(),
        };

        state.startup_report = collect_garbage(&state);
        let loaded = state.load_runtime(today);
        *state.lock_runtime()? = loaded;
        Ok(state)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn backups_dir(&self) -> Option<&Path> {
        self.backups_dir.as_deref()
    }

    pub fn startup_report(&self) -> &GarbageCollectionReport {
        &self.startup_report
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.now_provider)()
    }

    pub fn local_now(&self) -> NaiveDateTime {
        self.now().with_timezone(&self.time_zone).naive_local()
    }

    pub fn today(&self) -> NaiveDate {
        self.local_now().date()
    }

    pub fn current_date(&self) -> Result<NaiveDate, InfraError> {
        Ok(self.lock_runtime()?.current_date)
    }

    pub fn tasks(&self) -> Result<Vec<Task>, InfraError> {
        Ok(self.lock_runtime()?.tasks.clone())
    }

    pub fn routines(&self) -> Result<Vec<Routine>, InfraError> {
        Ok(self.lock_runtime()?.routines.clone())
    }

    pub fn inbox(&self) -> Result<Vec<InboxItem>, InfraError> {
        Ok(self.lock_runtime()?.inbox.clone())
    }

    pub fn deleted_ids(&self) -> Result<Vec<String>, InfraError> {
        Ok(self.lock_runtime()?.deleted_ids.clone())
    }

    pub fn routine_overrides(&self) -> Result<DateIdLists, InfraError> {
        Ok(self.lock_runtime()?.overrides.clone())
    }

    pub fn routine_completions(&self) -> Result<DateIdLists, InfraError> {
        Ok(self.lock_runtime()?.completions.clone())
    }

    pub fn subtask_states(&self) -> Result<SubtaskStates, InfraError> {
        Ok(self.lock_runtime()?.subtask_states.clone())
    }

    pub fn settings(&self) -> Result<Settings, InfraError> {
        let runtime = self.lock_runtime()?;
        Ok(Settings {
            inbox_limit: runtime.inbox_limit,
            sound_enabled: runtime.sound_enabled,
        })
    }

    pub fn log_info(&self, command: &str, message: &str) {
        self.log.info(command, message);
    }

    pub fn log_error(&self, command: &str, message: &str) {
        self.log.error(command, message);
    }

    pub(crate) fn lock_runtime(&self) -> Result<MutexGuard<'_, RuntimeState>, InfraError> {
        self.runtime
            .lock()
            .map_err(|error| InfraError::InvalidConfig(format!("runtime lock poisoned: {error}")))
    }

    /// Re-reads every record for `date` from the store.
    pub(crate) fn load_runtime(&self, date: NaiveDate) -> RuntimeState {
        let inbox_limit = self
            .read_json::<i64>(SETTINGS_INBOX_LIMIT)
            .map(clamp_inbox_limit)
            .unwrap_or(self.config.default_inbox_limit);
        let last_issued_millis = self
            .lock_runtime()
            .map(|runtime| runtime.last_issued_millis)
            .unwrap_or_default();

        RuntimeState {
            current_date: date,
            tasks: self.read_json(&tasks_key(date)).unwrap_or_default(),
            routines: self.read_json(MASTER_ROUTINES).unwrap_or_default(),
            overrides: self.read_json(ROUTINE_OVERRIDES).unwrap_or_default(),
            completions: self.read_json(ROUTINE_COMPLETIONS).unwrap_or_default(),
            subtask_states: self.read_json(SUBTASK_STATES).unwrap_or_default(),
            inbox: self.read_json(UNSCHEDULED_INBOX).unwrap_or_default(),
            inbox_limit,
            sound_enabled: self.read_json(SETTINGS_SOUND_ENABLED).unwrap_or(true),
            deleted_ids: self.read_json(DELETED_IDS).unwrap_or_default(),
            last_issued_millis,
        }
    }

    pub(crate) fn reload(&self) -> Result<(), InfraError> {
        let date = self.current_date()?;
        let loaded = self.load_runtime(date);
        *self.lock_runtime()? = loaded;
        Ok(())
    }

    pub(crate) fn next_entity_id(&self, runtime: &mut RuntimeState, kind: EntityKind) -> String {
        let millis = next_id_millis(self.now().timestamp_millis(), runtime.last_issued_millis);
        runtime.last_issued_millis = millis;
        entity_id(kind, millis)
    }

    /// Stored text of `key`. Store failures are logged and read as missing.
    pub(crate) fn read_raw(&self, key: &str) -> Option<String> {
        self.store.get(key).unwrap_or_else(|error| {
            self.log_error("read", &format!("failed to read key={key}: {error}"));
            None
        })
    }

    /// `Ok(None)` only when the key is absent. Callers that rewrite a record
    /// use this to tell "missing" apart from "unreadable".
    pub(crate) fn try_read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, InfraError> {
        match self.store.get(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Decoded value, or `None` when missing or unreadable. Failures are
    /// logged and otherwise swallowed.
    pub(crate) fn read_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.try_read_json(key).unwrap_or_else(|error| {
            self.log_error("read", &format!("failed to read key={key}: {error}"));
            None
        })
    }

    /// Write failures are logged, never raised; the in-memory state stays
    /// authoritative until the next reload.
    pub(crate) fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let result = serde_json::to_string(value)
            .map_err(InfraError::from)
            .and_then(|raw| self.store.set(key, &raw));
        if let Err(error) = result {
            self.log_error("write", &format!("failed to write key={key}: {error}"));
        }
    }

    pub(crate) fn remove_key(&self, key: &str) {
        if let Err(error) = self.store.remove(key) {
            self.log_error("remove", &format!("failed to remove key={key}: {error}"));
        }
    }

    pub(crate) fn stored_keys(&self) -> Vec<String> {
        self.store.keys().unwrap_or_else(|error| {
            self.log_error("keys", &format!("failed to list keys: {error}"));
            Vec::new()
        })
    }

    pub(crate) fn persist_tasks(&self, runtime: &RuntimeState) {
        self.write_json(&tasks_key(runtime.current_date), &runtime.tasks);
    }

    pub(crate) fn persist_routines(&self, runtime: &RuntimeState) {
        self.write_json(MASTER_ROUTINES, &runtime.routines);
    }

    pub(crate) fn persist_inbox(&self, runtime: &RuntimeState) {
        self.write_json(UNSCHEDULED_INBOX, &runtime.inbox);
    }

    pub(crate) fn persist_deleted_ids(&self, runtime: &RuntimeState) {
        self.write_json(DELETED_IDS, &runtime.deleted_ids);
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::infrastructure::storage::InMemoryKeyValueStore;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

    /// Settable clock shared between a test and the state under test.
    #[derive(Clone)]
    pub struct TestClock {
        millis: Arc<AtomicI64>,
    }

    impl TestClock {
        pub fn at(value: &str) -> Self {
            let start = DateTime::parse_from_rfc3339(value)
                .expect("valid datetime")
                .with_timezone(&Utc);
            Self {
                millis: Arc::new(AtomicI64::new(start.timestamp_millis())),
            }
        }

        pub fn advance_minutes(&self, minutes: i64) {
            self.millis.fetch_add(minutes * 60_000, Ordering::Relaxed);
        }

        pub fn provider(&self) -> NowProvider {
            let millis = Arc::clone(&self.millis);
            Arc::new(move || {
                Utc.timestamp_millis_opt(millis.load(Ordering::Relaxed))
                    .single()
                    .expect("valid timestamp")
            })
        }
    }

    static NEXT_TEMP_WORKSPACE: AtomicUsize = AtomicUsize::new(0);

    pub struct TempWorkspace {
        pub path: PathBuf,
    }

    impl TempWorkspace {
        pub fn new() -> Self {
            let sequence = NEXT_TEMP_WORKSPACE.fetch_add(1, Ordering::Relaxed);
            let path = std::env::temp_dir().join(format!(
                "slate-core-tests-{}-{}",
                std::process::id(),
                sequence
            ));
            std::fs::create_dir_all(&path).expect("create temp workspace");
            Self { path }
        }

        pub fn app_state(&self) -> AppState {
            AppState::new(self.path.clone()).expect("initialize app state")
        }
    }

    impl Drop for TempWorkspace {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.path);
        }
    }

    /// Saturday 2026-10-17, 10:00 UTC.
    pub const NOW: &str = "2026-10-17T10:00:00Z";

    pub fn in_memory_state() -> (AppState, TestClock) {
        let clock = TestClock::at(NOW);
        let state = AppState::in_memory(AppConfig::default(), clock.provider()).expect("in-memory state");
        (state, clock)
    }

    /// In-memory state whose store is seeded before startup.
    pub fn seeded_state(entries: &[(&str, serde_json::Value)], clock: &TestClock) -> AppState {
        let raw = entries
            .iter()
            .map(|(key, value)| (*key, value.to_string()))
            .collect::<Vec<_>>();
        let borrowed = raw.iter().map(|(key, value)| (*key, value.as_str())).collect::<Vec<_>>();
        seeded_raw_state(&borrowed, clock)
    }

    /// Like `seeded_state`, but stores each value text verbatim.
    pub fn seeded_raw_state(entries: &[(&str, &str)], clock: &TestClock) -> AppState {
        let config = AppConfig::default();
        let store = NamespacedStore::new(InMemoryKeyValueStore::default(), config.storage_prefix.clone());
        for (key, value) in entries {
            store.set(key, value).expect("seed store");
        }
        AppState::with_store(Box::new(store), config, clock.provider(), CommandLog::disabled())
            .expect("seeded state")
    }
}
