//! Manual backup export and tombstone-aware import.

use crate::application::state::AppState;
use crate::domain::keys::{KeyShape, StoreKey, DELETED_IDS};
use crate::domain::merge::{
    merge_entity_arrays, merge_list_maps, parse_tombstones, sort_by_time, sweep_tombstoned,
    union_tombstones,
};
use crate::domain::models::{InboxItem, Routine, Task, MAX_INBOX_LIMIT, MIN_INBOX_LIMIT};
use crate::infrastructure::backup_file::{backup_file_name, read_backup, write_backup};
use crate::infrastructure::error::InfraError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ImportSummary {
    pub merged_keys: Vec<String>,
    pub ignored_keys: Vec<String>,
    /// Tombstones held after the merge.
    pub tombstone_count: usize,
}

/// Every key of the namespace, unprefixed, in one object. `deleted_ids` is
/// always present. A value that is not valid JSON is exported as its raw text.
pub fn export_data(state: &AppState) -> Result<Map<String, Value>, InfraError> {
    let mut document = Map::new();
    for key in state.stored_keys() {
        let Some(raw) = state.read_raw(&key) else {
            continue;
        };
        let value = serde_json::from_str::<Value>(&raw).unwrap_or_else(|error| {
            state.log_error("export_data", &format!("exporting key={key} as raw text: {error}"));
            Value::String(raw)
        });
        document.insert(key, value);
    }
    if !document.contains_key(DELETED_IDS) {
        document.insert(DELETED_IDS.to_string(), serde_json::to_value(state.deleted_ids()?)?);
    }

    state.log_info("export_data", &format!("exported keys={}", document.len()));
    Ok(document)
}

pub fn export_to_file(state: &AppState) -> Result<PathBuf, InfraError> {
    let Some(backups_dir) = state.backups_dir() else {
        return Err(InfraError::InvalidConfig(
            "no backups directory for an in-memory state".to_string(),
        ));
    };
    let document = export_data(state)?;
    let file_name = backup_file_name(&state.config().app_name, state.local_now());
    let path = write_backup(backups_dir, &file_name, &document)?;

    state.log_info("export_to_file", &format!("path={}", path.display()));
    Ok(path)
}

pub fn import_from_file(state: &AppState, path: &Path) -> Result<ImportSummary, InfraError> {
    let raw = read_backup(path)?;
    import_data(state, &raw)
}

/// Merges a backup into the store. The whole document is validated before
/// anything is written; a rejected document leaves local state untouched.
pub fn import_data(state: &AppState, raw: &str) -> Result<ImportSummary, InfraError> {
    let parsed: Value = serde_json::from_str(raw)
        .map_err(|error| InfraError::InvalidImport(format!("backup is not valid JSON: {error}")))?;
    let Value::Object(document) = parsed else {
        return Err(InfraError::InvalidImport("backup must be a JSON object".to_string()));
    };

    let runtime = state.lock_runtime()?;
    let current_date = runtime.current_date;
    let mut summary = ImportSummary::default();

    let local_tombstones = state
        .read_json::<Value>(DELETED_IDS)
        .and_then(|value| parse_tombstones(&value))
        .unwrap_or_default();
    let imported_tombstones = match document.get(DELETED_IDS) {
        Some(value) => match parse_tombstones(value) {
            Some(ids) => {
                summary.merged_keys.push(DELETED_IDS.to_string());
                ids
            }
            None => {
                summary.ignored_keys.push(DELETED_IDS.to_string());
                Vec::new()
            }
        },
        None => Vec::new(),
    };
    let tombstones = union_tombstones(&local_tombstones, &imported_tombstones);
    state.write_json(DELETED_IDS, &tombstones);
    let killed = tombstones.iter().cloned().collect::<HashSet<_>>();
    summary.tombstone_count = tombstones.len();

    for (key, value) in &document {
        if key == DELETED_IDS {
            continue;
        }
        let merged = match StoreKey::classify(key) {
            Some(StoreKey::DailyTasks(None)) | None => None,
            Some(store_key) => merge_value(state, key, store_key, value, &killed),
        };
        match merged {
            Some(merged) => {
                state.write_json(key, &merged);
                summary.merged_keys.push(key.clone());
            }
            None => summary.ignored_keys.push(key.clone()),
        }
    }

    for key in state.stored_keys() {
        if document.contains_key(&key) {
            continue;
        }
        let Some(KeyShape::EntityArray { .. }) = StoreKey::classify(&key).map(StoreKey::shape) else {
            continue;
        };
        let Some(mut items) = state.read_json::<Vec<Value>>(&key) else {
            continue;
        };
        if sweep_tombstoned(&mut items, &killed) {
            state.write_json(&key, &items);
        }
    }
    drop(runtime);

    let loaded = state.load_runtime(current_date);
    *state.lock_runtime()? = loaded;

    state.log_info(
        "import_data",
        &format!(
            "merged={} ignored={} tombstones={}",
            summary.merged_keys.len(),
            summary.ignored_keys.len(),
            summary.tombstone_count
        ),
    );
    Ok(summary)
}

/// True when `item` loads as the entity type stored under `store_key`.
fn decodes_as_entity(store_key: StoreKey, item: &Value) -> bool {
    match store_key {
        StoreKey::DailyTasks(_) => Task::deserialize(item).is_ok(),
        StoreKey::MasterRoutines => Routine::deserialize(item).is_ok(),
        StoreKey::UnscheduledInbox => InboxItem::deserialize(item).is_ok(),
        _ => false,
    }
}

/// Merged value for one recognized key, or `None` when the imported value has
/// the wrong shape. Array items that would not load as entities are dropped
/// before the union, so one bad item never makes a whole record unreadable.
fn merge_value(
    state: &AppState,
    key: &str,
    store_key: StoreKey,
    imported: &Value,
    killed: &HashSet<String>,
) -> Option<Value> {
    match store_key.shape() {
        KeyShape::EntityArray { sorted_by_time } => {
            let imported = imported
                .as_array()?
                .iter()
                .filter(|item| decodes_as_entity(store_key, item))
                .cloned()
                .collect::<Vec<_>>();
            let local = state.read_json::<Vec<Value>>(key).unwrap_or_default();
            let mut merged = merge_entity_arrays(&local, &imported, killed);
            if sorted_by_time {
                sort_by_time(&mut merged);
            }
            Some(Value::Array(merged))
        }
        KeyShape::ListMap(element) => {
            let imported = imported.as_object()?;
            let local = state.read_json::<Map<String, Value>>(key).unwrap_or_default();
            Some(Value::Object(merge_list_maps(&local, imported, element)))
        }
        KeyShape::InboxLimit => {
            let limit = imported.as_i64()?;
            (i64::from(MIN_INBOX_LIMIT)..=i64::from(MAX_INBOX_LIMIT))
                .contains(&limit)
                .then(|| Value::from(limit))
        }
        KeyShape::Flag => imported.as_bool().map(Value::Bool),
        KeyShape::Tombstones => None,
    }
}
