use crate::application::state::AppState;
use crate::domain::ids::id_timestamp_millis;
use crate::domain::keys::{StoreKey, DELETED_IDS};
use crate::domain::merge::parse_tombstones;
use chrono::Duration;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct GarbageCollectionReport {
    pub removed_task_keys: Vec<String>,
    pub pruned_tombstones: usize,
    pub kept_tombstones: usize,
}

/// Drops daily task records and tombstones older than the retention window.
///
/// Runs before any other read at startup. Keys with unparseable dates are
/// left alone; tombstones without a readable timestamp are dropped.
pub fn collect_garbage(state: &AppState) -> GarbageCollectionReport {
    let cutoff = state.now() - Duration::days(i64::from(state.config().retention_days));
    let cutoff_millis = cutoff.timestamp_millis();
    let mut report = GarbageCollectionReport::default();

    for key in state.stored_keys() {
        let Some(StoreKey::DailyTasks(Some(date))) = StoreKey::classify(&key) else {
            continue;
        };
        if date.and_time(chrono::NaiveTime::MIN).and_utc() < cutoff {
            state.remove_key(&key);
            report.removed_task_keys.push(key);
        }
    }

    if let Some(tombstones) = state
        .read_json::<Value>(DELETED_IDS)
        .and_then(|value| parse_tombstones(&value))
    {
        let total = tombstones.len();
        let kept = tombstones
            .into_iter()
            .filter(|id| id_timestamp_millis(id).is_some_and(|millis| millis >= cutoff_millis))
            .collect::<Vec<_>>();
        report.kept_tombstones = kept.len();
        report.pruned_tombstones = total - kept.len();
        if report.pruned_tombstones > 0 {
            state.write_json(DELETED_IDS, &kept);
        }
    }

    if !report.removed_task_keys.is_empty() || report.pruned_tombstones > 0 {
        state.log_info(
            "collect_garbage",
            &format!(
                "removed_task_keys={} pruned_tombstones={}",
                report.removed_task_keys.len(),
                report.pruned_tombstones
            ),
        );
    }
    report
}
