//! Tombstone-aware union of two independently edited backups.
//!
//! Works on raw JSON values so that fields this version does not model
//! survive a round trip untouched.

use crate::domain::keys::ListElement;
use serde_json::{Map, Value};
use std::collections::HashSet;

pub fn entity_id(item: &Value) -> Option<&str> {
    item.get("id").and_then(Value::as_str)
}

/// String entries of a tombstone list; `None` if the value is not a list.
pub fn parse_tombstones(value: &Value) -> Option<Vec<String>> {
    let entries = value.as_array()?;
    Some(
        entries
            .iter()
            .filter_map(Value::as_str)
            .map(ToOwned::to_owned)
            .collect(),
    )
}

/// Local order first, then imported IDs not seen yet; no duplicates.
pub fn union_tombstones(local: &[String], imported: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    local
        .iter()
        .chain(imported)
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

/// Imported items replace local items with the same `id` in place, new ones
/// are appended, then everything tombstoned is dropped.
///
/// Filtering after the union is what stops a device that never saw a
/// deletion from resurrecting the entity.
pub fn merge_entity_arrays(local: &[Value], imported: &[Value], tombstones: &HashSet<String>) -> Vec<Value> {
    let mut merged = local.to_vec();
    for item in imported {
        let Some(id) = entity_id(item) else {
            continue;
        };
        match merged.iter().position(|candidate| entity_id(candidate) == Some(id)) {
            Some(index) => merged[index] = item.clone(),
            None => merged.push(item.clone()),
        }
    }
    sweep_tombstoned(&mut merged, tombstones);
    merged
}

/// Removes tombstoned entities; returns whether anything was removed.
pub fn sweep_tombstoned(items: &mut Vec<Value>, tombstones: &HashSet<String>) -> bool {
    let before = items.len();
    items.retain(|item| entity_id(item).is_none_or(|id| !tombstones.contains(id)));
    items.len() != before
}

/// Stable sort by the `time` field; items without one sort first.
pub fn sort_by_time(items: &mut [Value]) {
    items.sort_by(|left, right| {
        let left = left.get("time").and_then(Value::as_str).unwrap_or_default();
        let right = right.get("time").and_then(Value::as_str).unwrap_or_default();
        left.cmp(right)
    });
}

/// Shallow key union where imported entries win. Imported entries that are
/// not a list of `element` values are ignored.
pub fn merge_list_maps(
    local: &Map<String, Value>,
    imported: &Map<String, Value>,
    element: ListElement,
) -> Map<String, Value> {
    let mut merged = local.clone();
    for (key, value) in imported {
        let well_typed = value
            .as_array()
            .is_some_and(|entries| entries.iter().all(|entry| element.accepts(entry)));
        if well_typed {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}
