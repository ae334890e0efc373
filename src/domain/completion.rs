//! Per-date bookkeeping keyed by `(dateKey, blockId)`.
//!
//! Nothing here knows about parent blocks or array positions, so history
//! survives reordering and routine edits.

use std::collections::BTreeMap;

/// `dateKey -> [routineId]`, used for both skip overrides and completions.
pub type DateIdLists = BTreeMap<String, Vec<String>>;

/// `<dateKey>_<blockId> -> [checked subtask index]`.
pub type SubtaskStates = BTreeMap<String, Vec<usize>>;

pub fn subtask_state_key(date_key: &str, block_id: &str) -> String {
    format!("{date_key}_{block_id}")
}

/// Flips membership of `value`; returns whether it is present afterwards.
pub fn toggle_membership<T: PartialEq>(list: &mut Vec<T>, value: T) -> bool {
    if let Some(position) = list.iter().position(|candidate| *candidate == value) {
        list.remove(position);
        false
    } else {
        list.push(value);
        true
    }
}

/// Returns the number of checked subtasks after the flip.
pub fn toggle_subtask(states: &mut SubtaskStates, block_id: &str, index: usize, date_key: &str) -> usize {
    let checked = states.entry(subtask_state_key(date_key, block_id)).or_default();
    toggle_membership(checked, index);
    checked.len()
}

pub fn checked_subtasks<'a>(states: &'a SubtaskStates, block_id: &str, date_key: &str) -> &'a [usize] {
    states
        .get(&subtask_state_key(date_key, block_id))
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

pub fn is_listed(lists: &DateIdLists, date_key: &str, id: &str) -> bool {
    lists
        .get(date_key)
        .is_some_and(|ids| ids.iter().any(|candidate| candidate == id))
}

/// Returns whether the routine is complete for the date afterwards.
pub fn toggle_routine_completion(completions: &mut DateIdLists, routine_id: &str, date_key: &str) -> bool {
    toggle_membership(completions.entry(date_key.to_string()).or_default(), routine_id.to_string())
}

/// Returns `true` when the id was not listed yet.
pub fn add_listed(lists: &mut DateIdLists, id: &str, date_key: &str) -> bool {
    let ids = lists.entry(date_key.to_string()).or_default();
    if ids.iter().any(|candidate| candidate == id) {
        return false;
    }
    ids.push(id.to_string());
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_subtask_counts_checked_indices() {
        let mut states = SubtaskStates::new();
        assert_eq!(toggle_subtask(&mut states, "t_1", 0, "2026-10-17"), 1);
        assert_eq!(toggle_subtask(&mut states, "t_1", 2, "2026-10-17"), 2);
        assert_eq!(toggle_subtask(&mut states, "t_1", 0, "2026-10-17"), 1);
        assert_eq!(checked_subtasks(&states, "t_1", "2026-10-17"), &[2]);
        assert!(states.contains_key("2026-10-17_t_1"));
    }

    #[test]
    fn subtask_state_is_scoped_per_date() {
        let mut states = SubtaskStates::new();
        toggle_subtask(&mut states, "r_1", 0, "2026-10-16");
        assert_eq!(toggle_subtask(&mut states, "r_1", 1, "2026-10-17"), 1);
        assert!(checked_subtasks(&states, "r_1", "2026-10-18").is_empty());
    }

    #[test]
    fn routine_completion_toggles_and_override_is_idempotent() {
        let mut completions = DateIdLists::new();
        assert!(toggle_routine_completion(&mut completions, "r_1", "2026-10-17"));
        assert!(is_listed(&completions, "2026-10-17", "r_1"));
        assert!(!toggle_routine_completion(&mut completions, "r_1", "2026-10-17"));
        assert!(!is_listed(&completions, "2026-10-17", "r_1"));

        let mut overrides = DateIdLists::new();
        assert!(add_listed(&mut overrides, "r_1", "2026-10-17"));
        assert!(!add_listed(&mut overrides, "r_1", "2026-10-17"));
        assert_eq!(overrides["2026-10-17"], vec!["r_1".to_string()]);
    }
}
