//! Entity identifiers of the form `<prefix>_<creationEpochMillis>`.
//!
//! The embedded timestamp is the only age signal left once an entity is
//! deleted, so the garbage collector and the slot-winner rule read it through
//! [`id_timestamp_millis`] and nothing else parses IDs.

use crate::domain::models::EntityKind;

pub fn entity_id(kind: EntityKind, created_at_millis: i64) -> String {
    format!("{}_{}", kind.id_prefix(), created_at_millis)
}

/// Creation time embedded in an entity ID, if it has one.
pub fn id_timestamp_millis(id: &str) -> Option<i64> {
    let (prefix, millis) = id.split_once('_')?;
    if prefix.is_empty() || millis.is_empty() || !millis.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    millis.parse::<i64>().ok()
}

/// Millisecond value for the next ID, never reusing or going below `last_issued`.
pub fn next_id_millis(now_millis: i64, last_issued: i64) -> i64 {
    now_millis.max(last_issued.saturating_add(1))
}

/// True when `candidate` was created after `other`.
///
/// Falls back to plain string order when either timestamp is missing or both
/// are equal, so the comparison is total.
pub fn is_newer_id(candidate: &str, other: &str) -> bool {
    match (id_timestamp_millis(candidate), id_timestamp_millis(other)) {
        (Some(left), Some(right)) if left != right => left > right,
        _ => candidate > other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_timestamp_from_every_prefix() {
        assert_eq!(id_timestamp_millis("t_1710000000000"), Some(1_710_000_000_000));
        assert_eq!(id_timestamp_millis("r_42"), Some(42));
        assert_eq!(id_timestamp_millis("i_7"), Some(7));
    }

    #[test]
    fn rejects_ids_without_a_numeric_timestamp() {
        assert_eq!(id_timestamp_millis("t_"), None);
        assert_eq!(id_timestamp_millis("legacy-id"), None);
        assert_eq!(id_timestamp_millis("t_12ab"), None);
        assert_eq!(id_timestamp_millis("_123"), None);
        assert_eq!(id_timestamp_millis("t_-5"), None);
    }

    #[test]
    fn ids_are_strictly_increasing_within_one_millisecond() {
        let first = next_id_millis(1_000, 0);
        let second = next_id_millis(1_000, first);
        let third = next_id_millis(999, second);
        assert_eq!((first, second, third), (1_000, 1_001, 1_002));
        assert_eq!(entity_id(EntityKind::Task, third), "t_1002");
    }

    #[test]
    fn newer_id_compares_timestamps_across_prefixes() {
        assert!(is_newer_id("r_200", "t_100"));
        assert!(!is_newer_id("t_100", "r_200"));
        assert!(is_newer_id("t_1000", "t_999"));
        assert!(is_newer_id("t_5", "r_5"));
    }
}
