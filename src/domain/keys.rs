use crate::domain::dates::{date_key, parse_date_key};
use chrono::NaiveDate;

pub const DAILY_TASKS_PREFIX: &str = "tasks_";
pub const MASTER_ROUTINES: &str = "master_routines";
pub const ROUTINE_OVERRIDES: &str = "routine_overrides";
pub const ROUTINE_COMPLETIONS: &str = "routine_completions";
pub const SUBTASK_STATES: &str = "subtask_states";
pub const UNSCHEDULED_INBOX: &str = "unscheduled_inbox";
pub const SETTINGS_INBOX_LIMIT: &str = "settings_inboxLimit";
pub const SETTINGS_SOUND_ENABLED: &str = "settings_soundEnabled";
pub const DELETED_IDS: &str = "deleted_ids";

pub fn tasks_key(date: NaiveDate) -> String {
    format!("{DAILY_TASKS_PREFIX}{}", date_key(date))
}

/// A recognized store key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKey {
    /// `tasks_<date>`; `None` when the date suffix does not parse.
    DailyTasks(Option<NaiveDate>),
    MasterRoutines,
    UnscheduledInbox,
    RoutineOverrides,
    RoutineCompletions,
    SubtaskStates,
    InboxLimit,
    SoundEnabled,
    DeletedIds,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyShape {
    /// List of entities carrying a string `id`.
    EntityArray { sorted_by_time: bool },
    /// Object whose values are lists of `ListElement`.
    ListMap(ListElement),
    InboxLimit,
    Flag,
    Tombstones,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListElement {
    /// Subtask index.
    Index,
    /// Entity id.
    Id,
}

impl ListElement {
    pub fn accepts(self, value: &serde_json::Value) -> bool {
        match self {
            Self::Index => value.is_u64(),
            Self::Id => value.is_string(),
        }
    }
}

impl StoreKey {
    pub fn classify(key: &str) -> Option<Self> {
        if let Some(suffix) = key.strip_prefix(DAILY_TASKS_PREFIX) {
            return Some(Self::DailyTasks(parse_date_key(suffix)));
        }
        match key {
            MASTER_ROUTINES => Some(Self::MasterRoutines),
            UNSCHEDULED_INBOX => Some(Self::UnscheduledInbox),
            ROUTINE_OVERRIDES => Some(Self::RoutineOverrides),
            ROUTINE_COMPLETIONS => Some(Self::RoutineCompletions),
            SUBTASK_STATES => Some(Self::SubtaskStates),
            SETTINGS_INBOX_LIMIT => Some(Self::InboxLimit),
            SETTINGS_SOUND_ENABLED => Some(Self::SoundEnabled),
            DELETED_IDS => Some(Self::DeletedIds),
            _ => None,
        }
    }

    pub fn shape(self) -> KeyShape {
        match self {
            Self::DailyTasks(_) | Self::MasterRoutines => KeyShape::EntityArray { sorted_by_time: true },
            Self::UnscheduledInbox => KeyShape::EntityArray { sorted_by_time: false },
            Self::RoutineOverrides | Self::RoutineCompletions => KeyShape::ListMap(ListElement::Id),
            Self::SubtaskStates => KeyShape::ListMap(ListElement::Index),
            Self::InboxLimit => KeyShape::InboxLimit,
            Self::SoundEnabled => KeyShape::Flag,
            Self::DeletedIds => KeyShape::Tombstones,
        }
    }
}
