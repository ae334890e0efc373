use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Task,
    Routine,
    Inbox,
}

impl EntityKind {
    pub fn id_prefix(self) -> &'static str {
        match self {
            Self::Task => "t",
            Self::Routine => "r",
            Self::Inbox => "i",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    Active,
    Completed,
}

impl TaskStatus {
    /// pending -> active -> completed -> pending
    pub fn next(self) -> Self {
        match self {
            Self::Pending => Self::Active,
            Self::Active => Self::Completed,
            Self::Completed => Self::Pending,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }
}

fn task_kind() -> EntityKind {
    EntityKind::Task
}

fn routine_kind() -> EntityKind {
    EntityKind::Routine
}

fn inbox_kind() -> EntityKind {
    EntityKind::Inbox
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub id: String,
    pub time: String,
    pub title: String,
    #[serde(default)]
    pub subtasks: Vec<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(rename = "type", default = "task_kind")]
    pub kind: EntityKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Routine {
    pub id: String,
    pub time: String,
    pub title: String,
    #[serde(default)]
    pub days: Vec<u8>,
    #[serde(default)]
    pub subtasks: Vec<String>,
    #[serde(rename = "type", default = "routine_kind")]
    pub kind: EntityKind,
}

impl Routine {
    pub fn runs_on(&self, weekday: u8) -> bool {
        self.days.contains(&weekday)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InboxItem {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub subtasks: Vec<String>,
    #[serde(rename = "type", default = "inbox_kind")]
    pub kind: EntityKind,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Settings {
    pub inbox_limit: u32,
    pub sound_enabled: bool,
}

pub const MIN_INBOX_LIMIT: u32 = 1;
pub const MAX_INBOX_LIMIT: u32 = 99;

pub fn clamp_inbox_limit(value: i64) -> u32 {
    value.clamp(MIN_INBOX_LIMIT as i64, MAX_INBOX_LIMIT as i64) as u32
}

/// Fields a caller supplies when creating or editing a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub time: String,
    pub title: String,
    pub subtasks: Vec<String>,
}

impl TaskDraft {
    pub fn new(time: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            time: time.into(),
            title: title.into(),
            subtasks: Vec::new(),
        }
    }

    pub fn with_subtasks<I, S>(mut self, subtasks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subtasks = subtasks.into_iter().map(Into::into).collect();
        self
    }

    pub fn normalized(&self) -> Result<Self, String> {
        Ok(Self {
            time: normalize_hhmm(&self.time, "task.time")?,
            title: normalize_title(&self.title, "task.title")?,
            subtasks: normalize_subtasks(&self.subtasks),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutineDraft {
    pub time: String,
    pub title: String,
    pub days: Vec<u8>,
    pub subtasks: Vec<String>,
}

impl RoutineDraft {
    pub fn new(time: impl Into<String>, title: impl Into<String>, days: impl Into<Vec<u8>>) -> Self {
        Self {
            time: time.into(),
            title: title.into(),
            days: days.into(),
            subtasks: Vec::new(),
        }
    }

    pub fn with_subtasks<I, S>(mut self, subtasks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subtasks = subtasks.into_iter().map(Into::into).collect();
        self
    }

    pub fn normalized(&self) -> Result<Self, String> {
        Ok(Self {
            time: normalize_hhmm(&self.time, "routine.time")?,
            title: normalize_title(&self.title, "routine.title")?,
            days: normalize_days(&self.days, "routine.days")?,
            subtasks: normalize_subtasks(&self.subtasks),
        })
    }
}

pub fn normalize_title(value: &str, field_name: &str) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }
    Ok(trimmed.to_string())
}

/// Trims lines, drops blanks and the leading checkbox glyph some editors paste.
pub fn normalize_subtasks(subtasks: &[String]) -> Vec<String> {
    subtasks
        .iter()
        .map(|subtask| subtask.trim().trim_start_matches('▢').trim())
        .filter(|subtask| !subtask.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

/// Accepts `H:MM` or `HH:MM` and returns the zero-padded form, which sorts
/// chronologically as a plain string.
pub fn normalize_hhmm(value: &str, field_name: &str) -> Result<String, String> {
    let mut split = value.trim().split(':');
    let Some(hour_str) = split.next() else {
        return Err(format!("{field_name} must be HH:MM"));
    };
    let Some(minute_str) = split.next() else {
        return Err(format!("{field_name} must be HH:MM"));
    };
    if split.next().is_some() || minute_str.len() != 2 || hour_str.is_empty() || hour_str.len() > 2 {
        return Err(format!("{field_name} must be HH:MM"));
    }

    let hour = hour_str
        .parse::<u8>()
        .map_err(|_| format!("{field_name} must be HH:MM"))?;
    let minute = minute_str
        .parse::<u8>()
        .map_err(|_| format!("{field_name} must be HH:MM"))?;
    if hour > 23 || minute > 59 {
        return Err(format!("{field_name} must be HH:MM"));
    }
    Ok(format!("{hour:02}:{minute:02}"))
}

fn normalize_days(days: &[u8], field_name: &str) -> Result<Vec<u8>, String> {
    if let Some(invalid) = days.iter().find(|day| **day > 6) {
        return Err(format!("{field_name} contains invalid weekday {invalid}"));
    }
    let mut normalized = days.to_vec();
    normalized.sort_unstable();
    normalized.dedup();
    Ok(normalized)
}

pub fn validate_date(value: &str, field_name: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| format!("{field_name} must be YYYY-MM-DD"))
}
