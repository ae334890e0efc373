use crate::application::state::{AppState, RuntimeState};
use crate::domain::completion::{add_listed, toggle_routine_completion as toggle_completion_entry};
use crate::domain::dates::date_key;
use crate::domain::keys::{tasks_key, ROUTINE_COMPLETIONS, ROUTINE_OVERRIDES};
use crate::domain::merge::sort_by_time;
use crate::domain::models::{
    normalize_hhmm, normalize_subtasks, normalize_title, validate_date, EntityKind, InboxItem, Routine,
    RoutineDraft, Task, TaskDraft, TaskStatus,
};
use crate::infrastructure::error::InfraError;
use chrono::Duration;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MoveToInboxOutcome {
    Moved { inbox_id: String },
    InboxFull,
    NotFound,
}

fn sort_tasks(tasks: &mut [Task]) {
    tasks.sort_by(|left, right| left.time.cmp(&right.time));
}

fn sort_routines(routines: &mut [Routine]) {
    routines.sort_by(|left, right| left.time.cmp(&right.time));
}

fn record_tombstone(state: &AppState, runtime: &mut RuntimeState, id: &str) {
    if runtime.track_deleted_id(id) {
        state.persist_deleted_ids(runtime);
    }
}

pub fn add_task(state: &AppState, draft: TaskDraft) -> Result<String, InfraError> {
    let draft = draft.normalized().map_err(InfraError::InvalidInput)?;

    let mut runtime = state.lock_runtime()?;
    let id = state.next_entity_id(&mut runtime, EntityKind::Task);
    runtime.tasks.push(Task {
        id: id.clone(),
        time: draft.time,
        title: draft.title,
        subtasks: draft.subtasks,
        status: TaskStatus::Pending,
        kind: EntityKind::Task,
    });
    sort_tasks(&mut runtime.tasks);
    state.persist_tasks(&runtime);
    drop(runtime);

    state.log_info("add_task", &format!("created task_id={id}"));
    Ok(id)
}

/// Returns `false` for an unknown id.
pub fn update_task(state: &AppState, task_id: &str, draft: TaskDraft) -> Result<bool, InfraError> {
    let draft = draft.normalized().map_err(InfraError::InvalidInput)?;

    let mut runtime = state.lock_runtime()?;
    let Some(task) = runtime.tasks.iter_mut().find(|task| task.id == task_id) else {
        return Ok(false);
    };
    task.time = draft.time;
    task.title = draft.title;
    task.subtasks = draft.subtasks;
    sort_tasks(&mut runtime.tasks);
    state.persist_tasks(&runtime);
    drop(runtime);

    state.log_info("update_task", &format!("updated task_id={task_id}"));
    Ok(true)
}

/// Tombstones the id even when no task with it exists.
pub fn delete_task(state: &AppState, task_id: &str) -> Result<bool, InfraError> {
    let mut runtime = state.lock_runtime()?;
    let before = runtime.tasks.len();
    runtime.tasks.retain(|task| task.id != task_id);
    let removed = runtime.tasks.len() != before;
    if removed {
        state.persist_tasks(&runtime);
    }
    record_tombstone(state, &mut runtime, task_id);
    drop(runtime);

    state.log_info("delete_task", &format!("deleted task_id={task_id} removed={removed}"));
    Ok(removed)
}

/// Advances pending -> active -> completed -> pending. Entering `active`
/// resets every other active task of the date.
pub fn toggle_task(state: &AppState, task_id: &str) -> Result<Option<TaskStatus>, InfraError> {
    let mut runtime = state.lock_runtime()?;
    let Some(current) = runtime
        .tasks
        .iter()
        .find(|task| task.id == task_id)
        .map(|task| task.status)
    else {
        return Ok(None);
    };

    let next = current.next();
    for task in &mut runtime.tasks {
        if task.id == task_id {
            task.status = next;
        } else if next == TaskStatus::Active && task.status == TaskStatus::Active {
            task.status = TaskStatus::Pending;
        }
    }
    state.persist_tasks(&runtime);
    drop(runtime);

    state.log_info("toggle_task", &format!("task_id={task_id} status={}", next.as_str()));
    Ok(Some(next))
}

/// Moves the task, id unchanged, to the next day's list. The next day's record
/// is extended as raw JSON; when it exists but cannot be read nothing moves.
pub fn push_task_to_tomorrow(state: &AppState, task_id: &str) -> Result<bool, InfraError> {
    let mut runtime = state.lock_runtime()?;
    let Some(position) = runtime.tasks.iter().position(|task| task.id == task_id) else {
        return Ok(false);
    };

    let tomorrow = runtime.current_date + Duration::days(1);
    let tomorrow_key = tasks_key(tomorrow);
    let mut tomorrow_tasks = match state.try_read_json::<Vec<Value>>(&tomorrow_key) {
        Ok(items) => items.unwrap_or_default(),
        Err(error) => {
            drop(runtime);
            state.log_error(
                "push_task_to_tomorrow",
                &format!("task_id={task_id} kept, key={tomorrow_key} unreadable: {error}"),
            );
            return Ok(false);
        }
    };
    tomorrow_tasks.push(serde_json::to_value(&runtime.tasks[position])?);
    sort_by_time(&mut tomorrow_tasks);
    runtime.tasks.remove(position);

    state.write_json(&tomorrow_key, &tomorrow_tasks);
    state.persist_tasks(&runtime);
    drop(runtime);

    state.log_info(
        "push_task_to_tomorrow",
        &format!("task_id={task_id} date={}", date_key(tomorrow)),
    );
    Ok(true)
}

/// Capacity is checked before the task is touched.
pub fn move_task_to_inbox(state: &AppState, task_id: &str) -> Result<MoveToInboxOutcome, InfraError> {
    let mut runtime = state.lock_runtime()?;
    let Some(position) = runtime.tasks.iter().position(|task| task.id == task_id) else {
        return Ok(MoveToInboxOutcome::NotFound);
    };
    if runtime.inbox.len() >= runtime.inbox_limit as usize {
        drop(runtime);
        state.log_info("move_task_to_inbox", &format!("inbox full, task_id={task_id} kept"));
        return Ok(MoveToInboxOutcome::InboxFull);
    }

    let task = runtime.tasks.remove(position);
    let inbox_id = state.next_entity_id(&mut runtime, EntityKind::Inbox);
    runtime.inbox.push(InboxItem {
        id: inbox_id.clone(),
        title: task.title,
        subtasks: task.subtasks,
        kind: EntityKind::Inbox,
    });
    state.persist_tasks(&runtime);
    state.persist_inbox(&runtime);
    record_tombstone(state, &mut runtime, task_id);
    drop(runtime);

    state.log_info("move_task_to_inbox", &format!("task_id={task_id} inbox_id={inbox_id}"));
    Ok(MoveToInboxOutcome::Moved { inbox_id })
}

pub fn add_routine(state: &AppState, draft: RoutineDraft) -> Result<String, InfraError> {
    let draft = draft.normalized().map_err(InfraError::InvalidInput)?;

    let mut runtime = state.lock_runtime()?;
    let id = state.next_entity_id(&mut runtime, EntityKind::Routine);
    runtime.routines.push(Routine {
        id: id.clone(),
        time: draft.time,
        title: draft.title,
        days: draft.days,
        subtasks: draft.subtasks,
        kind: EntityKind::Routine,
    });
    sort_routines(&mut runtime.routines);
    state.persist_routines(&runtime);
    drop(runtime);

    state.log_info("add_routine", &format!("created routine_id={id}"));
    Ok(id)
}

/// Overlap with other routines is not re-checked here.
pub fn update_routine(state: &AppState, routine_id: &str, draft: RoutineDraft) -> Result<bool, InfraError> {
    let draft = draft.normalized().map_err(InfraError::InvalidInput)?;

    let mut runtime = state.lock_runtime()?;
    let Some(routine) = runtime.routines.iter_mut().find(|routine| routine.id == routine_id) else {
        return Ok(false);
    };
    routine.time = draft.time;
    routine.title = draft.title;
    routine.days = draft.days;
    routine.subtasks = draft.subtasks;
    sort_routines(&mut runtime.routines);
    state.persist_routines(&runtime);
    drop(runtime);

    state.log_info("update_routine", &format!("updated routine_id={routine_id}"));
    Ok(true)
}

pub fn delete_routine(state: &AppState, routine_id: &str) -> Result<bool, InfraError> {
    let mut runtime = state.lock_runtime()?;
    let before = runtime.routines.len();
    runtime.routines.retain(|routine| routine.id != routine_id);
    let removed = runtime.routines.len() != before;
    if removed {
        state.persist_routines(&runtime);
    }
    record_tombstone(state, &mut runtime, routine_id);
    drop(runtime);

    state.log_info(
        "delete_routine",
        &format!("deleted routine_id={routine_id} removed={removed}"),
    );
    Ok(removed)
}

/// Returns whether the routine counts as done on `date` afterwards.
pub fn toggle_routine_completion(state: &AppState, routine_id: &str, date: &str) -> Result<bool, InfraError> {
    let date = validate_date(date, "date").map_err(InfraError::InvalidInput)?;
    let key = date_key(date);

    let mut runtime = state.lock_runtime()?;
    let completed = toggle_completion_entry(&mut runtime.completions, routine_id, &key);
    state.write_json(ROUTINE_COMPLETIONS, &runtime.completions);
    drop(runtime);

    state.log_info(
        "toggle_routine_completion",
        &format!("routine_id={routine_id} date={key} completed={completed}"),
    );
    Ok(completed)
}

/// Hides one instance of a routine. Repeating the call changes nothing.
pub fn skip_routine_for_date(state: &AppState, routine_id: &str, date: &str) -> Result<bool, InfraError> {
    let date = validate_date(date, "date").map_err(InfraError::InvalidInput)?;
    let key = date_key(date);

    let mut runtime = state.lock_runtime()?;
    let added = add_listed(&mut runtime.overrides, routine_id, &key);
    if added {
        state.write_json(ROUTINE_OVERRIDES, &runtime.overrides);
    }
    drop(runtime);

    state.log_info(
        "skip_routine_for_date",
        &format!("routine_id={routine_id} date={key} added={added}"),
    );
    Ok(added)
}

/// True when an existing routine has the same time and shares a weekday.
pub fn has_routine_overlap(state: &AppState, time: &str, days: &[u8]) -> Result<bool, InfraError> {
    let time = normalize_hhmm(time, "time").unwrap_or_else(|_| time.trim().to_string());
    let runtime = state.lock_runtime()?;
    Ok(runtime
        .routines
        .iter()
        .any(|routine| routine.time == time && days.iter().any(|day| routine.runs_on(*day))))
}

/// `None` when the inbox is already at its limit.
pub fn add_inbox_item(state: &AppState, title: &str, subtasks: &[String]) -> Result<Option<String>, InfraError> {
    let title = normalize_title(title, "inbox.title").map_err(InfraError::InvalidInput)?;
    let subtasks = normalize_subtasks(subtasks);

    let mut runtime = state.lock_runtime()?;
    if runtime.inbox.len() >= runtime.inbox_limit as usize {
        let limit = runtime.inbox_limit;
        drop(runtime);
        state.log_info("add_inbox_item", &format!("inbox full at limit={limit}"));
        return Ok(None);
    }

    let id = state.next_entity_id(&mut runtime, EntityKind::Inbox);
    runtime.inbox.push(InboxItem {
        id: id.clone(),
        title,
        subtasks,
        kind: EntityKind::Inbox,
    });
    state.persist_inbox(&runtime);
    drop(runtime);

    state.log_info("add_inbox_item", &format!("created inbox_id={id}"));
    Ok(Some(id))
}

pub fn delete_inbox_item(state: &AppState, inbox_id: &str) -> Result<bool, InfraError> {
    let mut runtime = state.lock_runtime()?;
    let before = runtime.inbox.len();
    runtime.inbox.retain(|item| item.id != inbox_id);
    let removed = runtime.inbox.len() != before;
    if removed {
        state.persist_inbox(&runtime);
    }
    record_tombstone(state, &mut runtime, inbox_id);
    drop(runtime);

    state.log_info(
        "delete_inbox_item",
        &format!("deleted inbox_id={inbox_id} removed={removed}"),
    );
    Ok(removed)
}

/// Turns an inbox item into a task on the active date. Returns the new task id.
pub fn schedule_inbox_item(state: &AppState, inbox_id: &str, time: &str) -> Result<Option<String>, InfraError> {
    let time = normalize_hhmm(time, "task.time").map_err(InfraError::InvalidInput)?;

    let mut runtime = state.lock_runtime()?;
    let Some(position) = runtime.inbox.iter().position(|item| item.id == inbox_id) else {
        return Ok(None);
    };
    let item = runtime.inbox.remove(position);

    let task_id = state.next_entity_id(&mut runtime, EntityKind::Task);
    runtime.tasks.push(Task {
        id: task_id.clone(),
        time,
        title: item.title,
        subtasks: item.subtasks,
        status: TaskStatus::Pending,
        kind: EntityKind::Task,
    });
    sort_tasks(&mut runtime.tasks);
    state.persist_tasks(&runtime);
    state.persist_inbox(&runtime);
    record_tombstone(state, &mut runtime, inbox_id);
    drop(runtime);

    state.log_info(
        "schedule_inbox_item",
        &format!("inbox_id={inbox_id} task_id={task_id}"),
    );
    Ok(Some(task_id))
}
