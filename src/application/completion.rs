use crate::application::state::AppState;
use crate::domain::completion::{add_listed, checked_subtasks, toggle_subtask as toggle_subtask_entry};
use crate::domain::dates::date_key;
use crate::domain::keys::{ROUTINE_COMPLETIONS, SUBTASK_STATES};
use crate::domain::models::{validate_date, TaskStatus};
use crate::infrastructure::error::InfraError;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubtaskToggle {
    pub checked: bool,
    pub checked_count: usize,
    /// Status of the parent after the parent rules ran.
    pub parent_status: TaskStatus,
}

/// Flips one subtask for `(date, block)` and returns the checked count.
pub fn toggle_subtask(state: &AppState, block_id: &str, index: usize, date: &str) -> Result<usize, InfraError> {
    let date = validate_date(date, "date").map_err(InfraError::InvalidInput)?;
    let key = date_key(date);

    let mut runtime = state.lock_runtime()?;
    let count = toggle_subtask_entry(&mut runtime.subtask_states, block_id, index, &key);
    state.write_json(SUBTASK_STATES, &runtime.subtask_states);
    drop(runtime);

    state.log_info(
        "toggle_subtask",
        &format!("block_id={block_id} index={index} date={key} checked_count={count}"),
    );
    Ok(count)
}

/// Subtask toggle on the active date with parent rules: checking the last
/// subtask completes the parent, unchecking one of a completed task reopens it.
/// `None` when no task or routine has the id.
pub fn toggle_subtask_for_block(
    state: &AppState,
    block_id: &str,
    index: usize,
) -> Result<Option<SubtaskToggle>, InfraError> {
    let mut runtime = state.lock_runtime()?;
    let key = date_key(runtime.current_date);

    let task_position = runtime.tasks.iter().position(|task| task.id == block_id);
    let subtask_total = match task_position {
        Some(position) => runtime.tasks[position].subtasks.len(),
        None => match runtime.routines.iter().find(|routine| routine.id == block_id) {
            Some(routine) => routine.subtasks.len(),
            None => return Ok(None),
        },
    };
    if index >= subtask_total {
        return Err(InfraError::InvalidInput(format!(
            "subtask index {index} out of range for block_id={block_id}"
        )));
    }

    let checked_count = toggle_subtask_entry(&mut runtime.subtask_states, block_id, index, &key);
    let checked = checked_subtasks(&runtime.subtask_states, block_id, &key).contains(&index);
    state.write_json(SUBTASK_STATES, &runtime.subtask_states);
    let all_checked = checked_count == subtask_total;

    let parent_status = match task_position {
        Some(position) => {
            let task = &mut runtime.tasks[position];
            if checked && all_checked {
                task.status = TaskStatus::Completed;
            } else if !checked && task.status == TaskStatus::Completed {
                task.status = TaskStatus::Pending;
            }
            let status = task.status;
            state.persist_tasks(&runtime);
            status
        }
        None => {
            if checked && all_checked && add_listed(&mut runtime.completions, block_id, &key) {
                state.write_json(ROUTINE_COMPLETIONS, &runtime.completions);
            }
            let completed = runtime
                .completions
                .get(&key)
                .is_some_and(|ids| ids.iter().any(|id| id == block_id));
            if completed {
                TaskStatus::Completed
            } else {
                TaskStatus::Pending
            }
        }
    };
    drop(runtime);

    state.log_info(
        "toggle_subtask_for_block",
        &format!(
            "block_id={block_id} index={index} date={key} checked={checked} status={}",
            parent_status.as_str()
        ),
    );
    Ok(Some(SubtaskToggle {
        checked,
        checked_count,
        parent_status,
    }))
}
