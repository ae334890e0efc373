use crate::application::state::AppState;
use crate::domain::dates::{date_key, date_strip as build_date_strip, parse_date_key, DateStripEntry};
use crate::domain::models::InboxItem;
use crate::domain::schedule::{resolve_day, DaySchedule, ScheduleInput};
use crate::infrastructure::error::InfraError;
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct InboxPreview {
    pub visible: Vec<InboxItem>,
    pub hidden_count: usize,
    pub len: usize,
    pub limit: u32,
}

impl InboxPreview {
    pub fn is_full(&self) -> bool {
        self.len >= self.limit as usize
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TimelineView {
    pub date_key: String,
    pub is_today: bool,
    pub schedule: DaySchedule,
    pub inbox: InboxPreview,
}

/// Resolves the active date. Read-only, so a periodic tick can call it freely.
pub fn timeline(state: &AppState) -> Result<TimelineView, InfraError> {
    let local_now = state.local_now();
    let runtime = state.lock_runtime()?;
    let is_today = runtime.current_date == local_now.date();

    let schedule = resolve_day(&ScheduleInput {
        date: runtime.current_date,
        tasks: &runtime.tasks,
        routines: &runtime.routines,
        overrides: &runtime.overrides,
        completions: &runtime.completions,
        subtask_states: &runtime.subtask_states,
        now: is_today.then(|| local_now.time()),
    });

    let visible_limit = state.config().inbox_visible_limit;
    let inbox = InboxPreview {
        visible: runtime.inbox.iter().take(visible_limit).cloned().collect(),
        hidden_count: runtime.inbox.len().saturating_sub(visible_limit),
        len: runtime.inbox.len(),
        limit: runtime.inbox_limit,
    };

    Ok(TimelineView {
        date_key: date_key(runtime.current_date),
        is_today,
        schedule,
        inbox,
    })
}

/// Switches the active date and loads its tasks. Returns `false` when the
/// date is already active.
pub fn change_date(state: &AppState, date: &str) -> Result<bool, InfraError> {
    let Some(date) = parse_date_key(date) else {
        return Err(InfraError::InvalidInput(format!("date must be YYYY-MM-DD: {date}")));
    };
    if state.current_date()? == date {
        return Ok(false);
    }

    let loaded = state.load_runtime(date);
    *state.lock_runtime()? = loaded;

    state.log_info("change_date", &format!("date={}", date_key(date)));
    Ok(true)
}

pub fn date_strip(state: &AppState) -> Result<Vec<DateStripEntry>, InfraError> {
    let strip = &state.config().date_strip;
    Ok(build_date_strip(
        state.today(),
        state.current_date()?,
        strip.days_before,
        strip.days_after,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::mutations::{add_inbox_item, add_routine, add_task, toggle_task};
    use crate::application::state::test_support::*;
    use crate::domain::models::{RoutineDraft, TaskDraft, TaskStatus};

    #[test]
    fn timeline_marks_now_and_suggests_on_today() {
        let (state, clock) = in_memory_state();
        add_task(&state, TaskDraft::new("09:00", "Email")).expect("add");
        clock.advance_minutes(1);
        add_task(&state, TaskDraft::new("11:00", "Lunch prep")).expect("add");

        let view = timeline(&state).expect("timeline");
        assert!(view.is_today);
        assert_eq!(view.date_key, "2026-10-17");
        assert_eq!(view.schedule.now_marker, Some(1));
        assert_eq!(
            view.schedule.suggested_block_id.as_deref(),
            Some(view.schedule.blocks[0].block.id())
        );
    }

    #[test]
    fn workout_routine_and_standup_task_yield_one_winner() {
        let (state, clock) = in_memory_state();
        add_routine(&state, RoutineDraft::new("07:00", "Workout", vec![1, 2, 3, 4, 5])).expect("routine");
        clock.advance_minutes(1);
        let standup = add_task(&state, TaskDraft::new("07:00", "Standup")).expect("task");
        change_date(&state, "2026-10-19").expect("monday");
        // Tasks are per date, so add the standup on Monday as well.
        let monday_standup = add_task(&state, TaskDraft::new("07:00", "Standup")).expect("task");

        let view = timeline(&state).expect("timeline");
        assert!(!view.is_today);
        assert_eq!(view.schedule.now_marker, None);
        let winners = view.schedule.winners().map(|block| block.block.id()).collect::<Vec<_>>();
        assert_eq!(winners, vec![monday_standup.as_str()]);
        assert_ne!(standup, monday_standup);

        toggle_task(&state, &monday_standup).expect("activate");
        let view = timeline(&state).expect("timeline");
        let winner = view.schedule.winners().next().expect("winner");
        assert_eq!(winner.status, TaskStatus::Active);
    }

    #[test]
    fn inbox_preview_shows_first_items_and_hidden_count() {
        let (state, clock) = in_memory_state();
        for title in ["a", "b", "c", "d", "e"] {
            add_inbox_item(&state, title, &[]).expect("add");
            clock.advance_minutes(1);
        }
        let preview = timeline(&state).expect("timeline").inbox;
        let titles = preview.visible.iter().map(|item| item.title.as_str()).collect::<Vec<_>>();
        assert_eq!(titles, vec!["a", "b", "c"]);
        assert_eq!(preview.hidden_count, 2);
        assert_eq!(preview.len, 5);
        assert!(!preview.is_full());
    }

    #[test]
    fn change_date_reloads_tasks_for_that_date() {
        let (state, _clock) = in_memory_state();
        add_task(&state, TaskDraft::new("09:00", "Today only")).expect("add");

        assert!(change_date(&state, "2026-10-18").expect("change"));
        assert!(state.tasks().expect("tasks").is_empty());
        assert!(!change_date(&state, "2026-10-18").expect("same date"));
        assert!(change_date(&state, "2026/10/18").is_err());

        change_date(&state, "2026-10-17").expect("back");
        assert_eq!(state.tasks().expect("tasks").len(), 1);
    }

    #[test]
    fn date_strip_spans_configured_window() {
        let (state, _clock) = in_memory_state();
        change_date(&state, "2026-10-18").expect("change");
        let strip = date_strip(&state).expect("strip");

        assert_eq!(strip.len(), 7);
        assert_eq!(strip[0].key, "2026-10-16");
        assert!(strip[1].is_today);
        assert!(strip[2].is_active);
        assert_eq!(strip[1].day_letter, 'S');
        assert_eq!(strip[6].key, "2026-10-22");
    }
}
