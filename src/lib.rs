pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::bootstrap::{bootstrap_workspace, Workspace};
pub use application::completion::{toggle_subtask, toggle_subtask_for_block, SubtaskToggle};
pub use application::garbage_collector::{collect_garbage, GarbageCollectionReport};
pub use application::mutations::{
    add_inbox_item, add_routine, add_task, delete_inbox_item, delete_routine, delete_task,
    has_routine_overlap, move_task_to_inbox, push_task_to_tomorrow, schedule_inbox_item,
    skip_routine_for_date, toggle_routine_completion, toggle_task, update_routine, update_task,
    MoveToInboxOutcome,
};
pub use application::settings::{factory_reset, toggle_sound, update_inbox_limit};
pub use application::state::{AppState, NowProvider};
pub use application::sync::{export_data, export_to_file, import_data, import_from_file, ImportSummary};
pub use application::timeline::{change_date, date_strip, timeline, InboxPreview, TimelineView};
pub use domain::dates::{format_display_time, routine_days_label, DateStripEntry};
pub use domain::models::{InboxItem, Routine, RoutineDraft, Settings, Task, TaskDraft, TaskStatus};
pub use domain::schedule::{Block, DaySchedule, ScheduledBlock};
pub use infrastructure::config::AppConfig;
pub use infrastructure::error::InfraError;
