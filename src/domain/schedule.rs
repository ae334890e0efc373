//! Resolves the displayable timeline for one date.
//!
//! Inputs are the master routines, the date's one-off tasks and the per-date
//! override/completion/subtask records. The output keeps yielded blocks and
//! flags them instead of dropping them, so a caller can still reveal the
//! losers of a time slot.

use crate::domain::completion::{checked_subtasks, is_listed, DateIdLists, SubtaskStates};
use crate::domain::dates::{date_key, weekday_index};
use crate::domain::ids::is_newer_id;
use crate::domain::models::{Routine, Task, TaskStatus};
use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "entity", rename_all = "snake_case")]
pub enum Block {
    Task(Task),
    RoutineInstance(Routine),
}

impl Block {
    pub fn id(&self) -> &str {
        match self {
            Self::Task(task) => &task.id,
            Self::RoutineInstance(routine) => &routine.id,
        }
    }

    pub fn time(&self) -> &str {
        match self {
            Self::Task(task) => &task.time,
            Self::RoutineInstance(routine) => &routine.time,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Task(task) => &task.title,
            Self::RoutineInstance(routine) => &routine.title,
        }
    }

    pub fn subtasks(&self) -> &[String] {
        match self {
            Self::Task(task) => &task.subtasks,
            Self::RoutineInstance(routine) => &routine.subtasks,
        }
    }

    pub fn is_routine(&self) -> bool {
        matches!(self, Self::RoutineInstance(_))
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ScheduledBlock {
    pub block: Block,
    /// Task status, or the routine's completion for this date.
    pub status: TaskStatus,
    pub yielded: bool,
    pub suggested: bool,
    pub checked_subtasks: Vec<usize>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DaySchedule {
    pub date: NaiveDate,
    pub blocks: Vec<ScheduledBlock>,
    /// Index in `blocks` before which the "now" marker sits. Only set for today.
    pub now_marker: Option<usize>,
    pub suggested_block_id: Option<String>,
}

impl DaySchedule {
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn winners(&self) -> impl Iterator<Item = &ScheduledBlock> {
        self.blocks.iter().filter(|scheduled| !scheduled.yielded)
    }
}

pub struct ScheduleInput<'a> {
    pub date: NaiveDate,
    pub tasks: &'a [Task],
    pub routines: &'a [Routine],
    pub overrides: &'a DateIdLists,
    pub completions: &'a DateIdLists,
    pub subtask_states: &'a SubtaskStates,
    /// Wall-clock time when `date` is today, `None` otherwise.
    pub now: Option<NaiveTime>,
}

pub fn resolve_day(input: &ScheduleInput<'_>) -> DaySchedule {
    let key = date_key(input.date);
    let weekday = weekday_index(input.date);

    let mut candidates = input
        .tasks
        .iter()
        .cloned()
        .map(Block::Task)
        .chain(
            input
                .routines
                .iter()
                .filter(|routine| routine.runs_on(weekday))
                .filter(|routine| !is_listed(input.overrides, &key, &routine.id))
                .cloned()
                .map(Block::RoutineInstance),
        )
        .collect::<Vec<_>>();
    // Vec::sort_by is stable: equal times keep tasks-then-routines order.
    candidates.sort_by(|left, right| left.time().cmp(right.time()));

    let mut blocks = candidates
        .into_iter()
        .map(|block| {
            let status = match &block {
                Block::Task(task) => task.status,
                Block::RoutineInstance(routine) if is_listed(input.completions, &key, &routine.id) => {
                    TaskStatus::Completed
                }
                Block::RoutineInstance(_) => TaskStatus::Pending,
            };
            let checked = checked_subtasks(input.subtask_states, block.id(), &key).to_vec();
            ScheduledBlock {
                block,
                status,
                yielded: false,
                suggested: false,
                checked_subtasks: checked,
            }
        })
        .collect::<Vec<_>>();

    mark_yielded(&mut blocks);

    let now_marker = match input.now {
        Some(now) if !blocks.is_empty() => {
            let now_key = now.format("%H:%M").to_string();
            Some(blocks.partition_point(|scheduled| scheduled.block.time() <= now_key.as_str()))
        }
        _ => None,
    };

    let has_active = blocks
        .iter()
        .any(|scheduled| scheduled.status == TaskStatus::Active);
    let suggested_index = match now_marker {
        Some(marker) if !has_active => suggest_focus(&blocks, marker),
        _ => None,
    };
    let suggested_block_id = suggested_index.map(|index| {
        blocks[index].suggested = true;
        blocks[index].block.id().to_string()
    });

    DaySchedule {
        date: input.date,
        blocks,
        now_marker,
        suggested_block_id,
    }
}

/// Within each group of equal times exactly one block stays prominent: an
/// active block, else the most recently created one.
fn mark_yielded(blocks: &mut [ScheduledBlock]) {
    let mut group_start = 0;
    while group_start < blocks.len() {
        let time = blocks[group_start].block.time().to_string();
        let group_end = blocks[group_start..]
            .iter()
            .position(|scheduled| scheduled.block.time() != time)
            .map_or(blocks.len(), |offset| group_start + offset);

        let mut winner = group_start;
        for index in group_start + 1..group_end {
            if outranks(&blocks[index], &blocks[winner]) {
                winner = index;
            }
        }
        for (index, scheduled) in blocks[group_start..group_end].iter_mut().enumerate() {
            scheduled.yielded = group_start + index != winner;
        }

        group_start = group_end;
    }
}

fn outranks(candidate: &ScheduledBlock, winner: &ScheduledBlock) -> bool {
    if candidate.status == TaskStatus::Active {
        return true;
    }
    if winner.status == TaskStatus::Active {
        return false;
    }
    is_newer_id(candidate.block.id(), winner.block.id())
}

/// Nearest unfinished slot winner at or before the marker, else the first
/// one after it.
fn suggest_focus(blocks: &[ScheduledBlock], marker: usize) -> Option<usize> {
    let eligible =
        |scheduled: &ScheduledBlock| !scheduled.yielded && scheduled.status != TaskStatus::Completed;

    (0..marker)
        .rev()
        .find(|index| eligible(&blocks[*index]))
        .or_else(|| (marker..blocks.len()).find(|index| eligible(&blocks[*index])))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dates::parse_date_key;
    use crate::domain::models::EntityKind;
    use proptest::prelude::*;

    // Monday
    const DATE: &str = "2026-10-19";

    fn date() -> NaiveDate {
        parse_date_key(DATE).expect("valid date")
    }

    fn task(id: &str, time: &str, status: TaskStatus) -> Task {
        Task {
            id: id.to_string(),
            time: time.to_string(),
            title: format!("task {id}"),
            subtasks: Vec::new(),
            status,
            kind: EntityKind::Task,
        }
    }

    fn routine(id: &str, time: &str, days: &[u8]) -> Routine {
        Routine {
            id: id.to_string(),
            time: time.to_string(),
            title: format!("routine {id}"),
            days: days.to_vec(),
            subtasks: Vec::new(),
            kind: EntityKind::Routine,
        }
    }

    fn at(hour: u32, minute: u32) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(hour, minute, 0)
    }

    struct Fixture {
        tasks: Vec<Task>,
        routines: Vec<Routine>,
        overrides: DateIdLists,
        completions: DateIdLists,
        subtask_states: SubtaskStates,
    }

    impl Fixture {
        fn new(tasks: Vec<Task>, routines: Vec<Routine>) -> Self {
            Self {
                tasks,
                routines,
                overrides: DateIdLists::new(),
                completions: DateIdLists::new(),
                subtask_states: SubtaskStates::new(),
            }
        }

        fn resolve(&self, now: Option<NaiveTime>) -> DaySchedule {
            resolve_day(&ScheduleInput {
                date: date(),
                tasks: &self.tasks,
                routines: &self.routines,
                overrides: &self.overrides,
                completions: &self.completions,
                subtask_states: &self.subtask_states,
                now,
            })
        }
    }

    fn ids(schedule: &DaySchedule) -> Vec<&str> {
        schedule.blocks.iter().map(|scheduled| scheduled.block.id()).collect()
    }

    #[test]
    fn empty_day_has_no_marker_or_suggestion() {
        let schedule = Fixture::new(Vec::new(), vec![routine("r_1", "07:00", &[0])]).resolve(at(9, 0));
        assert!(schedule.is_empty());
        assert_eq!(schedule.now_marker, None);
        assert_eq!(schedule.suggested_block_id, None);
    }

    #[test]
    fn routines_filtered_by_weekday_and_override() {
        let mut fixture = Fixture::new(
            vec![task("t_5", "10:00", TaskStatus::Pending)],
            vec![
                routine("r_1", "07:00", &[1, 2, 3, 4, 5]),
                routine("r_2", "08:00", &[0, 6]),
                routine("r_3", "09:00", &[1]),
            ],
        );
        fixture.overrides.insert(DATE.to_string(), vec!["r_3".to_string()]);

        let schedule = fixture.resolve(None);
        assert_eq!(ids(&schedule), vec!["r_1", "t_5"]);
        assert!(schedule.blocks[0].block.is_routine());
    }

    #[test]
    fn workout_and_standup_share_a_slot_with_one_winner() {
        let fixture = Fixture::new(
            vec![task("t_2000", "07:00", TaskStatus::Pending)],
            vec![routine("r_1000", "07:00", &[1, 2, 3, 4, 5])],
        );
        let schedule = fixture.resolve(None);

        assert_eq!(schedule.winners().count(), 1);
        let winner = schedule.winners().next().expect("winner");
        assert_eq!(winner.block.id(), "t_2000");
        assert!(schedule.blocks.iter().any(|scheduled| scheduled.yielded));
    }

    #[test]
    fn active_block_beats_newer_block() {
        let fixture = Fixture::new(
            vec![
                task("t_100", "07:00", TaskStatus::Active),
                task("t_300", "07:00", TaskStatus::Pending),
            ],
            vec![routine("r_200", "07:00", &[1])],
        );
        let schedule = fixture.resolve(None);
        let winners = schedule.winners().map(|scheduled| scheduled.block.id()).collect::<Vec<_>>();
        assert_eq!(winners, vec!["t_100"]);
    }

    #[test]
    fn newer_routine_beats_older_task() {
        let fixture = Fixture::new(
            vec![task("t_100", "07:00", TaskStatus::Pending)],
            vec![routine("r_200", "07:00", &[1])],
        );
        let schedule = fixture.resolve(None);
        let winner = schedule.winners().next().expect("winner");
        assert_eq!(winner.block.id(), "r_200");
    }

    #[test]
    fn multiple_active_tasks_do_not_break_single_winner() {
        let fixture = Fixture::new(
            vec![
                task("t_1", "07:00", TaskStatus::Active),
                task("t_2", "07:00", TaskStatus::Active),
            ],
            Vec::new(),
        );
        let schedule = fixture.resolve(at(8, 0));
        assert_eq!(schedule.winners().count(), 1);
        assert_eq!(schedule.suggested_block_id, None);
    }

    #[test]
    fn suggestion_scans_backward_from_now_first() {
        let fixture = Fixture::new(
            vec![
                task("t_1", "08:00", TaskStatus::Pending),
                task("t_2", "09:00", TaskStatus::Completed),
                task("t_3", "11:00", TaskStatus::Pending),
            ],
            Vec::new(),
        );
        let schedule = fixture.resolve(at(10, 0));
        assert_eq!(schedule.now_marker, Some(2));
        assert_eq!(schedule.suggested_block_id.as_deref(), Some("t_1"));
        assert!(schedule.blocks[0].suggested);
    }

    #[test]
    fn suggestion_falls_forward_when_everything_before_is_done() {
        let mut fixture = Fixture::new(
            vec![
                task("t_1", "08:00", TaskStatus::Completed),
                task("t_3", "11:00", TaskStatus::Pending),
            ],
            vec![routine("r_2", "09:00", &[1])],
        );
        fixture.completions.insert(DATE.to_string(), vec!["r_2".to_string()]);

        let schedule = fixture.resolve(at(10, 0));
        assert_eq!(schedule.blocks[1].status, TaskStatus::Completed);
        assert_eq!(schedule.suggested_block_id.as_deref(), Some("t_3"));
    }

    #[test]
    fn block_at_exactly_now_counts_as_before_the_marker() {
        let fixture = Fixture::new(
            vec![
                task("t_1", "10:00", TaskStatus::Pending),
                task("t_2", "10:30", TaskStatus::Pending),
            ],
            Vec::new(),
        );
        let schedule = fixture.resolve(at(10, 0));
        assert_eq!(schedule.now_marker, Some(1));
        assert_eq!(schedule.suggested_block_id.as_deref(), Some("t_1"));
    }

    #[test]
    fn suggestion_skips_yielded_blocks() {
        let fixture = Fixture::new(
            vec![
                task("t_1", "09:00", TaskStatus::Completed),
                task("t_2", "09:00", TaskStatus::Completed),
            ],
            vec![routine("r_0", "09:00", &[1])],
        );
        let schedule = fixture.resolve(at(12, 0));
        // r_0 is pending but yields to the newer t_2.
        assert_eq!(schedule.suggested_block_id, None);
    }

    #[test]
    fn no_suggestion_while_a_task_is_active_or_day_is_not_today() {
        let fixture = Fixture::new(
            vec![
                task("t_1", "08:00", TaskStatus::Pending),
                task("t_2", "09:00", TaskStatus::Active),
            ],
            Vec::new(),
        );
        assert_eq!(fixture.resolve(at(10, 0)).suggested_block_id, None);

        let idle = Fixture::new(vec![task("t_1", "08:00", TaskStatus::Pending)], Vec::new());
        let schedule = idle.resolve(None);
        assert_eq!(schedule.now_marker, None);
        assert_eq!(schedule.suggested_block_id, None);
    }

    #[test]
    fn checked_subtasks_are_attached_per_block() {
        let mut fixture = Fixture::new(vec![task("t_1", "08:00", TaskStatus::Pending)], Vec::new());
        fixture
            .subtask_states
            .insert(format!("{DATE}_t_1"), vec![0, 2]);
        let schedule = fixture.resolve(None);
        assert_eq!(schedule.blocks[0].checked_subtasks, vec![0, 2]);
    }

    fn arbitrary_time() -> impl Strategy<Value = String> {
        (6u8..9, prop_oneof![Just(0u8), Just(30u8)]).prop_map(|(hour, minute)| format!("{hour:02}:{minute:02}"))
    }

    proptest! {
        #[test]
        fn output_is_sorted_with_one_winner_per_time(
            task_specs in proptest::collection::vec((arbitrary_time(), 0u8..3), 0..12),
            routine_specs in proptest::collection::vec((arbitrary_time(), proptest::collection::vec(0u8..7, 0..7)), 0..8),
            now_minutes in proptest::option::of(0u32..(24 * 60))
        ) {
            let tasks = task_specs
                .iter()
                .enumerate()
                .map(|(index, (time, status))| {
                    let status = match status {
                        0 => TaskStatus::Pending,
                        1 => TaskStatus::Active,
                        _ => TaskStatus::Completed,
                    };
                    task(&format!("t_{}", 1_000 + index * 7), time, status)
                })
                .collect::<Vec<_>>();
            let routines = routine_specs
                .iter()
                .enumerate()
                .map(|(index, (time, days))| routine(&format!("r_{}", 1_003 + index * 5), time, days))
                .collect::<Vec<_>>();
            let fixture = Fixture::new(tasks, routines);
            let schedule = fixture.resolve(now_minutes.and_then(|minutes| at(minutes / 60, minutes % 60)));

            for pair in schedule.blocks.windows(2) {
                prop_assert!(pair[0].block.time() <= pair[1].block.time());
            }

            let mut times = schedule
                .blocks
                .iter()
                .map(|scheduled| scheduled.block.time().to_string())
                .collect::<Vec<_>>();
            times.dedup();
            for time in times {
                let winners = schedule
                    .blocks
                    .iter()
                    .filter(|scheduled| scheduled.block.time() == time && !scheduled.yielded)
                    .count();
                prop_assert_eq!(winners, 1);
            }

            if let Some(suggested) = &schedule.suggested_block_id {
                let block = schedule
                    .blocks
                    .iter()
                    .find(|scheduled| scheduled.block.id() == suggested)
                    .expect("suggested block present");
                prop_assert!(!block.yielded);
                prop_assert!(block.status != TaskStatus::Completed);
            }
        }
    }
}
