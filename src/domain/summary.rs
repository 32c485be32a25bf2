//! Aggregate figures over one owner's tasks.
//!
//! Percentages and hour totals are accumulated unrounded and rounded to two
//! decimals once, at the end.

use chrono::{DateTime, Utc};

use super::task::{Priority, Task, TaskStatus, raw_hours_between, round_to_hundredths};

/// Overall completion figures plus the pending-work breakdown.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSummary {
    pub total_tasks: u64,
    /// Share of finished tasks, in percent.
    pub completed_percentage: f64,
    /// Share of pending tasks, in percent.
    pub pending_percentage: f64,
    /// Mean elapsed hours over finished tasks.
    pub average_time: f64,
    pub pending: PendingSummary,
}

/// Time accounting for tasks that are still pending.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSummary {
    pub pending_tasks: u64,
    /// Hours already spent since each task started.
    pub total_time_lapsed: f64,
    /// Hours left until each task's end time.
    pub total_time_to_finish: f64,
    /// One row per priority, lowest first; rows are present even when empty.
    pub priority_summary: Vec<PrioritySummary>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrioritySummary {
    pub priority: Priority,
    pub pending_tasks: u64,
    pub time_lapsed: f64,
    pub time_to_finish: f64,
}

#[derive(Debug, Clone, Copy, Default)]
struct PendingAccumulator {
    count: u64,
    lapsed: f64,
    to_finish: f64,
}

impl PendingAccumulator {
    fn add(&mut self, task: &Task, now: DateTime<Utc>) {
        self.count += 1;
        self.lapsed += raw_hours_between(task.start_time, now).max(0.0);
        self.to_finish += raw_hours_between(now, task.end_time).max(0.0);
    }
}

impl TaskSummary {
    /// Computes the summary of `tasks` as seen at instant `now`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn compute(tasks: &[Task], now: DateTime<Utc>) -> Self {
        let total_tasks = tasks.len() as u64;

        let mut finished_count: u64 = 0;
        let mut finished_hours = 0.0;
        let mut pending_total = PendingAccumulator::default();
        let mut by_priority = [PendingAccumulator::default(); Priority::MAX as usize];

        for task in tasks {
            match task.status {
                TaskStatus::Finished => {
                    finished_count += 1;
                    finished_hours += raw_hours_between(task.start_time, task.end_time);
                }
                TaskStatus::Pending => {
                    pending_total.add(task, now);
                    by_priority[usize::from(task.priority.value() - Priority::MIN)].add(task, now);
                }
            }
        }

        let percentage = |count: u64| {
            if total_tasks == 0 {
                0.0
            } else {
                round_to_hundredths(count as f64 * 100.0 / total_tasks as f64)
            }
        };

        let average_time = if finished_count == 0 {
            0.0
        } else {
            round_to_hundredths(finished_hours / finished_count as f64)
        };

        let priority_summary = Priority::all()
            .zip(by_priority)
            .map(|(priority, accumulator)| PrioritySummary {
                priority,
                pending_tasks: accumulator.count,
                time_lapsed: round_to_hundredths(accumulator.lapsed),
                time_to_finish: round_to_hundredths(accumulator.to_finish),
            })
            .collect();

        Self {
            total_tasks,
            completed_percentage: percentage(finished_count),
            pending_percentage: percentage(pending_total.count),
            average_time,
            pending: PendingSummary {
                pending_tasks: pending_total.count,
                total_time_lapsed: round_to_hundredths(pending_total.lapsed),
                total_time_to_finish: round_to_hundredths(pending_total.to_finish),
                priority_summary,
            },
        }
    }
}
