//! Domain models for task tracking.
//!
//! This module contains the task entity, its value objects and the
//! aggregate summary computed over an owner's tasks.

pub mod summary;
pub mod task;

pub use summary::{PendingSummary, PrioritySummary, TaskSummary};
pub use task::{
    InvalidPriority, InvalidStatus, InvalidTaskId, InvalidTimestamp, MILLISECONDS_PER_HOUR,
    Priority, Task, TaskChanges, TaskId, TaskStatus, UserId, format_hours, hours_between,
    parse_timestamp, raw_hours_between, round_to_hundredths,
};
