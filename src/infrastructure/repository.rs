//! Task store abstraction.
//!
//! This module defines the persistence contract the task service consumes:
//! `insert`, `find_many`, `count`, `find_one_and_update` and
//! `find_one_and_delete`, all driven by a [`TaskFilter`]. Every operation is
//! atomic at the granularity of a single record.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use futures::future::BoxFuture;
use thiserror::Error;

use crate::domain::{Priority, Task, TaskChanges, TaskId, TaskStatus, UserId};

/// Deferred store operation.
///
/// Nothing runs until the future is awaited; the future only borrows the
/// store itself, never the arguments.
pub type StoreFuture<'a, T> = BoxFuture<'a, Result<T, RepositoryError>>;

// =============================================================================
// Repository Error
// =============================================================================

/// Errors that can occur during store operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// A record with the same identifier already exists.
    #[error("Duplicate task identifier: {0}")]
    DuplicateKey(TaskId),

    /// Database connection or query error.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// A stored row could not be mapped back to a task.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

// =============================================================================
// Filter
// =============================================================================

/// Exact-match criteria for store queries.
///
/// Every `Some` field must match; `None` fields are unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub owner_id: Option<UserId>,
    pub task_id: Option<TaskId>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
}

impl TaskFilter {
    /// Returns true if `task` satisfies every constraint.
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        self.owner_id
            .as_ref()
            .is_none_or(|owner_id| *owner_id == task.owner_id)
            && self.task_id.is_none_or(|task_id| task_id == task.task_id)
            && self.status.is_none_or(|status| status == task.status)
            && self.priority.is_none_or(|priority| priority == task.priority)
    }
}

// =============================================================================
// Sorting
// =============================================================================

/// Fields a task listing can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    Title,
    #[default]
    Priority,
    Status,
    StartTime,
    EndTime,
}

impl SortField {
    /// Wire name of the field.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Priority => "priority",
            Self::Status => "status",
            Self::StartTime => "startTime",
            Self::EndTime => "endTime",
        }
    }
}

impl FromStr for SortField {
    type Err = InvalidSort;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "title" => Ok(Self::Title),
            "priority" => Ok(Self::Priority),
            "status" => Ok(Self::Status),
            "startTime" | "start_time" => Ok(Self::StartTime),
            "endTime" | "end_time" => Ok(Self::EndTime),
            _ => Err(InvalidSort::Field(value.to_string())),
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl FromStr for SortDirection {
    type Err = InvalidSort;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "asc" | "ascending" => Ok(Self::Ascending),
            "desc" | "descending" => Ok(Self::Descending),
            _ => Err(InvalidSort::Direction(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidSort {
    #[error("sortBy must be one of title, priority, status, startTime, endTime")]
    Field(String),
    #[error("sortOrder must be either 'asc' or 'desc'")]
    Direction(String),
}

/// Ordering for a listing: one key plus a direction.
///
/// Ties are always broken by ascending task identifier, regardless of
/// direction, so that consecutive pages never overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskSort {
    pub field: SortField,
    pub direction: SortDirection,
}

impl TaskSort {
    #[must_use]
    pub const fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    /// Compares two tasks under this ordering.
    #[must_use]
    pub fn compare(&self, left: &Task, right: &Task) -> Ordering {
        let ordering = match self.field {
            SortField::Title => left.title.cmp(&right.title),
            SortField::Priority => left.priority.cmp(&right.priority),
            SortField::Status => left.status.as_str().cmp(right.status.as_str()),
            SortField::StartTime => left.start_time.cmp(&right.start_time),
            SortField::EndTime => left.end_time.cmp(&right.end_time),
        };

        let ordering = match self.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        };

        ordering.then_with(|| left.task_id.cmp(&right.task_id))
    }
}

// =============================================================================
// Pagination
// =============================================================================

/// 1-indexed pagination parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Page number, starting at 1.
    pub page: u32,
    /// Number of items per page.
    pub limit: u32,
}

impl Pagination {
    /// Creates pagination parameters, or `None` when either value is zero.
    #[must_use]
    pub const fn new(page: u32, limit: u32) -> Option<Self> {
        if page == 0 || limit == 0 {
            None
        } else {
            Some(Self { page, limit })
        }
    }

    /// Number of records preceding this page.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.limit as u64
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self { page: 1, limit: 10 }
    }
}

/// One page of results plus the size of the full result set.
#[derive(Debug, Clone, PartialEq)]
pub struct PaginatedResult<T> {
    /// The items in the current page.
    pub items: Vec<T>,
    /// Total number of matching items across all pages.
    pub total: u64,
    pub pagination: Pagination,
}

impl<T> PaginatedResult<T> {
    #[must_use]
    pub const fn new(items: Vec<T>, total: u64, pagination: Pagination) -> Self {
        Self {
            items,
            total,
            pagination,
        }
    }

    /// Returns the total number of pages, `ceil(total / limit)`.
    #[must_use]
    pub const fn total_pages(&self) -> u64 {
        self.total.div_ceil(self.pagination.limit as u64)
    }
}

// =============================================================================
// Task Store
// =============================================================================

/// Persistence contract for task records.
///
/// Implementations must make each call atomic for the record(s) it touches
/// and provide read-after-write consistency.
pub trait TaskStore: Send + Sync {
    /// Inserts a new record.
    fn insert(&self, task: &Task) -> StoreFuture<'_, ()>;

    /// Returns matching records ordered by `sort`, skipping `skip` and
    /// returning at most `limit` (all remaining when `None`).
    fn find_many(
        &self,
        filter: &TaskFilter,
        sort: TaskSort,
        skip: u64,
        limit: Option<u64>,
    ) -> StoreFuture<'_, Vec<Task>>;

    /// Counts matching records.
    fn count(&self, filter: &TaskFilter) -> StoreFuture<'_, u64>;

    /// Applies `changes` to the first matching record and returns the
    /// updated record, or `None` when nothing matches.
    fn find_one_and_update(
        &self,
        filter: &TaskFilter,
        changes: &TaskChanges,
    ) -> StoreFuture<'_, Option<Task>>;

    /// Removes the first matching record and returns it, or `None` when
    /// nothing matches.
    fn find_one_and_delete(&self, filter: &TaskFilter) -> StoreFuture<'_, Option<Task>>;
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rstest::rstest;

    fn task(owner: &str, title: &str, priority: i64) -> Task {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        Task {
            task_id: TaskId::generate(),
            owner_id: UserId::new(owner),
            title: title.to_string(),
            priority: Priority::new(priority).unwrap(),
            status: TaskStatus::Pending,
            start_time: start,
            end_time: start,
        }
    }

    // -------------------------------------------------------------------------
    // Pagination Tests
    // -------------------------------------------------------------------------

    #[rstest]
    fn test_pagination_offset_is_one_indexed() {
        assert_eq!(Pagination::new(1, 10).unwrap().offset(), 0);
        assert_eq!(Pagination::new(2, 10).unwrap().offset(), 10);
        assert_eq!(Pagination::new(3, 20).unwrap().offset(), 40);
    }

    #[rstest]
    #[case(0, 10)]
    #[case(1, 0)]
    fn test_pagination_rejects_zero(#[case] page: u32, #[case] limit: u32) {
        assert!(Pagination::new(page, limit).is_none());
    }

    #[rstest]
    fn test_pagination_offset_does_not_overflow() {
        let pagination = Pagination::new(u32::MAX, u32::MAX).unwrap();
        assert_eq!(
            pagination.offset(),
            (u64::from(u32::MAX) - 1) * u64::from(u32::MAX)
        );
    }

    #[rstest]
    #[case(25, 10, 3)]
    #[case(20, 10, 2)]
    #[case(0, 10, 0)]
    #[case(1, 10, 1)]
    fn test_paginated_result_total_pages(
        #[case] total: u64,
        #[case] limit: u32,
        #[case] expected: u64,
    ) {
        let result: PaginatedResult<()> =
            PaginatedResult::new(vec![], total, Pagination::new(1, limit).unwrap());
        assert_eq!(result.total_pages(), expected);
    }

    // -------------------------------------------------------------------------
    // Filter Tests
    // -------------------------------------------------------------------------

    #[rstest]
    fn test_filter_default_matches_everything() {
        assert!(TaskFilter::default().matches(&task("alice", "a", 1)));
    }

    #[rstest]
    fn test_filter_owner_mismatch() {
        let filter = TaskFilter {
            owner_id: Some(UserId::new("bob")),
            ..TaskFilter::default()
        };
        assert!(!filter.matches(&task("alice", "a", 1)));
    }

    #[rstest]
    fn test_filter_combines_constraints() {
        let candidate = task("alice", "a", 3);
        let filter = TaskFilter {
            owner_id: Some(UserId::new("alice")),
            task_id: Some(candidate.task_id),
            status: Some(TaskStatus::Pending),
            priority: Some(Priority::new(3).unwrap()),
        };
        assert!(filter.matches(&candidate));

        let filter = TaskFilter {
            priority: Some(Priority::new(4).unwrap()),
            ..filter
        };
        assert!(!filter.matches(&candidate));
    }

    // -------------------------------------------------------------------------
    // Sort Tests
    // -------------------------------------------------------------------------

    #[rstest]
    #[case("title", SortField::Title)]
    #[case("priority", SortField::Priority)]
    #[case("startTime", SortField::StartTime)]
    #[case("end_time", SortField::EndTime)]
    fn test_sort_field_from_str(#[case] input: &str, #[case] expected: SortField) {
        assert_eq!(input.parse::<SortField>(), Ok(expected));
    }

    #[rstest]
    fn test_sort_field_rejects_unknown() {
        assert!("ownerId".parse::<SortField>().is_err());
    }

    #[rstest]
    #[case("asc", SortDirection::Ascending)]
    #[case("DESC", SortDirection::Descending)]
    fn test_sort_direction_from_str(#[case] input: &str, #[case] expected: SortDirection) {
        assert_eq!(input.parse::<SortDirection>(), Ok(expected));
    }

    #[rstest]
    fn test_sort_descending_keeps_ascending_tiebreak() {
        let mut first = task("alice", "same", 2);
        let mut second = task("alice", "same", 2);
        if second.task_id < first.task_id {
            std::mem::swap(&mut first, &mut second);
        }

        let sort = TaskSort::new(SortField::Priority, SortDirection::Descending);
        assert_eq!(sort.compare(&first, &second), Ordering::Less);
    }

    #[rstest]
    fn test_sort_by_title_descending() {
        let apple = task("alice", "apple", 1);
        let banana = task("alice", "banana", 1);
        let sort = TaskSort::new(SortField::Title, SortDirection::Descending);
        assert_eq!(sort.compare(&banana, &apple), Ordering::Less);
    }
}
