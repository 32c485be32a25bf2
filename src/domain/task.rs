//! Task domain model.
//!
//! A task belongs to exactly one owner and carries a priority, a status and a
//! time window. The elapsed time is never stored; it is derived from the
//! window each time a task is read.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Number of milliseconds in one hour.
pub const MILLISECONDS_PER_HOUR: f64 = 3_600_000.0;

// =============================================================================
// Value Objects - Identifiers
// =============================================================================

/// Unique identifier for a task.
///
/// This is a newtype wrapper around UUID. The store treats it as an opaque
/// key; it is the only authoritative identifier a task has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Creates a `TaskId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Generates a new time-ordered identifier (UUID v7).
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    /// Parses an identifier received from a caller.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTaskId`] when the value is not a UUID.
    pub fn parse(value: &str) -> Result<Self, InvalidTaskId> {
        Uuid::parse_str(value.trim())
            .map(Self)
            .map_err(|_| InvalidTaskId(value.to_string()))
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// A task identifier that does not have the expected shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{0}' is not a valid task identifier")]
pub struct InvalidTaskId(pub String);

/// Identifier of the user owning a task, as resolved by the identity layer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

// =============================================================================
// Value Objects - Priority
// =============================================================================

/// Task priority, an integer in `1..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority(u8);

impl Priority {
    /// Lowest accepted priority value.
    pub const MIN: u8 = 1;
    /// Highest accepted priority value.
    pub const MAX: u8 = 5;

    /// Creates a priority from a raw integer.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidPriority`] when the value is outside `1..=5`.
    pub fn new(value: i64) -> Result<Self, InvalidPriority> {
        u8::try_from(value)
            .ok()
            .filter(|value| (Self::MIN..=Self::MAX).contains(value))
            .map(Self)
            .ok_or(InvalidPriority)
    }

    /// Returns the numeric value.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Iterates over every priority from lowest to highest.
    pub fn all() -> impl Iterator<Item = Self> {
        (Self::MIN..=Self::MAX).map(Self)
    }
}

impl FromStr for Priority {
    type Err = InvalidPriority;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        value
            .trim()
            .parse::<i64>()
            .map_err(|_| InvalidPriority)
            .and_then(Self::new)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Priority must be an integer between 1 and 5")]
pub struct InvalidPriority;

// =============================================================================
// Value Objects - Status
// =============================================================================

/// Task status.
///
/// Input is matched case-insensitively; the stored and rendered form is
/// always lowercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Finished,
}

impl TaskStatus {
    /// Returns the normalized (lowercase) representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Finished => "finished",
        }
    }
}

impl FromStr for TaskStatus {
    type Err = InvalidStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "finished" => Ok(Self::Finished),
            _ => Err(InvalidStatus(value.to_string())),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Status must be either 'pending' or 'finished'")]
pub struct InvalidStatus(pub String);

// =============================================================================
// Timestamps
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid date format")]
pub struct InvalidTimestamp(pub String);

/// Parses a caller-supplied timestamp.
///
/// Accepts RFC 3339 (with `Z` or an explicit offset), an offset-less
/// `YYYY-MM-DDTHH:MM[:SS[.fff]]` which is read as UTC, and a bare
/// `YYYY-MM-DD` which is read as midnight UTC.
///
/// # Errors
///
/// Returns [`InvalidTimestamp`] when none of the formats match.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, InvalidTimestamp> {
    let trimmed = value.trim();

    if let Ok(timestamp) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(timestamp.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| InvalidTimestamp(value.to_string()))
}

// =============================================================================
// Derived Time
// =============================================================================

/// Rounds to two decimal places, normalizing negative zero.
#[must_use]
pub fn round_to_hundredths(value: f64) -> f64 {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded.abs() < f64::EPSILON {
        0.0
    } else {
        rounded
    }
}

/// Hours elapsed between two instants, unrounded.
///
/// Negative when `end` precedes `start`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn raw_hours_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start).num_milliseconds() as f64 / MILLISECONDS_PER_HOUR
}

/// Hours elapsed between two instants, rounded to two decimals.
#[must_use]
pub fn hours_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    round_to_hundredths(raw_hours_between(start, end))
}

/// Renders an hour figure with exactly two decimals (`2.5` becomes `"2.50"`).
#[must_use]
pub fn format_hours(hours: f64) -> String {
    format!("{:.2}", round_to_hundredths(hours))
}

// =============================================================================
// Task Entity
// =============================================================================

/// A unit of work owned by a single user.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    /// Opaque identifier assigned at creation.
    pub task_id: TaskId,
    /// Owning user, fixed at creation.
    pub owner_id: UserId,
    /// Non-empty title.
    pub title: String,
    /// Priority in `1..=5`.
    pub priority: Priority,
    /// Current status.
    pub status: TaskStatus,
    /// Start of the time window.
    pub start_time: DateTime<Utc>,
    /// End of the time window. Not required to follow `start_time`.
    pub end_time: DateTime<Utc>,
}

impl Task {
    /// Elapsed time of the task window in hours, rounded to two decimals.
    #[must_use]
    pub fn total_hours(&self) -> f64 {
        hours_between(self.start_time, self.end_time)
    }

    /// Returns a copy of this task with `changes` applied.
    ///
    /// Identity fields (`task_id`, `owner_id`) are never touched.
    #[must_use]
    pub fn with_changes(mut self, changes: &TaskChanges) -> Self {
        if let Some(title) = &changes.title {
            self.title.clone_from(title);
        }
        if let Some(priority) = changes.priority {
            self.priority = priority;
        }
        if let Some(status) = changes.status {
            self.status = status;
        }
        if let Some(start_time) = changes.start_time {
            self.start_time = start_time;
        }
        if let Some(end_time) = changes.end_time {
            self.end_time = end_time;
        }
        self
    }
}

/// Validated field replacements applied by an update.
///
/// `None` leaves the corresponding field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub priority: Option<Priority>,
    pub status: Option<TaskStatus>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl TaskChanges {
    /// Returns true when no field would change.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.priority.is_none()
            && self.status.is_none()
            && self.start_time.is_none()
            && self.end_time.is_none()
    }
}

// =============================================================================
// Tests
// =============================================================================
