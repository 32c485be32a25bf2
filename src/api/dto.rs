//! Data Transfer Objects for API responses.
//!
//! Request bodies deserialize straight into the service inputs
//! ([`TaskInput`](crate::service::TaskInput),
//! [`ListTasksQuery`](crate::service::ListTasksQuery)); this module only
//! shapes what goes back out.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    PendingSummary, PrioritySummary, Task, TaskStatus, TaskSummary, format_hours,
};
use crate::infrastructure::PaginatedResult;

/// RFC 3339 in UTC with millisecond precision, e.g. `2024-01-01T09:00:00.000Z`.
fn render_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

// =============================================================================
// Task DTOs
// =============================================================================

/// Response DTO for a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResponse {
    #[serde(rename = "task_id")]
    pub task_id: String,
    pub title: String,
    pub priority: u8,
    pub status: TaskStatus,
    pub start_time: String,
    pub end_time: String,
    /// Hours between start and end, always with two decimals.
    pub total_time: String,
}

impl From<&Task> for TaskResponse {
    fn from(task: &Task) -> Self {
        Self {
            task_id: task.task_id.to_string(),
            title: task.title.clone(),
            priority: task.priority.value(),
            status: task.status,
            start_time: render_timestamp(task.start_time),
            end_time: render_timestamp(task.end_time),
            total_time: format_hours(task.total_hours()),
        }
    }
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        Self::from(&task)
    }
}

/// One page of tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskListResponse {
    pub tasks: Vec<TaskResponse>,
    /// Size of the filtered set before pagination.
    pub total_tasks: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u64,
}

impl From<PaginatedResult<Task>> for TaskListResponse {
    fn from(result: PaginatedResult<Task>) -> Self {
        let total_pages = result.total_pages();
        Self {
            tasks: result.items.iter().map(TaskResponse::from).collect(),
            total_tasks: result.total,
            page: result.pagination.page,
            limit: result.pagination.limit,
            total_pages,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateTaskResponse {
    pub task: TaskResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteTaskResponse {
    pub message: String,
}

impl DeleteTaskResponse {
    #[must_use]
    pub fn deleted() -> Self {
        Self {
            message: "Task deleted successfully".to_string(),
        }
    }
}

// =============================================================================
// Summary DTOs
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSummaryResponse {
    pub total_tasks: u64,
    pub completed_percentage: f64,
    pub pending_percentage: f64,
    pub average_time: f64,
    pub pending: PendingSummaryResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingSummaryResponse {
    pub pending_tasks: u64,
    pub total_time_lapsed: f64,
    pub total_time_to_finish: f64,
    pub priority_summary: Vec<PrioritySummaryResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrioritySummaryResponse {
    pub priority: u8,
    pub pending_tasks: u64,
    pub time_lapsed: f64,
    pub time_to_finish: f64,
}

impl From<&PrioritySummary> for PrioritySummaryResponse {
    fn from(row: &PrioritySummary) -> Self {
        Self {
            priority: row.priority.value(),
            pending_tasks: row.pending_tasks,
            time_lapsed: row.time_lapsed,
            time_to_finish: row.time_to_finish,
        }
    }
}

impl From<&PendingSummary> for PendingSummaryResponse {
    fn from(pending: &PendingSummary) -> Self {
        Self {
            pending_tasks: pending.pending_tasks,
            total_time_lapsed: pending.total_time_lapsed,
            total_time_to_finish: pending.total_time_to_finish,
            priority_summary: pending
                .priority_summary
                .iter()
                .map(PrioritySummaryResponse::from)
                .collect(),
        }
    }
}

impl From<TaskSummary> for TaskSummaryResponse {
    fn from(summary: TaskSummary) -> Self {
        Self {
            total_tasks: summary.total_tasks,
            completed_percentage: summary.completed_percentage,
            pending_percentage: summary.pending_percentage,
            average_time: summary.average_time,
            pending: PendingSummaryResponse::from(&summary.pending),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Priority, TaskId, UserId};
    use crate::infrastructure::Pagination;
    use chrono::TimeZone;
    use rstest::rstest;

    fn task() -> Task {
        Task {
            task_id: TaskId::generate(),
            owner_id: UserId::new("alice"),
            title: "write report".to_string(),
            priority: Priority::new(2).unwrap(),
            status: TaskStatus::Pending,
            start_time: Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2024, 1, 1, 11, 30, 0).unwrap(),
        }
    }

    #[rstest]
    fn test_task_response_wire_shape() {
        let task = task();

        let json = serde_json::to_value(TaskResponse::from(&task)).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "task_id": task.task_id.to_string(),
                "title": "write report",
                "priority": 2,
                "status": "pending",
                "startTime": "2024-01-01T09:00:00.000Z",
                "endTime": "2024-01-01T11:30:00.000Z",
                "totalTime": "2.50",
            })
        );
    }

    #[rstest]
    fn test_task_response_does_not_expose_owner() {
        let json = serde_json::to_value(TaskResponse::from(task())).unwrap();
        assert!(json.get("ownerId").is_none());
        assert!(json.get("owner_id").is_none());
    }

    #[rstest]
    fn test_task_list_response_paging_fields() {
        let result = PaginatedResult::new(vec![task()], 25, Pagination::new(3, 10).unwrap());

        let json = serde_json::to_value(TaskListResponse::from(result)).unwrap();

        assert_eq!(json["totalTasks"], 25);
        assert_eq!(json["page"], 3);
        assert_eq!(json["limit"], 10);
        assert_eq!(json["totalPages"], 3);
        assert_eq!(json["tasks"].as_array().map(Vec::len), Some(1));
    }

    #[rstest]
    fn test_summary_response_field_names() {
        let summary = TaskSummary::compute(&[task()], task().start_time);

        let json = serde_json::to_value(TaskSummaryResponse::from(summary)).unwrap();

        assert_eq!(json["totalTasks"], 1);
        assert_eq!(json["pending"]["pendingTasks"], 1);
        assert_eq!(json["pending"]["totalTimeToFinish"], 2.5);
        assert_eq!(
            json["pending"]["prioritySummary"]
                .as_array()
                .map(Vec::len),
            Some(5)
        );
        assert_eq!(json["pending"]["prioritySummary"][1]["priority"], 2);
    }
}
