//! `PostgreSQL` task store.
//!
//! Uses `sqlx` with a `PgPool`. Every trait method issues a single
//! statement, so each operation is atomic for the row it touches. Queries
//! are assembled with [`QueryBuilder`] so that filter values are always
//! bound, never interpolated.
//!
//! # Table Schema
//!
//! ```sql
//! CREATE TABLE tasks (
//!     id UUID PRIMARY KEY,
//!     owner_id TEXT NOT NULL,
//!     title TEXT NOT NULL,
//!     priority SMALLINT NOT NULL CHECK (priority BETWEEN 1 AND 5),
//!     status TEXT NOT NULL CHECK (status IN ('pending', 'finished')),
//!     start_time TIMESTAMPTZ NOT NULL,
//!     end_time TIMESTAMPTZ NOT NULL
//! );
//! CREATE INDEX idx_tasks_owner_id ON tasks(owner_id);
//! ```

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::domain::{Priority, Task, TaskChanges, TaskId, UserId};

use super::repository::{
    RepositoryError, SortDirection, SortField, StoreFuture, TaskFilter, TaskSort, TaskStore,
};

const TASK_COLUMNS: &str = "id, owner_id, title, priority, status, start_time, end_time";

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS tasks (
    id UUID PRIMARY KEY,
    owner_id TEXT NOT NULL,
    title TEXT NOT NULL,
    priority SMALLINT NOT NULL CHECK (priority BETWEEN 1 AND 5),
    status TEXT NOT NULL CHECK (status IN ('pending', 'finished')),
    start_time TIMESTAMPTZ NOT NULL,
    end_time TIMESTAMPTZ NOT NULL
)";

const CREATE_OWNER_INDEX: &str = "CREATE INDEX IF NOT EXISTS idx_tasks_owner_id ON tasks(owner_id)";

fn database_error(error: sqlx::Error) -> RepositoryError {
    RepositoryError::DatabaseError(error.to_string())
}

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct TaskRow {
    id: Uuid,
    owner_id: String,
    title: String,
    priority: i16,
    status: String,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
}

impl TryFrom<TaskRow> for Task {
    type Error = RepositoryError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        let priority = Priority::new(i64::from(row.priority))
            .map_err(|error| RepositoryError::SerializationError(error.to_string()))?;
        let status = row
            .status
            .parse()
            .map_err(|error: crate::domain::InvalidStatus| {
                RepositoryError::SerializationError(format!("{error}: {}", error.0))
            })?;

        Ok(Self {
            task_id: TaskId::from_uuid(row.id),
            owner_id: UserId::new(row.owner_id),
            title: row.title,
            priority,
            status,
            start_time: row.start_time,
            end_time: row.end_time,
        })
    }
}

fn into_tasks(rows: Vec<TaskRow>) -> Result<Vec<Task>, RepositoryError> {
    rows.into_iter().map(Task::try_from).collect()
}

// =============================================================================
// Query Construction
// =============================================================================

const fn sort_column(field: SortField) -> &'static str {
    match field {
        // byte-wise collation keeps database order identical to `str::cmp`
        SortField::Title => "title COLLATE \"C\"",
        SortField::Priority => "priority",
        SortField::Status => "status",
        SortField::StartTime => "start_time",
        SortField::EndTime => "end_time",
    }
}

const fn sort_keyword(direction: SortDirection) -> &'static str {
    match direction {
        SortDirection::Ascending => "ASC",
        SortDirection::Descending => "DESC",
    }
}

/// Appends a `WHERE` clause for every constrained field of `filter`.
fn push_filter(builder: &mut QueryBuilder<'static, Postgres>, filter: &TaskFilter) {
    builder.push(" WHERE TRUE");
    if let Some(owner_id) = &filter.owner_id {
        builder
            .push(" AND owner_id = ")
            .push_bind(owner_id.as_str().to_owned());
    }
    if let Some(task_id) = filter.task_id {
        builder.push(" AND id = ").push_bind(*task_id.as_uuid());
    }
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(priority) = filter.priority {
        builder
            .push(" AND priority = ")
            .push_bind(i16::from(priority.value()));
    }
}

/// Sub-select picking the single row `find_one_and_*` operates on.
fn push_first_match(builder: &mut QueryBuilder<'static, Postgres>, filter: &TaskFilter) {
    builder.push("(SELECT id FROM tasks");
    push_filter(builder, filter);
    builder.push(" ORDER BY id ASC LIMIT 1 FOR UPDATE)");
}

fn clamp_to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn select_query(
    filter: &TaskFilter,
    sort: TaskSort,
    skip: u64,
    limit: Option<u64>,
) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(format!("SELECT {TASK_COLUMNS} FROM tasks"));
    push_filter(&mut builder, filter);
    builder.push(format!(
        " ORDER BY {} {}, id ASC",
        sort_column(sort.field),
        sort_keyword(sort.direction)
    ));
    builder.push(" OFFSET ").push_bind(clamp_to_i64(skip));
    if let Some(limit) = limit {
        builder.push(" LIMIT ").push_bind(clamp_to_i64(limit));
    }
    builder
}

/// The row `find_one_and_update` would target, for patches that change nothing.
fn first_match_query(filter: &TaskFilter) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(format!("SELECT {TASK_COLUMNS} FROM tasks"));
    push_filter(&mut builder, filter);
    builder.push(" ORDER BY id ASC LIMIT 1");
    builder
}

fn count_query(filter: &TaskFilter) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM tasks");
    push_filter(&mut builder, filter);
    builder
}

/// `UPDATE ... RETURNING`, or `None` when `changes` is empty.
fn update_query(
    filter: &TaskFilter,
    changes: &TaskChanges,
) -> Option<QueryBuilder<'static, Postgres>> {
    if changes.is_empty() {
        return None;
    }

    let mut builder = QueryBuilder::new("UPDATE tasks SET ");
    let mut assignments = builder.separated(", ");
    if let Some(title) = &changes.title {
        assignments
            .push("title = ")
            .push_bind_unseparated(title.clone());
    }
    if let Some(priority) = changes.priority {
        assignments
            .push("priority = ")
            .push_bind_unseparated(i16::from(priority.value()));
    }
    if let Some(status) = changes.status {
        assignments
            .push("status = ")
            .push_bind_unseparated(status.as_str());
    }
    if let Some(start_time) = changes.start_time {
        assignments
            .push("start_time = ")
            .push_bind_unseparated(start_time);
    }
    if let Some(end_time) = changes.end_time {
        assignments
            .push("end_time = ")
            .push_bind_unseparated(end_time);
    }

    builder.push(" WHERE id = ");
    push_first_match(&mut builder, filter);
    builder.push(format!(" RETURNING {TASK_COLUMNS}"));
    Some(builder)
}

fn delete_query(filter: &TaskFilter) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new("DELETE FROM tasks WHERE id = ");
    push_first_match(&mut builder, filter);
    builder.push(format!(" RETURNING {TASK_COLUMNS}"));
    builder
}

// =============================================================================
// PostgreSQL Task Store
// =============================================================================

/// `PostgreSQL` implementation of [`TaskStore`].
///
/// # Example
///
/// ```ignore
/// let pool = PgPool::connect("postgres://localhost/tasks").await?;
/// let store = PostgresTaskStore::new(pool);
/// store.ensure_schema().await?;
/// store.insert(&task).await?;
/// ```
#[derive(Debug, Clone)]
pub struct PostgresTaskStore {
    pool: PgPool,
}

impl PostgresTaskStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates the `tasks` table and its owner index when missing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DatabaseError` if either statement fails.
    pub async fn ensure_schema(&self) -> Result<(), RepositoryError> {
        sqlx::query(CREATE_TABLE)
            .execute(&self.pool)
            .await
            .map_err(database_error)?;
        sqlx::query(CREATE_OWNER_INDEX)
            .execute(&self.pool)
            .await
            .map_err(database_error)?;
        Ok(())
    }
}

impl TaskStore for PostgresTaskStore {
    fn insert(&self, task: &Task) -> StoreFuture<'_, ()> {
        let task = task.clone();
        Box::pin(async move {
            sqlx::query(&format!(
                "INSERT INTO tasks ({TASK_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7)"
            ))
            .bind(*task.task_id.as_uuid())
            .bind(task.owner_id.as_str())
            .bind(&task.title)
            .bind(i16::from(task.priority.value()))
            .bind(task.status.as_str())
            .bind(task.start_time)
            .bind(task.end_time)
            .execute(&self.pool)
            .await
            .map_err(|error| {
                if error
                    .as_database_error()
                    .is_some_and(|database| database.is_unique_violation())
                {
                    RepositoryError::DuplicateKey(task.task_id)
                } else {
                    database_error(error)
                }
            })?;
            Ok(())
        })
    }

    fn find_many(
        &self,
        filter: &TaskFilter,
        sort: TaskSort,
        skip: u64,
        limit: Option<u64>,
    ) -> StoreFuture<'_, Vec<Task>> {
        let mut builder = select_query(filter, sort, skip, limit);
        Box::pin(async move {
            let rows = builder
                .build_query_as::<TaskRow>()
                .fetch_all(&self.pool)
                .await
                .map_err(database_error)?;
            into_tasks(rows)
        })
    }

    fn count(&self, filter: &TaskFilter) -> StoreFuture<'_, u64> {
        let mut builder = count_query(filter);
        Box::pin(async move {
            let count: i64 = builder
                .build_query_scalar()
                .fetch_one(&self.pool)
                .await
                .map_err(database_error)?;
            Ok(u64::try_from(count).unwrap_or_default())
        })
    }

    fn find_one_and_update(
        &self,
        filter: &TaskFilter,
        changes: &TaskChanges,
    ) -> StoreFuture<'_, Option<Task>> {
        let mut builder =
            update_query(filter, changes).unwrap_or_else(|| first_match_query(filter));
        Box::pin(async move {
            let row = builder
                .build_query_as::<TaskRow>()
                .fetch_optional(&self.pool)
                .await
                .map_err(database_error)?;
            row.map(Task::try_from).transpose()
        })
    }

    fn find_one_and_delete(&self, filter: &TaskFilter) -> StoreFuture<'_, Option<Task>> {
        let mut builder = delete_query(filter);
        Box::pin(async move {
            let row = builder
                .build_query_as::<TaskRow>()
                .fetch_optional(&self.pool)
                .await
                .map_err(database_error)?;
            row.map(Task::try_from).transpose()
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskStatus;
    use chrono::TimeZone;
    use rstest::rstest;

    fn alice_filter() -> TaskFilter {
        TaskFilter {
            owner_id: Some(UserId::new("alice")),
            ..TaskFilter::default()
        }
    }

    // -------------------------------------------------------------------------
    // Query Construction Tests (no DB connection required)
    // -------------------------------------------------------------------------

    #[rstest]
    fn test_select_query_binds_every_filter_value() {
        let filter = TaskFilter {
            status: Some(TaskStatus::Pending),
            priority: Some(Priority::new(2).unwrap()),
            ..alice_filter()
        };

        let builder = select_query(&filter, TaskSort::default(), 10, Some(10));

        assert_eq!(
            builder.sql(),
            "SELECT id, owner_id, title, priority, status, start_time, end_time FROM tasks \
             WHERE TRUE AND owner_id = $1 AND status = $2 AND priority = $3 \
             ORDER BY priority ASC, id ASC OFFSET $4 LIMIT $5"
        );
    }

    #[rstest]
    fn test_select_query_without_limit() {
        let sort = TaskSort::new(SortField::Title, SortDirection::Descending);

        let builder = select_query(&alice_filter(), sort, 0, None);

        assert!(
            builder
                .sql()
                .ends_with("ORDER BY title COLLATE \"C\" DESC, id ASC OFFSET $2")
        );
    }

    #[rstest]
    #[case(SortField::StartTime, "start_time")]
    #[case(SortField::EndTime, "end_time")]
    #[case(SortField::Status, "status")]
    fn test_sort_column_uses_snake_case(#[case] field: SortField, #[case] column: &str) {
        assert_eq!(sort_column(field), column);
    }

    #[rstest]
    fn test_count_query() {
        let builder = count_query(&alice_filter());
        assert_eq!(
            builder.sql(),
            "SELECT COUNT(*) FROM tasks WHERE TRUE AND owner_id = $1"
        );
    }

    #[rstest]
    fn test_update_query_sets_only_present_fields() {
        let filter = TaskFilter {
            task_id: Some(TaskId::generate()),
            ..alice_filter()
        };
        let changes = TaskChanges {
            title: Some("edited".to_string()),
            status: Some(TaskStatus::Finished),
            ..TaskChanges::default()
        };

        let builder = update_query(&filter, &changes).unwrap();

        assert_eq!(
            builder.sql(),
            "UPDATE tasks SET title = $1, status = $2 WHERE id = \
             (SELECT id FROM tasks WHERE TRUE AND owner_id = $3 AND id = $4 \
             ORDER BY id ASC LIMIT 1 FOR UPDATE) \
             RETURNING id, owner_id, title, priority, status, start_time, end_time"
        );
    }

    #[rstest]
    fn test_update_query_empty_changes_is_none() {
        assert!(update_query(&alice_filter(), &TaskChanges::default()).is_none());
        assert!(
            first_match_query(&alice_filter())
                .sql()
                .ends_with("WHERE TRUE AND owner_id = $1 ORDER BY id ASC LIMIT 1")
        );
    }

    #[rstest]
    fn test_delete_query_targets_single_row() {
        let builder = delete_query(&alice_filter());
        assert_eq!(
            builder.sql(),
            "DELETE FROM tasks WHERE id = (SELECT id FROM tasks WHERE TRUE AND owner_id = $1 \
             ORDER BY id ASC LIMIT 1 FOR UPDATE) \
             RETURNING id, owner_id, title, priority, status, start_time, end_time"
        );
    }

    #[rstest]
    fn test_row_with_unknown_status_is_serialization_error() {
        let row = TaskRow {
            id: Uuid::now_v7(),
            owner_id: "alice".to_string(),
            title: "task".to_string(),
            priority: 1,
            status: "archived".to_string(),
            start_time: Utc::now(),
            end_time: Utc::now(),
        };

        assert!(matches!(
            Task::try_from(row),
            Err(RepositoryError::SerializationError(_))
        ));
    }

    #[rstest]
    fn test_row_with_out_of_range_priority_is_serialization_error() {
        let row = TaskRow {
            id: Uuid::now_v7(),
            owner_id: "alice".to_string(),
            title: "task".to_string(),
            priority: 9,
            status: "pending".to_string(),
            start_time: Utc::now(),
            end_time: Utc::now(),
        };

        assert!(matches!(
            Task::try_from(row),
            Err(RepositoryError::SerializationError(_))
        ));
    }

    // -------------------------------------------------------------------------
    // Integration Tests (require PostgreSQL)
    // -------------------------------------------------------------------------

    async fn connect() -> PostgresTaskStore {
        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "postgres://localhost/test".into());
        let pool = PgPool::connect(&database_url).await.unwrap();
        let store = PostgresTaskStore::new(pool);
        store.ensure_schema().await.unwrap();
        store
    }

    fn task(owner: &UserId) -> Task {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        Task {
            task_id: TaskId::generate(),
            owner_id: owner.clone(),
            title: "Integration".to_string(),
            priority: Priority::new(3).unwrap(),
            status: TaskStatus::Pending,
            start_time: start,
            end_time: start + chrono::TimeDelta::minutes(150),
        }
    }

    #[rstest]
    #[tokio::test]
    #[ignore = "Requires PostgreSQL instance"]
    async fn test_postgres_insert_update_delete() {
        let store = connect().await;
        let owner = UserId::new(format!("owner-{}", Uuid::now_v7()));
        let original = task(&owner);
        store.insert(&original).await.unwrap();

        let filter = TaskFilter {
            owner_id: Some(owner.clone()),
            task_id: Some(original.task_id),
            ..TaskFilter::default()
        };
        let changes = TaskChanges {
            status: Some(TaskStatus::Finished),
            ..TaskChanges::default()
        };
        let updated = store
            .find_one_and_update(&filter, &changes)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, TaskStatus::Finished);
        assert_eq!(updated.title, original.title);

        let deleted = store.find_one_and_delete(&filter).await.unwrap();
        assert_eq!(deleted.map(|task| task.task_id), Some(original.task_id));
        assert!(store.find_one_and_delete(&filter).await.unwrap().is_none());
    }

    #[rstest]
    #[tokio::test]
    #[ignore = "Requires PostgreSQL instance"]
    async fn test_postgres_duplicate_insert() {
        let store = connect().await;
        let owner = UserId::new(format!("owner-{}", Uuid::now_v7()));
        let original = task(&owner);
        store.insert(&original).await.unwrap();

        let result = store.insert(&original).await;

        assert_eq!(result, Err(RepositoryError::DuplicateKey(original.task_id)));
        let filter = TaskFilter {
            owner_id: Some(owner),
            ..TaskFilter::default()
        };
        store.find_one_and_delete(&filter).await.unwrap();
    }

    #[rstest]
    #[tokio::test]
    #[ignore = "Requires PostgreSQL instance"]
    async fn test_postgres_count_and_page() {
        let store = connect().await;
        let owner = UserId::new(format!("owner-{}", Uuid::now_v7()));
        for _ in 0..3 {
            store.insert(&task(&owner)).await.unwrap();
        }
        let filter = TaskFilter {
            owner_id: Some(owner),
            ..TaskFilter::default()
        };

        assert_eq!(store.count(&filter).await.unwrap(), 3);
        let page = store
            .find_many(&filter, TaskSort::default(), 2, Some(10))
            .await
            .unwrap();
        assert_eq!(page.len(), 1);

        while store.find_one_and_delete(&filter).await.unwrap().is_some() {}
    }
}
