//! In-memory task store.
//!
//! Suitable for development and tests. Records live in a `HashMap` behind a
//! `tokio::sync::RwLock`; each operation takes the lock once, which makes it
//! atomic with respect to concurrent requests.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::domain::{Task, TaskChanges, TaskId};

use super::repository::{RepositoryError, StoreFuture, TaskFilter, TaskSort, TaskStore};

/// In-memory implementation of [`TaskStore`].
///
/// Cloning shares the underlying storage.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskStore {
    tasks: Arc<RwLock<HashMap<TaskId, Task>>>,
}

impl InMemoryTaskStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records, across all owners.
    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }
}

/// Finds the identifier of the first record matching `filter`.
///
/// "First" follows identifier order so the choice is deterministic.
fn first_match(tasks: &HashMap<TaskId, Task>, filter: &TaskFilter) -> Option<TaskId> {
    if let Some(task_id) = filter.task_id {
        return tasks
            .get(&task_id)
            .filter(|task| filter.matches(task))
            .map(|task| task.task_id);
    }

    tasks
        .values()
        .filter(|task| filter.matches(task))
        .map(|task| task.task_id)
        .min()
}

#[allow(clippy::significant_drop_tightening)]
impl TaskStore for InMemoryTaskStore {
    fn insert(&self, task: &Task) -> StoreFuture<'_, ()> {
        let task = task.clone();
        Box::pin(async move {
            let mut guard = self.tasks.write().await;
            if guard.contains_key(&task.task_id) {
                return Err(RepositoryError::DuplicateKey(task.task_id));
            }
            guard.insert(task.task_id, task);
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
        let filter = filter.clone();
        Box::pin(async move {
            let guard = self.tasks.read().await;
            let mut matching: Vec<&Task> =
                guard.values().filter(|task| filter.matches(task)).collect();
            matching.sort_by(|left, right| sort.compare(left, right));

            let skip = usize::try_from(skip).unwrap_or(usize::MAX);
            let limit = limit.map_or(usize::MAX, |limit| {
                usize::try_from(limit).unwrap_or(usize::MAX)
            });

            Ok(matching
                .into_iter()
                .skip(skip)
                .take(limit)
                .cloned()
                .collect())
        })
    }

    fn count(&self, filter: &TaskFilter) -> StoreFuture<'_, u64> {
        let filter = filter.clone();
        Box::pin(async move {
            let guard = self.tasks.read().await;
            let count = guard.values().filter(|task| filter.matches(task)).count();
            Ok(count as u64)
        })
    }

    fn find_one_and_update(
        &self,
        filter: &TaskFilter,
        changes: &TaskChanges,
    ) -> StoreFuture<'_, Option<Task>> {
        let filter = filter.clone();
        let changes = changes.clone();
        Box::pin(async move {
            let mut guard = self.tasks.write().await;
            let Some(task_id) = first_match(&guard, &filter) else {
                return Ok(None);
            };
            let Some(current) = guard.remove(&task_id) else {
                return Ok(None);
            };
            let updated = current.with_changes(&changes);
            guard.insert(task_id, updated.clone());
            Ok(Some(updated))
        })
    }

    fn find_one_and_delete(&self, filter: &TaskFilter) -> StoreFuture<'_, Option<Task>> {
        let filter = filter.clone();
        Box::pin(async move {
            let mut guard = self.tasks.write().await;
            Ok(first_match(&guard, &filter).and_then(|task_id| guard.remove(&task_id)))
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Priority, TaskStatus, UserId};
    use crate::infrastructure::repository::{SortDirection, SortField};
    use chrono::{TimeZone, Utc};
    use rstest::{fixture, rstest};

    fn task(owner: &str, title: &str, priority: i64, status: TaskStatus) -> Task {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        Task {
            task_id: TaskId::generate(),
            owner_id: UserId::new(owner),
            title: title.to_string(),
            priority: Priority::new(priority).unwrap(),
            status,
            start_time: start,
            end_time: start + chrono::TimeDelta::hours(priority),
        }
    }

    fn owned_by(owner: &str) -> TaskFilter {
        TaskFilter {
            owner_id: Some(UserId::new(owner)),
            ..TaskFilter::default()
        }
    }

    #[fixture]
    fn store() -> InMemoryTaskStore {
        InMemoryTaskStore::new()
    }

    async fn seed(store: &InMemoryTaskStore) {
        for (title, priority, status) in [
            ("c", 3, TaskStatus::Pending),
            ("a", 1, TaskStatus::Finished),
            ("e", 5, TaskStatus::Pending),
            ("b", 2, TaskStatus::Pending),
            ("d", 4, TaskStatus::Finished),
        ] {
            store
                .insert(&task("alice", title, priority, status))
                .await
                .unwrap();
        }
        store
            .insert(&task("bob", "z", 1, TaskStatus::Pending))
            .await
            .unwrap();
    }

    fn titles(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|task| task.title.as_str()).collect()
    }

    // -------------------------------------------------------------------------
    // Insert
    // -------------------------------------------------------------------------

    #[rstest]
    #[tokio::test]
    async fn test_insert_then_count(store: InMemoryTaskStore) {
        seed(&store).await;
        assert_eq!(store.len().await, 6);
        assert_eq!(store.count(&owned_by("alice")).await.unwrap(), 5);
        assert_eq!(store.count(&owned_by("bob")).await.unwrap(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn test_insert_rejects_duplicate_id(store: InMemoryTaskStore) {
        let task = task("alice", "a", 1, TaskStatus::Pending);
        store.insert(&task).await.unwrap();

        let result = store.insert(&task).await;

        assert_eq!(result, Err(RepositoryError::DuplicateKey(task.task_id)));
    }

    // -------------------------------------------------------------------------
    // Find Many
    // -------------------------------------------------------------------------

    #[rstest]
    #[tokio::test]
    async fn test_find_many_default_sort_is_priority_ascending(store: InMemoryTaskStore) {
        seed(&store).await;

        let tasks = store
            .find_many(&owned_by("alice"), TaskSort::default(), 0, None)
            .await
            .unwrap();

        assert_eq!(titles(&tasks), vec!["a", "b", "c", "d", "e"]);
    }

    #[rstest]
    #[tokio::test]
    async fn test_find_many_sort_descending_with_window(store: InMemoryTaskStore) {
        seed(&store).await;
        let sort = TaskSort::new(SortField::Title, SortDirection::Descending);

        let tasks = store
            .find_many(&owned_by("alice"), sort, 1, Some(2))
            .await
            .unwrap();

        assert_eq!(titles(&tasks), vec!["d", "c"]);
    }

    #[rstest]
    #[tokio::test]
    async fn test_find_many_filters_by_status_and_priority(store: InMemoryTaskStore) {
        seed(&store).await;
        let filter = TaskFilter {
            status: Some(TaskStatus::Pending),
            ..owned_by("alice")
        };

        let pending = store
            .find_many(&filter, TaskSort::default(), 0, None)
            .await
            .unwrap();
        assert_eq!(titles(&pending), vec!["b", "c", "e"]);

        let filter = TaskFilter {
            priority: Some(Priority::new(5).unwrap()),
            ..filter
        };
        assert_eq!(store.count(&filter).await.unwrap(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn test_find_many_skip_past_end_is_empty(store: InMemoryTaskStore) {
        seed(&store).await;

        let tasks = store
            .find_many(&owned_by("alice"), TaskSort::default(), 50, Some(10))
            .await
            .unwrap();

        assert!(tasks.is_empty());
    }

    // -------------------------------------------------------------------------
    // Update / Delete
    // -------------------------------------------------------------------------

    #[rstest]
    #[tokio::test]
    async fn test_find_one_and_update_returns_updated(store: InMemoryTaskStore) {
        let original = task("alice", "a", 1, TaskStatus::Pending);
        store.insert(&original).await.unwrap();
        let filter = TaskFilter {
            task_id: Some(original.task_id),
            ..owned_by("alice")
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
        let stored = store
            .find_many(&filter, TaskSort::default(), 0, None)
            .await
            .unwrap();
        assert_eq!(stored, vec![updated]);
    }

    #[rstest]
    #[tokio::test]
    async fn test_find_one_and_update_wrong_owner_is_none(store: InMemoryTaskStore) {
        let original = task("alice", "a", 1, TaskStatus::Pending);
        store.insert(&original).await.unwrap();
        let filter = TaskFilter {
            task_id: Some(original.task_id),
            ..owned_by("bob")
        };

        let result = store
            .find_one_and_update(&filter, &TaskChanges::default())
            .await
            .unwrap();

        assert!(result.is_none());
    }

    #[rstest]
    #[tokio::test]
    async fn test_find_one_and_delete_twice(store: InMemoryTaskStore) {
        let original = task("alice", "a", 1, TaskStatus::Pending);
        store.insert(&original).await.unwrap();
        let filter = TaskFilter {
            task_id: Some(original.task_id),
            ..owned_by("alice")
        };

        let first = store.find_one_and_delete(&filter).await.unwrap();
        let second = store.find_one_and_delete(&filter).await.unwrap();

        assert_eq!(first, Some(original));
        assert_eq!(second, None);
        assert!(store.is_empty().await);
    }
}
