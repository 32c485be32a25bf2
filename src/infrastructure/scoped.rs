//! Owner-scoped access to a [`TaskStore`].
//!
//! Every query issued through an [`OwnerScope`] carries the owner constraint,
//! whatever filter the caller passes in. Listing, updating, deleting and
//! summarizing all go through this type so the scoping rule lives in one
//! place.

use crate::domain::{Task, TaskChanges, TaskId, UserId};

use super::repository::{
    PaginatedResult, Pagination, RepositoryError, TaskFilter, TaskSort, TaskStore,
};

/// A view of the store restricted to one owner's records.
#[derive(Clone, Copy)]
pub struct OwnerScope<'a> {
    store: &'a dyn TaskStore,
    owner_id: &'a UserId,
}

impl<'a> OwnerScope<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn TaskStore, owner_id: &'a UserId) -> Self {
        Self { store, owner_id }
    }

    #[must_use]
    pub const fn owner_id(&self) -> &UserId {
        self.owner_id
    }

    /// Forces the owner constraint onto `filter`.
    fn scoped(&self, filter: TaskFilter) -> TaskFilter {
        TaskFilter {
            owner_id: Some(self.owner_id.clone()),
            ..filter
        }
    }

    fn by_id(&self, task_id: TaskId) -> TaskFilter {
        self.scoped(TaskFilter {
            task_id: Some(task_id),
            ..TaskFilter::default()
        })
    }

    /// Stores `task` under this owner. The task's `owner_id` is overwritten.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn insert(&self, task: Task) -> Result<Task, RepositoryError> {
        let task = Task {
            owner_id: self.owner_id.clone(),
            ..task
        };
        self.store.insert(&task).await?;
        Ok(task)
    }

    /// Returns one page of matching tasks and the size of the whole match.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn page(
        &self,
        filter: TaskFilter,
        sort: TaskSort,
        pagination: Pagination,
    ) -> Result<PaginatedResult<Task>, RepositoryError> {
        let filter = self.scoped(filter);
        let total = self.store.count(&filter).await?;
        let items = self
            .store
            .find_many(
                &filter,
                sort,
                pagination.offset(),
                Some(u64::from(pagination.limit)),
            )
            .await?;
        Ok(PaginatedResult::new(items, total, pagination))
    }

    /// Returns every task of this owner.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn all(&self) -> Result<Vec<Task>, RepositoryError> {
        let filter = self.scoped(TaskFilter::default());
        self.store
            .find_many(&filter, TaskSort::default(), 0, None)
            .await
    }

    /// Updates the owner's task `task_id`; `None` if absent or not owned.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn update(
        &self,
        task_id: TaskId,
        changes: &TaskChanges,
    ) -> Result<Option<Task>, RepositoryError> {
        self.store
            .find_one_and_update(&self.by_id(task_id), changes)
            .await
    }

    /// Deletes the owner's task `task_id`; `None` if absent or not owned.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn delete(&self, task_id: TaskId) -> Result<Option<Task>, RepositoryError> {
        self.store.find_one_and_delete(&self.by_id(task_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Priority, TaskStatus};
    use crate::infrastructure::InMemoryTaskStore;
    use chrono::{TimeZone, Utc};
    use rstest::rstest;

    fn task(owner: &str) -> Task {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        Task {
            task_id: TaskId::generate(),
            owner_id: UserId::new(owner),
            title: "task".to_string(),
            priority: Priority::new(1).unwrap(),
            status: TaskStatus::Pending,
            start_time: start,
            end_time: start,
        }
    }

    #[rstest]
    #[tokio::test]
    async fn test_insert_stamps_owner() {
        let store = InMemoryTaskStore::new();
        let alice = UserId::new("alice");
        let scope = OwnerScope::new(&store, &alice);

        let stored = scope.insert(task("mallory")).await.unwrap();

        assert_eq!(stored.owner_id, alice);
        assert_eq!(scope.all().await.unwrap(), vec![stored]);
    }

    #[rstest]
    #[tokio::test]
    async fn test_caller_filter_cannot_escape_scope() {
        let store = InMemoryTaskStore::new();
        let alice = UserId::new("alice");
        let bob = UserId::new("bob");
        OwnerScope::new(&store, &bob).insert(task("bob")).await.unwrap();

        let scope = OwnerScope::new(&store, &alice);
        let filter = TaskFilter {
            owner_id: Some(bob.clone()),
            ..TaskFilter::default()
        };
        let page = scope
            .page(filter, TaskSort::default(), Pagination::default())
            .await
            .unwrap();

        assert_eq!(page.total, 0);
        assert!(page.items.is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn test_foreign_task_is_invisible_to_update_and_delete() {
        let store = InMemoryTaskStore::new();
        let alice = UserId::new("alice");
        let bob = UserId::new("bob");
        let foreign = OwnerScope::new(&store, &bob).insert(task("bob")).await.unwrap();

        let scope = OwnerScope::new(&store, &alice);
        let changes = TaskChanges {
            title: Some("hijacked".to_string()),
            ..TaskChanges::default()
        };

        assert_eq!(scope.update(foreign.task_id, &changes).await.unwrap(), None);
        assert_eq!(scope.delete(foreign.task_id).await.unwrap(), None);

        let untouched = OwnerScope::new(&store, &bob).all().await.unwrap();
        assert_eq!(untouched, vec![foreign]);
    }
}
