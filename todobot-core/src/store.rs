//! Authoritative in-memory task state with write-through persistence.
//!
//! [`TaskStore`] owns every user's task list. Each successful mutation
//! writes the user's full list through a [`TaskRepository`] and returns the
//! outcome of that write. The in-memory change is kept even when the write
//! fails: an `Err` means memory and disk have diverged, and the caller
//! decides what to tell the user.

use std::collections::HashMap;

use tokio::sync::{Mutex, RwLock};

use crate::data::{StoreError, TaskRepository};
use crate::task::{MAX_TASKS_PER_USER, Task, TaskId, UserId};

/// Why an add was refused. State is unchanged in both cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddRejection {
    /// The user already holds the maximum number of tasks.
    Full {
        /// The per-user cap.
        max: usize,
    },
    /// A task with the same (trimmed) text already exists.
    Duplicate,
}

/// Result of [`TaskStore::add_task`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// The task was appended to the user's list.
    Added(Task),
    /// The task was refused.
    Rejected(AddRejection),
}

/// Result of [`TaskStore::edit_task`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    /// The task text was replaced.
    Edited(Task),
    /// No task with that id exists.
    NotFound,
    /// Another task already has this text.
    Duplicate,
}

/// Per-user task lists behind a [`RwLock`], persisted through `R`.
pub struct TaskStore<R: TaskRepository> {
    tasks: RwLock<HashMap<UserId, Vec<Task>>>,
    repo: R,
    /// Serializes writes so the newest snapshot always lands last.
    persist_lock: Mutex<()>,
    max_tasks_per_user: usize,
}

impl<R: TaskRepository> TaskStore<R> {
    /// Creates an empty store with the default per-user cap.
    #[must_use]
    pub fn new(repo: R) -> Self {
        Self::with_max_tasks(repo, MAX_TASKS_PER_USER)
    }

    /// Creates an empty store with a custom per-user cap.
    #[must_use]
    pub fn with_max_tasks(repo: R, max_tasks_per_user: usize) -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
            repo,
            persist_lock: Mutex::new(()),
            max_tasks_per_user,
        }
    }

    /// The underlying repository.
    pub const fn repository(&self) -> &R {
        &self.repo
    }

    /// Loads every stored user's list into memory, returning the number of
    /// users loaded.
    pub async fn warm_up(&self) -> usize {
        let ids = self.repo.get_all_user_ids().await;
        let mut loaded = HashMap::with_capacity(ids.len());
        for user in ids {
            let list = self.repo.load_user_tasks(&user).await;
            loaded.insert(user, list);
        }

        let count = loaded.len();
        self.tasks.write().await.extend(loaded);
        tracing::info!(users = count, "task store warmed up");
        count
    }

    /// Appends a new task for `user`.
    ///
    /// `text` is trimmed. The add is rejected when the user is at the task
    /// cap or already has a task with the same text.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the task was added in memory but could not
    /// be persisted.
    pub async fn add_task(&self, user: &UserId, text: &str) -> Result<AddOutcome, StoreError> {
        let text = text.trim();
        let task = {
            let mut tasks = self.tasks.write().await;
            let list = tasks.entry(user.clone()).or_default();
            if list.len() >= self.max_tasks_per_user {
                return Ok(AddOutcome::Rejected(AddRejection::Full {
                    max: self.max_tasks_per_user,
                }));
            }
            if list.iter().any(|t| t.text == text) {
                return Ok(AddOutcome::Rejected(AddRejection::Duplicate));
            }
            let task = Task::new(text);
            list.push(task.clone());
            task
        };

        tracing::debug!(user = %user, task_id = %task.id, "task added");
        self.persist(user).await?;
        Ok(AddOutcome::Added(task))
    }

    /// Snapshot of `user`'s list in insertion order. Empty if the user has
    /// no list; reading never creates one.
    pub async fn get_task_list(&self, user: &UserId) -> Vec<Task> {
        self.tasks
            .read()
            .await
            .get(user)
            .cloned()
            .unwrap_or_default()
    }

    /// Looks up a single task.
    pub async fn get_task(&self, user: &UserId, task_id: &TaskId) -> Option<Task> {
        self.tasks
            .read()
            .await
            .get(user)
            .and_then(|list| list.iter().find(|t| t.id == *task_id).cloned())
    }

    /// Flips the priority flag of a task and returns the new value, or
    /// `None` if the task does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the change could not be persisted.
    pub async fn toggle_priority(
        &self,
        user: &UserId,
        task_id: &TaskId,
    ) -> Result<Option<bool>, StoreError> {
        let priority = {
            let mut tasks = self.tasks.write().await;
            let Some(task) = tasks
                .get_mut(user)
                .and_then(|list| list.iter_mut().find(|t| t.id == *task_id))
            else {
                return Ok(None);
            };
            task.priority = !task.priority;
            task.priority
        };

        self.persist(user).await?;
        Ok(Some(priority))
    }

    /// Removes a task (completion or deletion) and returns it, or `None`
    /// if it does not exist. A missing id leaves the list untouched.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the removal could not be persisted.
    pub async fn remove_task(
        &self,
        user: &UserId,
        task_id: &TaskId,
    ) -> Result<Option<Task>, StoreError> {
        let removed = {
            let mut tasks = self.tasks.write().await;
            let Some(list) = tasks.get_mut(user) else {
                return Ok(None);
            };
            let Some(pos) = list.iter().position(|t| t.id == *task_id) else {
                return Ok(None);
            };
            list.remove(pos)
        };

        tracing::debug!(user = %user, task_id = %task_id, "task removed");
        self.persist(user).await?;
        Ok(Some(removed))
    }

    /// Replaces the text of an existing task. `text` is trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the change could not be persisted.
    pub async fn edit_task(
        &self,
        user: &UserId,
        task_id: &TaskId,
        text: &str,
    ) -> Result<EditOutcome, StoreError> {
        let text = text.trim();
        let edited = {
            let mut tasks = self.tasks.write().await;
            let Some(list) = tasks.get_mut(user) else {
                return Ok(EditOutcome::NotFound);
            };
            let Some(pos) = list.iter().position(|t| t.id == *task_id) else {
                return Ok(EditOutcome::NotFound);
            };
            if list.iter().any(|t| t.id != *task_id && t.text == text) {
                return Ok(EditOutcome::Duplicate);
            }
            text.clone_into(&mut list[pos].text);
            list[pos].clone()
        };

        self.persist(user).await?;
        Ok(EditOutcome::Edited(edited))
    }

    /// Snapshot of every user with at least one task.
    pub async fn users_with_tasks(&self) -> Vec<(UserId, Vec<Task>)> {
        let tasks = self.tasks.read().await;
        let mut users: Vec<(UserId, Vec<Task>)> = tasks
            .iter()
            .filter(|(_, list)| !list.is_empty())
            .map(|(user, list)| (user.clone(), list.clone()))
            .collect();
        drop(tasks);
        users.sort_by(|a, b| a.0.cmp(&b.0));
        users
    }

    /// Writes the current list for `user`.
    ///
    /// The snapshot is taken after acquiring the persist lock, so
    /// overlapping mutations can never leave an older list on disk.
    async fn persist(&self, user: &UserId) -> Result<(), StoreError> {
        let _guard = self.persist_lock.lock().await;
        let snapshot = self.get_task_list(user).await;
        if let Err(e) = self.repo.save_user_tasks(user, &snapshot).await {
            tracing::error!(user = %user, error = %e, "failed to persist tasks");
            return Err(e);
        }
        Ok(())
    }
}
