//! Durable per-user task storage.
//!
//! Defines the [`TaskRepository`] trait used by the
//! [`TaskStore`](crate::store::TaskStore) plus two implementations:
//! - [`DataManager`]: one pretty-printed JSON file per user
//!   (`<data_dir>/<user_id>.json`)
//! - [`MemoryRepository`]: in-memory, for tests and dry runs
//!
//! Saves report failures to the caller. Loads keep the historical
//! behavior of treating an unreadable or malformed file as an empty list,
//! but corruption is logged at `warn` so it does not go unnoticed.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tokio::sync::Mutex;

use crate::task::{Task, UserId};

/// File extension of per-user task files.
const TASK_FILE_EXT: &str = "json";

/// Extension of the scratch file used for atomic writes.
const TEMP_FILE_EXT: &str = "json.tmp";

/// Errors that can occur while reading or writing task lists.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An I/O operation on a task file or the data directory failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path that was being accessed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A task list could not be encoded as JSON.
    #[error("failed to serialize tasks: {0}")]
    Serialize(#[source] serde_json::Error),

    /// A task file exists but does not contain a valid task list.
    #[error("malformed task file {path}: {source}")]
    Malformed {
        /// Path of the malformed file.
        path: PathBuf,
        /// Parse error.
        source: serde_json::Error,
    },

    /// The user id cannot be used as a file name.
    #[error("user id {0:?} is not a valid file stem")]
    InvalidUserId(String),
}

/// Storage backend for per-user task lists.
pub trait TaskRepository: Send + Sync {
    /// Replace the stored list for `user` with `tasks`.
    fn save_user_tasks(
        &self,
        user: &UserId,
        tasks: &[Task],
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Load the stored list for `user`, or an empty list if there is none
    /// or it cannot be read.
    fn load_user_tasks(&self, user: &UserId)
    -> impl std::future::Future<Output = Vec<Task>> + Send;

    /// All users that have a stored list.
    fn get_all_user_ids(&self) -> impl std::future::Future<Output = Vec<UserId>> + Send;
}

/// Filesystem repository storing one JSON document per user.
#[derive(Debug, Clone)]
pub struct DataManager {
    data_dir: PathBuf,
}

impl DataManager {
    /// Opens a data manager rooted at `data_dir`.
    ///
    /// The directory is created (recursively) if missing. Failure is
    /// logged and not retried; later saves will report it.
    pub async fn open(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        if let Err(e) = tokio::fs::create_dir_all(&data_dir).await {
            tracing::error!(
                path = %data_dir.display(),
                error = %e,
                "failed to create data directory"
            );
        }
        Self { data_dir }
    }

    /// Directory holding the task files.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of the task file for `user`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidUserId`] unless the id is a plain file
    /// stem (see [`UserId::is_plain`]), so no id can address a path outside
    /// the data directory.
    pub fn user_file(&self, user: &UserId) -> Result<PathBuf, StoreError> {
        if !user.is_plain() {
            return Err(StoreError::InvalidUserId(user.as_str().to_string()));
        }
        Ok(self.data_dir.join(format!("{user}.{TASK_FILE_EXT}")))
    }

    /// Reads the task file for `user`.
    ///
    /// Returns `Ok(None)` when the user has no file.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidUserId`] for ids that are not plain
    /// file stems, [`StoreError::Io`] if the file exists but cannot be
    /// read, or [`StoreError::Malformed`] if it is not a valid task list.
    pub async fn read_user_tasks(&self, user: &UserId) -> Result<Option<Vec<Task>>, StoreError> {
        let path = self.user_file(user)?;
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|source| StoreError::Malformed { path, source })
    }

    /// Writes `bytes` to `path` through a sibling temp file and a rename,
    /// so readers never observe a half-written list.
    async fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
        let temp_path = path.with_extension(TEMP_FILE_EXT);
        tokio::fs::write(&temp_path, bytes)
            .await
            .map_err(|source| StoreError::Io {
                path: temp_path.clone(),
                source,
            })?;
        tokio::fs::rename(&temp_path, path)
            .await
            .map_err(|source| StoreError::Io {
                path: path.to_path_buf(),
                source,
            })
    }
}

impl TaskRepository for DataManager {
    async fn save_user_tasks(&self, user: &UserId, tasks: &[Task]) -> Result<(), StoreError> {
        let path = self.user_file(user)?;
        let json = serde_json::to_string_pretty(tasks).map_err(StoreError::Serialize)?;
        self.write_atomic(&path, json.as_bytes()).await?;
        tracing::debug!(user = %user, count = tasks.len(), "saved tasks");
        Ok(())
    }

    async fn load_user_tasks(&self, user: &UserId) -> Vec<Task> {
        match self.read_user_tasks(user).await {
            Ok(Some(tasks)) => tasks,
            Ok(None) => {
                tracing::debug!(user = %user, "no task file, starting empty");
                Vec::new()
            }
            Err(e) => {
                tracing::warn!(user = %user, error = %e, "could not load tasks, starting empty");
                Vec::new()
            }
        }
    }

    async fn get_all_user_ids(&self) -> Vec<UserId> {
        let mut dir = match tokio::fs::read_dir(&self.data_dir).await {
            Ok(dir) => dir,
            Err(e) => {
                tracing::error!(
                    path = %self.data_dir.display(),
                    error = %e,
                    "failed to list data directory"
                );
                return Vec::new();
            }
        };

        let mut ids = Vec::new();
        loop {
            match dir.next_entry().await {
                Ok(Some(entry)) => {
                    let path = entry.path();
                    if path.extension().and_then(|e| e.to_str()) != Some(TASK_FILE_EXT) {
                        continue;
                    }
                    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                        let id = UserId::new(stem);
                        if id.is_plain() {
                            ids.push(id);
                        }
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "error while listing data directory");
                    break;
                }
            }
        }
        ids.sort();
        ids
    }
}

/// In-memory repository. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    lists: Mutex<HashMap<UserId, Vec<Task>>>,
}

impl MemoryRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a repository pre-populated with the given lists.
    #[must_use]
    pub fn with_lists(lists: HashMap<UserId, Vec<Task>>) -> Self {
        Self {
            lists: Mutex::new(lists),
        }
    }
}

impl TaskRepository for MemoryRepository {
    async fn save_user_tasks(&self, user: &UserId, tasks: &[Task]) -> Result<(), StoreError> {
        self.lists.lock().await.insert(user.clone(), tasks.to_vec());
        Ok(())
    }

    async fn load_user_tasks(&self, user: &UserId) -> Vec<Task> {
        self.lists.lock().await.get(user).cloned().unwrap_or_default()
    }

    async fn get_all_user_ids(&self) -> Vec<UserId> {
        let mut ids: Vec<UserId> = self.lists.lock().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}
