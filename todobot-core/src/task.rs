//! Task model and list ordering.
//!
//! A [`Task`] is one to-do item owned by a single user. Tasks are kept in
//! insertion order; [`priority_sorted`] produces the display order.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default maximum task text length in characters.
pub const MAX_TASK_LENGTH: usize = 200;

/// Default maximum number of tasks a single user may hold.
pub const MAX_TASKS_PER_USER: usize = 50;

/// Identifier of a chat user.
///
/// Platform user ids are numeric, but they are only ever used as opaque
/// keys (and as file stems on disk), so they are kept as strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Create a user identifier from its string representation.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Return the string representation of this user id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the id is a non-empty run of ASCII letters, digits, `_` and
    /// `-`, and so safe to use as a file stem.
    #[must_use]
    pub fn is_plain(&self) -> bool {
        !self.0.is_empty()
            && self
                .0
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stable external reference to a task, carried in button callback data.
///
/// Fresh ids are UUID v7 in simple (hyphen-free) form. Any string is
/// accepted when loading, so lists written with millisecond-timestamp
/// ids keep working.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Generate a new, time-ordered task id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::now_v7().simple().to_string())
    }

    /// Wrap an existing id string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Return the string representation of this task id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single to-do item.
///
/// Completing a task removes it from the list, so `completed` is always
/// `false` for live tasks. The field is still written to disk to keep the
/// file format stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Unique id within the owner's list.
    pub id: TaskId,
    /// Trimmed task text.
    pub text: String,
    /// Legacy completion flag.
    #[serde(default)]
    pub completed: bool,
    /// Whether the task is pinned to the top of the list.
    #[serde(default)]
    pub priority: bool,
}

impl Task {
    /// Create a fresh, non-priority task with a generated id.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: TaskId::generate(),
            text: text.into(),
            completed: false,
            priority: false,
        }
    }

    /// Glyph shown in front of the task text.
    #[must_use]
    pub const fn glyph(&self) -> &'static str {
        if self.priority { "\u{2b50}" } else { "\u{25ab}\u{fe0f}" }
    }
}

/// Returns the tasks in display order.
///
/// This is a stable partition, not a sort: priority tasks come first, and
/// both groups keep their insertion order.
#[must_use]
pub fn priority_sorted(tasks: &[Task]) -> Vec<&Task> {
    let (mut ordered, rest): (Vec<&Task>, Vec<&Task>) = tasks.iter().partition(|t| t.priority);
    ordered.extend(rest);
    ordered
}
