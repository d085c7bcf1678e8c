//! Button actions and their callback-data encoding.

use std::fmt;

use todobot_core::task::TaskId;

const CREATE_TASK: &str = "CREATE_TASK";
const SHOW_LIST: &str = "SHOW_LIST";
const MENU: &str = "MENU";
const PRIORITY: &str = "PRIORITY_";
const COMPLETE: &str = "COMPLETE_";
const CONFIRM_DELETE: &str = "CONFIRM_DELETE_";
const DELETE: &str = "DELETE_";
const EDIT: &str = "EDIT_";

/// Something a user can trigger by pressing a button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Start entering a new task.
    CreateTask,
    /// Show the task list.
    ShowList,
    /// Back to the main menu.
    Menu,
    /// Toggle a task's priority.
    TogglePriority(TaskId),
    /// Mark a task done, which removes it.
    Complete(TaskId),
    /// Ask for confirmation before deleting a task.
    AskDelete(TaskId),
    /// Delete a task after confirmation.
    ConfirmDelete(TaskId),
    /// Start editing a task's text.
    Edit(TaskId),
}

impl Action {
    /// Parses callback data. Returns `None` for unknown payloads and for
    /// task actions with an empty id.
    #[must_use]
    pub fn parse(data: &str) -> Option<Self> {
        match data {
            CREATE_TASK => return Some(Self::CreateTask),
            SHOW_LIST => return Some(Self::ShowList),
            MENU => return Some(Self::Menu),
            _ => {}
        }

        // CONFIRM_DELETE_ must be tried before DELETE_.
        let prefixed: [(&str, fn(TaskId) -> Self); 5] = [
            (PRIORITY, Self::TogglePriority),
            (COMPLETE, Self::Complete),
            (CONFIRM_DELETE, Self::ConfirmDelete),
            (DELETE, Self::AskDelete),
            (EDIT, Self::Edit),
        ];
        prefixed.into_iter().find_map(|(prefix, make)| {
            data.strip_prefix(prefix)
                .filter(|id| !id.is_empty())
                .map(|id| make(TaskId::new(id)))
        })
    }
}

impl fmt::Display for Action {
    /// Formats the action as callback data.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateTask => f.write_str(CREATE_TASK),
            Self::ShowList => f.write_str(SHOW_LIST),
            Self::Menu => f.write_str(MENU),
            Self::TogglePriority(id) => write!(f, "{PRIORITY}{id}"),
            Self::Complete(id) => write!(f, "{COMPLETE}{id}"),
            Self::AskDelete(id) => write!(f, "{DELETE}{id}"),
            Self::ConfirmDelete(id) => write!(f, "{CONFIRM_DELETE}{id}"),
            Self::Edit(id) => write!(f, "{EDIT}{id}"),
        }
    }
}
