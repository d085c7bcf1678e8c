//! Text and button layout for bot replies.

use std::fmt::Write as _;

use todobot_core::chat::{Button, OutboundMessage};
use todobot_core::task::{Task, priority_sorted};

use super::action::Action;

/// Longest task text shown on a button before it is cut.
const BUTTON_LABEL_CHARS: usize = 30;

/// Main menu buttons.
#[must_use]
pub fn main_menu() -> Vec<Vec<Button>> {
    vec![
        vec![Button::new(
            "\u{2795} New task",
            Action::CreateTask.to_string(),
        )],
        vec![Button::new(
            "\u{1f4cb} Show list",
            Action::ShowList.to_string(),
        )],
    ]
}

/// A text reply with the main menu attached.
pub fn with_menu(text: impl Into<String>) -> OutboundMessage {
    OutboundMessage::text(text).with_buttons(main_menu())
}

/// The task list: one line per task (priority first) and a row of action
/// buttons per task.
#[must_use]
pub fn task_list(tasks: &[Task]) -> OutboundMessage {
    if tasks.is_empty() {
        return with_menu("No tasks found.");
    }

    let ordered = priority_sorted(tasks);
    let mut text = String::from("Your tasks:\n");
    for task in &ordered {
        let _ = write!(text, "\n{} {}", task.glyph(), task.text);
    }

    let mut rows: Vec<Vec<Button>> = ordered
        .iter()
        .map(|task| {
            let star = if task.priority { "\u{2606}" } else { "\u{2b50}" };
            vec![
                Button::new(
                    format!("\u{2705} {}", short_label(&task.text)),
                    Action::Complete(task.id.clone()).to_string(),
                ),
                Button::new(star, Action::TogglePriority(task.id.clone()).to_string()),
                Button::new("\u{270f}\u{fe0f}", Action::Edit(task.id.clone()).to_string()),
                Button::new("\u{1f5d1}", Action::AskDelete(task.id.clone()).to_string()),
            ]
        })
        .collect();
    rows.push(vec![Button::new(
        "\u{2b05}\u{fe0f} Menu",
        Action::Menu.to_string(),
    )]);

    OutboundMessage::text(text).with_buttons(rows)
}

/// Confirmation prompt before deleting `task`.
#[must_use]
pub fn confirm_delete(task: &Task) -> OutboundMessage {
    OutboundMessage::text(format!("Delete \"{}\"?", task.text)).with_buttons(vec![vec![
        Button::new("Yes, delete", Action::ConfirmDelete(task.id.clone()).to_string()),
        Button::new("No", Action::ShowList.to_string()),
    ]])
}

fn short_label(text: &str) -> String {
    if text.chars().count() <= BUTTON_LABEL_CHARS {
        return text.to_string();
    }
    let mut label: String = text.chars().take(BUTTON_LABEL_CHARS - 1).collect();
    label.push('\u{2026}');
    label
}
