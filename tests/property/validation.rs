//! Property-based tests for task text validation and list ordering.
//!
//! Uses proptest to verify:
//! 1. Any non-blank text within the limit is accepted and comes back trimmed.
//! 2. Any text longer than the limit is rejected with `TooLong`.
//! 3. Whitespace-only text is always rejected with `Empty`.
//! 4. Priority ordering is a stable partition of the input.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use proptest::prelude::*;
use todobot_core::task::{MAX_TASK_LENGTH, Task, priority_sorted};
use todobot_core::validation::{ValidationError, validate_task_text};

/// Text made of letters, digits, and inner spaces, never blank at the ends.
fn arb_clean_text(max: usize) -> impl Strategy<Value = String> {
    proptest::string::string_regex(&format!("[a-zA-Z0-9][a-zA-Z0-9 ]{{0,{}}}", max - 1))
        .unwrap()
        .prop_map(|s| s.trim_end().to_string())
}

fn arb_tasks() -> impl Strategy<Value = Vec<Task>> {
    prop::collection::vec(any::<bool>(), 0..40).prop_map(|flags| {
        flags
            .into_iter()
            .enumerate()
            .map(|(i, priority)| {
                let mut task = Task::new(format!("task {i}"));
                task.priority = priority;
                task
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn clean_text_within_limit_is_accepted(text in arb_clean_text(MAX_TASK_LENGTH), pad in 0usize..4) {
        let padded = format!("{}{text}{}", " ".repeat(pad), "\t".repeat(pad));
        prop_assert_eq!(validate_task_text(&padded, MAX_TASK_LENGTH), Ok(text.as_str()));
    }

    #[test]
    fn overlong_text_is_rejected(extra in 1usize..50, ch in "[a-z\u{e0}-\u{ff}]") {
        let text = ch.repeat(MAX_TASK_LENGTH + extra);
        prop_assert_eq!(
            validate_task_text(&text, MAX_TASK_LENGTH),
            Err(ValidationError::TooLong { max: MAX_TASK_LENGTH })
        );
    }

    #[test]
    fn whitespace_only_is_empty(ws in "[ \t\r\n]{0,30}") {
        prop_assert_eq!(validate_task_text(&ws, MAX_TASK_LENGTH), Err(ValidationError::Empty));
    }

    #[test]
    fn priority_order_is_a_stable_partition(tasks in arb_tasks()) {
        let sorted = priority_sorted(&tasks);
        prop_assert_eq!(sorted.len(), tasks.len());

        let split = sorted.iter().position(|t| !t.priority).unwrap_or(sorted.len());
        prop_assert!(sorted[..split].iter().all(|t| t.priority));
        prop_assert!(sorted[split..].iter().all(|t| !t.priority));

        let expected: Vec<&str> = tasks
            .iter()
            .filter(|t| t.priority)
            .chain(tasks.iter().filter(|t| !t.priority))
            .map(|t| t.id.as_str())
            .collect();
        let actual: Vec<&str> = sorted.iter().map(|t| t.id.as_str()).collect();
        prop_assert_eq!(actual, expected);
    }
}
