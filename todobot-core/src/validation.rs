//! Task text validation.
//!
//! This is a deny-list check, not sanitization: only empty input, overlong
//! input, and the two literal markers in [`DISALLOWED_PATTERNS`] are
//! rejected.

/// Substrings that make a task text invalid.
pub const DISALLOWED_PATTERNS: [&str; 2] = ["<script>", "javascript:"];

/// Why a task text was rejected.
///
/// The `Display` output is meant to be shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Text is empty or whitespace-only.
    #[error("The task cannot be empty.")]
    Empty,
    /// Text exceeds the configured maximum length.
    #[error("The task is too long (max {max} characters).")]
    TooLong {
        /// Maximum allowed length in characters.
        max: usize,
    },
    /// Text contains a disallowed marker.
    #[error("The text contains characters that are not allowed.")]
    Disallowed,
}

/// Validates a task text and returns it trimmed.
///
/// Length is counted in characters after trimming.
///
/// # Errors
///
/// Returns [`ValidationError`] when the text is empty, longer than
/// `max_len` characters, or contains a disallowed pattern.
pub fn validate_task_text(text: &str, max_len: usize) -> Result<&str, ValidationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty);
    }
    if trimmed.chars().count() > max_len {
        return Err(ValidationError::TooLong { max: max_len });
    }
    if DISALLOWED_PATTERNS.iter().any(|p| trimmed.contains(p)) {
        return Err(ValidationError::Disallowed);
    }
    Ok(trimmed)
}
