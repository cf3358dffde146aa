//! Domain model for users, boards, lists and tasks.
//!
//! # Responsibility
//! - Define canonical records shared by repositories and services.
//! - Validate user-editable fields before they reach storage.
//!
//! # Invariants
//! - Every entity is identified by a stable UUID.
//! - `position` fields are positive and dense within their parent; only the
//!   position manager (`repo::position`) writes them.

use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod board;
pub mod list;
pub mod task;

pub type UserId = Uuid;
pub type BoardId = Uuid;
pub type ListId = Uuid;
pub type TaskId = Uuid;
pub type CommentId = Uuid;

/// Maximum characters for board, list and task titles.
pub const MAX_TITLE_CHARS: usize = 255;

/// Field-level validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required text is blank after trim.
    Blank(&'static str),
    /// Text exceeds the allowed length.
    TooLong { field: &'static str, max: usize },
    /// Text does not match the expected format.
    Malformed { field: &'static str, value: String },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blank(field) => write!(f, "{field} must not be blank"),
            Self::TooLong { field, max } => {
                write!(f, "{field} must be at most {max} characters")
            }
            Self::Malformed { field, value } => write!(f, "invalid {field}: `{value}`"),
        }
    }
}

impl Error for ValidationError {}

/// Trims `value` and checks it is non-blank and within `max` characters.
pub fn normalize_text(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Blank(field));
    }
    if trimmed.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(trimmed.to_string())
}

/// Current wall clock as Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::{normalize_text, ValidationError};

    #[test]
    fn normalize_text_trims_and_bounds() {
        assert_eq!(normalize_text("title", "  Todo ", 10).unwrap(), "Todo");
        assert_eq!(
            normalize_text("title", "   ", 10).unwrap_err(),
            ValidationError::Blank("title")
        );
        assert_eq!(
            normalize_text("title", "abcdef", 5).unwrap_err(),
            ValidationError::TooLong {
                field: "title",
                max: 5
            }
        );
    }
}
