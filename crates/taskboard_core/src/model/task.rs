//! Task and task comment records.
//!
//! # Invariants
//! - `completed_at` is `Some` exactly when `is_completed` is true.
//! - Assignees are board members or the board owner; the service
//!   layer checks this before persistence.

use super::{normalize_text, CommentId, ListId, TaskId, UserId, ValidationError, MAX_TITLE_CHARS};
use serde::{Deserialize, Serialize};

const MAX_COMMENT_CHARS: usize = 5_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl TaskPriority {
    pub fn as_db(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "urgent" => Some(Self::Urgent),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub list_id: ListId,
    pub title: String,
    pub description: Option<String>,
    pub priority: TaskPriority,
    /// Epoch ms.
    pub due_at: Option<i64>,
    /// 1-based, dense within `list_id`.
    pub position: i64,
    pub is_completed: bool,
    pub completed_at: Option<i64>,
    pub created_by: UserId,
    /// Sorted by user id.
    pub assignees: Vec<UserId>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Task {
    /// A task is overdue when it has a due date in the past and is still open.
    pub fn is_overdue(&self, now_epoch_ms: i64) -> bool {
        match self.due_at {
            Some(due_at) if !self.is_completed => now_epoch_ms > due_at,
            _ => false,
        }
    }
}

/// Input for creating a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub priority: TaskPriority,
    pub due_at: Option<i64>,
    /// `None` appends; `Some` is clamped to `[1, N + 1]` and opens a slot.
    pub position: Option<i64>,
}

impl NewTask {
    pub fn new(title: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            title: normalize_text("task title", title, MAX_TITLE_CHARS)?,
            description: None,
            priority: TaskPriority::default(),
            due_at: None,
            position: None,
        })
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = normalize_description(Some(description));
        self
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn due_at(mut self, due_at: i64) -> Self {
        self.due_at = Some(due_at);
        self
    }

    pub fn at_position(mut self, position: i64) -> Self {
        self.position = Some(position);
        self
    }
}

/// Partial update of task fields. Nested `Option` distinguishes
/// "leave unchanged" (`None`) from "clear" (`Some(None)`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub priority: Option<TaskPriority>,
    pub due_at: Option<Option<i64>>,
    pub is_completed: Option<bool>,
    pub assignees: Option<Vec<UserId>>,
}

impl TaskPatch {
    pub fn normalized(&self) -> Result<Self, ValidationError> {
        Ok(Self {
            title: self
                .title
                .as_deref()
                .map(|title| normalize_text("task title", title, MAX_TITLE_CHARS))
                .transpose()?,
            description: self
                .description
                .as_ref()
                .map(|value| normalize_description(value.as_deref())),
            priority: self.priority,
            due_at: self.due_at,
            is_completed: self.is_completed,
            assignees: self.assignees.as_ref().map(|ids| {
                let mut ids = ids.clone();
                ids.sort();
                ids.dedup();
                ids
            }),
        })
    }
}

/// Requested relocation of a task.
///
/// At least one field must be set. A `new_list` equal to the current list is
/// treated as a move within that list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskMoveRequest {
    pub new_list: Option<ListId>,
    pub new_position: Option<i64>,
}

impl TaskMoveRequest {
    pub fn to_position(position: i64) -> Self {
        Self {
            new_list: None,
            new_position: Some(position),
        }
    }

    pub fn to_list(list_id: ListId, position: Option<i64>) -> Self {
        Self {
            new_list: Some(list_id),
            new_position: position,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskComment {
    pub id: CommentId,
    pub task_id: TaskId,
    pub author_id: UserId,
    pub content: String,
    pub created_at: i64,
    pub updated_at: i64,
}

pub fn normalize_comment(content: &str) -> Result<String, ValidationError> {
    normalize_text("comment", content, MAX_COMMENT_CHARS)
}

fn normalize_description(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}
