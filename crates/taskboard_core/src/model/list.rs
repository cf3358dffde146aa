//! Board list record.

use super::{normalize_text, BoardId, ListId, ValidationError, MAX_TITLE_CHARS};
use serde::{Deserialize, Serialize};

pub const DEFAULT_LIST_COLOR: &str = "blue";
const MAX_LIST_COLOR_CHARS: usize = 20;

/// Ordered column of a board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardList {
    pub id: ListId,
    pub board_id: BoardId,
    pub title: String,
    pub color: String,
    /// 1-based, dense within `board_id`.
    pub position: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Input for creating a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewList {
    pub title: String,
    pub color: String,
    /// `None` appends; `Some` is clamped to `[1, N + 1]` and opens a slot.
    pub position: Option<i64>,
}

impl NewList {
    pub fn new(title: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            title: normalize_text("list title", title, MAX_TITLE_CHARS)?,
            color: DEFAULT_LIST_COLOR.to_string(),
            position: None,
        })
    }

    pub fn with_color(mut self, color: &str) -> Result<Self, ValidationError> {
        self.color = normalize_list_color(color)?;
        Ok(self)
    }

    pub fn at_position(mut self, position: i64) -> Self {
        self.position = Some(position);
        self
    }
}

/// Partial update; position changes go through the move operation only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPatch {
    pub title: Option<String>,
    pub color: Option<String>,
}

impl ListPatch {
    pub fn normalized(&self) -> Result<Self, ValidationError> {
        Ok(Self {
            title: self
                .title
                .as_deref()
                .map(|title| normalize_text("list title", title, MAX_TITLE_CHARS))
                .transpose()?,
            color: self
                .color
                .as_deref()
                .map(normalize_list_color)
                .transpose()?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.color.is_none()
    }
}

fn normalize_list_color(color: &str) -> Result<String, ValidationError> {
    normalize_text("list color", color, MAX_LIST_COLOR_CHARS).map(|value| value.to_lowercase())
}
