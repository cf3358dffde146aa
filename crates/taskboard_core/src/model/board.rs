//! User, board and membership records.
//!
//! # Invariants
//! - The board owner is never stored as a membership row; ownership is
//!   implied by `Board::owner_id`.
//! - Only `Accepted` memberships grant access.

use super::{normalize_text, BoardId, UserId, ValidationError, MAX_TITLE_CHARS};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static HEX_COLOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("valid hex color regex"));
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

const MAX_BOARD_DESCRIPTION_CHARS: usize = 500;
const MAX_USERNAME_CHARS: usize = 150;

/// Default lists seeded into every new board, in position order.
pub const DEFAULT_LIST_TITLES: [&str; 3] = ["Todo", "Doing", "Done"];

/// Account record as seen by the board core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub created_at: i64,
}

/// Validated input for a new user row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
}

impl NewUser {
    pub fn new(username: &str, email: &str) -> Result<Self, ValidationError> {
        let username = normalize_text("username", username, MAX_USERNAME_CHARS)?;
        let email = email.trim().to_ascii_lowercase();
        if !EMAIL_RE.is_match(&email) {
            return Err(ValidationError::Malformed {
                field: "email",
                value: email,
            });
        }
        Ok(Self { username, email })
    }
}

/// Board record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub id: BoardId,
    pub title: String,
    pub description: Option<String>,
    /// `#RRGGBB` when set.
    pub color: Option<String>,
    pub owner_id: UserId,
    pub is_public: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// User-editable board fields, shared by create and update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardDraft {
    pub title: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub is_public: bool,
}

impl BoardDraft {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Returns a normalized copy or the first invalid field.
    pub fn normalized(&self) -> Result<Self, ValidationError> {
        let title = normalize_text("board title", &self.title, MAX_TITLE_CHARS)?;
        let description = match self.description.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(text) if text.chars().count() > MAX_BOARD_DESCRIPTION_CHARS => {
                return Err(ValidationError::TooLong {
                    field: "board description",
                    max: MAX_BOARD_DESCRIPTION_CHARS,
                });
            }
            Some(text) => Some(text.to_string()),
        };
        let color = match self.color.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(value) if HEX_COLOR_RE.is_match(value) => Some(value.to_ascii_lowercase()),
            Some(value) => {
                return Err(ValidationError::Malformed {
                    field: "board color",
                    value: value.to_string(),
                });
            }
        };
        Ok(Self {
            title,
            description,
            color,
            is_public: self.is_public,
        })
    }
}

/// Role stored on a membership row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    Admin,
    Member,
}

impl MemberRole {
    pub fn as_db(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Member => "member",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(Self::Admin),
            "member" => Some(Self::Member),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardMembership {
    pub board_id: BoardId,
    pub user_id: UserId,
    pub role: MemberRole,
    pub invited_by: UserId,
    pub created_at: i64,
}

/// Effective access level of one user on one board.
///
/// Ordered so that `Owner > Admin > Member`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BoardRole {
    Member,
    Admin,
    Owner,
}

impl std::fmt::Display for BoardRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Member => write!(f, "member"),
            Self::Admin => write!(f, "admin"),
            Self::Owner => write!(f, "owner"),
        }
    }
}

impl From<MemberRole> for BoardRole {
    fn from(value: MemberRole) -> Self {
        match value {
            MemberRole::Admin => Self::Admin,
            MemberRole::Member => Self::Member,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BoardDraft, BoardRole, MemberRole, NewUser};

    #[test]
    fn board_draft_normalizes_color_and_blank_description() {
        let draft = BoardDraft {
            title: " Roadmap ".to_string(),
            description: Some("   ".to_string()),
            color: Some("#A1B2C3".to_string()),
            is_public: false,
        };
        let normalized = draft.normalized().unwrap();
        assert_eq!(normalized.title, "Roadmap");
        assert_eq!(normalized.description, None);
        assert_eq!(normalized.color.as_deref(), Some("#a1b2c3"));
    }

    #[test]
    fn board_draft_rejects_named_color() {
        let mut draft = BoardDraft::titled("Roadmap");
        draft.color = Some("blue".to_string());
        assert!(draft.normalized().is_err());
    }

    #[test]
    fn role_ordering_ranks_owner_over_admin_over_member() {
        assert!(BoardRole::Owner > BoardRole::from(MemberRole::Admin));
        assert!(BoardRole::from(MemberRole::Admin) > BoardRole::from(MemberRole::Member));
        assert_eq!(BoardRole::from(MemberRole::Member).to_string(), "member");
    }

    #[test]
    fn new_user_requires_plausible_email() {
        assert!(NewUser::new("ana", "ana@example.com").is_ok());
        assert!(NewUser::new("ana", "not-an-email").is_err());
    }
}
