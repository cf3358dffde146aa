//! Service-level error type shared by board, list and task services.

use crate::model::board::BoardRole;
use crate::model::{BoardId, UserId, ValidationError};
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors from use-case services.
#[derive(Debug)]
pub enum ServiceError {
    /// Caller input failed validation.
    InvalidInput(String),
    /// Target entity does not exist.
    NotFound { entity: &'static str, id: Uuid },
    /// Acting user lacks the role the operation needs.
    PermissionDenied {
        user_id: UserId,
        board_id: BoardId,
        required: BoardRole,
    },
    /// Request is well-formed but violates a domain rule.
    InvalidOperation(String),
    /// A configured quota is already used up.
    LimitExceeded { limit: &'static str, max: u32 },
    /// User already belongs to the board.
    AlreadyMember { board_id: BoardId, user_id: UserId },
    /// Transient conflict persisted through every retry.
    Conflict { attempts: u32, message: String },
    /// Position density broke; the write was rolled back.
    InvariantViolation(RepoError),
    /// Other repository failure.
    Repo(RepoError),
}

impl ServiceError {
    pub(crate) fn not_found(entity: &'static str, id: Uuid) -> Self {
        Self::NotFound { entity, id }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::PermissionDenied {
                user_id,
                board_id,
                required,
            } => write!(
                f,
                "user {user_id} needs role {required} on board {board_id}"
            ),
            Self::InvalidOperation(message) => write!(f, "invalid operation: {message}"),
            Self::LimitExceeded { limit, max } => write!(f, "limit `{limit}` of {max} reached"),
            Self::AlreadyMember { board_id, user_id } => {
                write!(f, "user {user_id} is already a member of board {board_id}")
            }
            Self::Conflict { attempts, message } => write!(
                f,
                "concurrent modification after {attempts} attempt(s): {message}"
            ),
            Self::InvariantViolation(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvariantViolation(err) | Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity, id } => Self::NotFound { entity, id },
            RepoError::Conflict(message) => Self::Conflict {
                attempts: 1,
                message,
            },
            RepoError::Duplicate { entity, .. } => {
                Self::InvalidInput(format!("{entity} already exists"))
            }
            RepoError::InvalidMove(message) => Self::InvalidOperation(message),
            RepoError::Validation(err) => Self::InvalidInput(err.to_string()),
            err @ RepoError::DensityViolation { .. } => Self::InvariantViolation(err),
            other => Self::Repo(other),
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(value: ValidationError) -> Self {
        Self::InvalidInput(value.to_string())
    }
}
