//! Board role checks shared by services.

use super::error::{ServiceError, ServiceResult};
use crate::model::board::BoardRole;
use crate::model::{BoardId, UserId};
use crate::repo::board_repo::BoardRepository;

/// Returns the acting user's role when it is at least `required`.
pub(crate) fn require_role<B: BoardRepository>(
    boards: &B,
    board_id: BoardId,
    user_id: UserId,
    required: BoardRole,
) -> ServiceResult<BoardRole> {
    match boards.board_role(board_id, user_id)? {
        Some(role) if role >= required => Ok(role),
        _ => Err(ServiceError::PermissionDenied {
            user_id,
            board_id,
            required,
        }),
    }
}

/// Any member or the owner.
pub(crate) fn require_member<B: BoardRepository>(
    boards: &B,
    board_id: BoardId,
    user_id: UserId,
) -> ServiceResult<BoardRole> {
    require_role(boards, board_id, user_id, BoardRole::Member)
}

/// Owner or admin.
pub(crate) fn require_manager<B: BoardRepository>(
    boards: &B,
    board_id: BoardId,
    user_id: UserId,
) -> ServiceResult<BoardRole> {
    require_role(boards, board_id, user_id, BoardRole::Admin)
}
