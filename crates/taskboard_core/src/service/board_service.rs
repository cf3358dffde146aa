//! Board, user and membership use-case service.
//!
//! # Responsibility
//! - Enforce per-user and per-board quotas from [`BoardLimits`].
//! - Gate board administration and membership changes by role.
//!
//! # Invariants
//! - The acting user is an explicit argument of every operation.
//! - Only the owner deletes a board or grants the admin role.

use super::access::{require_manager, require_member, require_role};
use super::error::{ServiceError, ServiceResult};
use super::retry::{with_retry, with_retry_or};
use crate::config::{BoardLimits, RetryPolicy};
use crate::model::board::{
    Board, BoardDraft, BoardMembership, BoardRole, MemberRole, NewUser, User,
};
use crate::model::{BoardId, UserId};
use crate::repo::board_repo::BoardRepository;
use crate::repo::RepoError;
use log::info;

/// Board and membership service facade.
pub struct BoardService<B: BoardRepository> {
    boards: B,
    limits: BoardLimits,
    retry: RetryPolicy,
}

impl<B: BoardRepository> BoardService<B> {
    /// Creates service from repository implementation and explicit config.
    pub fn new(boards: B, limits: BoardLimits, retry: RetryPolicy) -> Self {
        Self {
            boards,
            limits,
            retry,
        }
    }

    /// Registers a collaborator record.
    pub fn create_user(&self, username: &str, email: &str) -> ServiceResult<User> {
        let user = NewUser::new(username, email)?;
        with_retry_or(
            &self.retry,
            "create_user",
            || self.boards.create_user(&user),
            |err| match err {
                RepoError::Duplicate { .. } => {
                    ServiceError::InvalidInput("username or email already taken".to_string())
                }
                other => other.into(),
            },
        )
    }

    pub fn get_user(&self, user_id: UserId) -> ServiceResult<User> {
        self.boards
            .get_user(user_id)?
            .ok_or_else(|| ServiceError::not_found("user", user_id))
    }

    /// Creates a board owned by `actor`, seeded with the default lists.
    pub fn create_board(&self, actor: UserId, draft: &BoardDraft) -> ServiceResult<Board> {
        let draft = draft.normalized()?;
        self.get_user(actor)?;

        let owned = self.boards.count_owned_boards(actor)?;
        if owned >= self.limits.max_boards_per_user {
            return Err(ServiceError::LimitExceeded {
                limit: "max_boards_per_user",
                max: self.limits.max_boards_per_user,
            });
        }

        let board = with_retry(&self.retry, "create_board", || {
            self.boards.create_board(actor, &draft)
        })?;
        info!(
            "event=board_create module=service status=ok board={} owner={}",
            board.id, actor
        );
        Ok(board)
    }

    pub fn get_board(&self, actor: UserId, board_id: BoardId) -> ServiceResult<Board> {
        require_member(&self.boards, board_id, actor)?;
        self.boards
            .get_board(board_id)?
            .ok_or_else(|| ServiceError::not_found("board", board_id))
    }

    /// Boards owned by or shared with `actor`.
    pub fn list_boards(&self, actor: UserId) -> ServiceResult<Vec<Board>> {
        Ok(self.boards.list_boards_for_user(actor)?)
    }

    /// Public boards, newest first. Any registered user may browse them.
    pub fn list_public_boards(&self, actor: UserId) -> ServiceResult<Vec<Board>> {
        self.get_user(actor)?;
        Ok(self.boards.list_public_boards()?)
    }

    pub fn update_board(
        &self,
        actor: UserId,
        board_id: BoardId,
        draft: &BoardDraft,
    ) -> ServiceResult<Board> {
        let draft = draft.normalized()?;
        require_manager(&self.boards, board_id, actor)?;
        Ok(self.boards.update_board(board_id, &draft)?)
    }

    /// Deletes a board with all of its lists, tasks and memberships.
    pub fn delete_board(&self, actor: UserId, board_id: BoardId) -> ServiceResult<()> {
        require_role(&self.boards, board_id, actor, BoardRole::Owner)?;
        self.boards.delete_board(board_id)?;
        info!(
            "event=board_delete module=service status=ok board={} actor={}",
            board_id, actor
        );
        Ok(())
    }

    /// Adds `user_id` to the board as a member with `role`.
    ///
    /// Admins may add members; only the owner may add admins.
    pub fn add_member(
        &self,
        actor: UserId,
        board_id: BoardId,
        user_id: UserId,
        role: MemberRole,
    ) -> ServiceResult<BoardMembership> {
        let required = match role {
            MemberRole::Admin => BoardRole::Owner,
            MemberRole::Member => BoardRole::Admin,
        };
        require_role(&self.boards, board_id, actor, required)?;
        self.get_user(user_id)?;

        let already_member = self.boards.board_role(board_id, user_id)?.is_some()
            || self.boards.get_membership(board_id, user_id)?.is_some();
        if already_member {
            return Err(ServiceError::AlreadyMember { board_id, user_id });
        }

        if self.boards.count_members(board_id)? >= self.limits.max_members_per_board {
            return Err(ServiceError::LimitExceeded {
                limit: "max_members_per_board",
                max: self.limits.max_members_per_board,
            });
        }
        if self.boards.count_memberships(user_id)?
            >= self.limits.max_memberships_per_user
        {
            return Err(ServiceError::LimitExceeded {
                limit: "max_memberships_per_user",
                max: self.limits.max_memberships_per_user,
            });
        }

        let membership = with_retry_or(
            &self.retry,
            "add_member",
            || self.boards.add_membership(board_id, user_id, role, actor),
            |err| match err {
                RepoError::Duplicate { .. } => ServiceError::AlreadyMember { board_id, user_id },
                other => other.into(),
            },
        )?;
        info!(
            "event=member_add module=service status=ok board={} user={} role={}",
            board_id,
            user_id,
            role.as_db()
        );
        Ok(membership)
    }

    /// Removes a membership. Managers remove anyone; members may leave.
    pub fn remove_member(
        &self,
        actor: UserId,
        board_id: BoardId,
        user_id: UserId,
    ) -> ServiceResult<()> {
        if actor == user_id {
            require_member(&self.boards, board_id, actor)?;
        } else {
            require_manager(&self.boards, board_id, actor)?;
        }
        self.boards.remove_membership(board_id, user_id)?;
        Ok(())
    }

    pub fn list_members(
        &self,
        actor: UserId,
        board_id: BoardId,
    ) -> ServiceResult<Vec<BoardMembership>> {
        require_member(&self.boards, board_id, actor)?;
        Ok(self.boards.list_memberships(board_id)?)
    }

    /// Effective role of `user_id`, `None` without access.
    pub fn role_of(&self, board_id: BoardId, user_id: UserId) -> ServiceResult<Option<BoardRole>> {
        Ok(self.boards.board_role(board_id, user_id)?)
    }
}
