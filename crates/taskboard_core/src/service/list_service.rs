//! List use-case service.
//!
//! # Responsibility
//! - Gate list writes to board owners and admins; reads to any member.
//! - Retry position-changing writes on transient conflict.

use super::access::{require_manager, require_member};
use super::error::{ServiceError, ServiceResult};
use super::retry::with_retry;
use crate::config::RetryPolicy;
use crate::model::list::{BoardList, ListPatch, NewList};
use crate::model::{BoardId, ListId, UserId};
use crate::repo::board_repo::BoardRepository;
use crate::repo::list_repo::ListRepository;

/// List service facade.
pub struct ListService<B: BoardRepository, L: ListRepository> {
    boards: B,
    lists: L,
    retry: RetryPolicy,
}

impl<B: BoardRepository, L: ListRepository> ListService<B, L> {
    pub fn new(boards: B, lists: L, retry: RetryPolicy) -> Self {
        Self {
            boards,
            lists,
            retry,
        }
    }

    /// Creates a list; without an explicit position it is appended.
    pub fn create_list(
        &self,
        actor: UserId,
        board_id: BoardId,
        list: &NewList,
    ) -> ServiceResult<BoardList> {
        require_manager(&self.boards, board_id, actor)?;
        with_retry(&self.retry, "create_list", || {
            self.lists.create_list(board_id, list)
        })
    }

    pub fn get_list(&self, actor: UserId, list_id: ListId) -> ServiceResult<BoardList> {
        let list = self
            .lists
            .get_list(list_id)?
            .ok_or_else(|| ServiceError::not_found("list", list_id))?;
        require_member(&self.boards, list.board_id, actor)?;
        Ok(list)
    }

    /// Lists of a board in position order.
    pub fn list_lists(&self, actor: UserId, board_id: BoardId) -> ServiceResult<Vec<BoardList>> {
        require_member(&self.boards, board_id, actor)?;
        Ok(self.lists.list_lists(board_id)?)
    }

    /// Changes title and/or color; position is untouched.
    pub fn update_list(
        &self,
        actor: UserId,
        list_id: ListId,
        patch: &ListPatch,
    ) -> ServiceResult<BoardList> {
        let patch = patch.normalized()?;
        let board_id = self.lists.list_board_id(list_id)?;
        require_manager(&self.boards, board_id, actor)?;
        if patch.is_empty() {
            return self.get_list(actor, list_id);
        }
        Ok(self.lists.update_list(list_id, &patch)?)
    }

    /// Moves a list within its board; `position` is clamped to `[1, N]`.
    pub fn move_list(
        &self,
        actor: UserId,
        list_id: ListId,
        position: i64,
    ) -> ServiceResult<BoardList> {
        let board_id = self.lists.list_board_id(list_id)?;
        require_manager(&self.boards, board_id, actor)?;
        with_retry(&self.retry, "move_list", || {
            self.lists.move_list(list_id, position)
        })
    }

    /// Deletes a list and its tasks, closing the gap it leaves.
    pub fn delete_list(&self, actor: UserId, list_id: ListId) -> ServiceResult<()> {
        let board_id = self.lists.list_board_id(list_id)?;
        require_manager(&self.boards, board_id, actor)?;
        with_retry(&self.retry, "delete_list", || self.lists.delete_list(list_id))
    }
}
