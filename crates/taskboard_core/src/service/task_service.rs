//! Task and comment use-case service.
//!
//! # Responsibility
//! - Gate task operations to board members.
//! - Resolve move requests into a within-list or cross-list move.
//! - Validate assignees against board membership.
//!
//! # Invariants
//! - A task never leaves its board; the board check for every cross-list move
//!   lives in [`TaskService::move_task`].

use super::access::{require_manager, require_member};
use super::error::{ServiceError, ServiceResult};
use super::retry::with_retry;
use crate::config::RetryPolicy;
use crate::model::task::{
    normalize_comment, NewTask, Task, TaskComment, TaskMoveRequest, TaskPatch,
};
use crate::model::{now_epoch_ms, BoardId, CommentId, ListId, TaskId, UserId};
use crate::repo::board_repo::BoardRepository;
use crate::repo::list_repo::ListRepository;
use crate::repo::position::MoveTarget;
use crate::repo::task_repo::TaskRepository;
use log::{debug, info};

/// Task service facade.
pub struct TaskService<B: BoardRepository, L: ListRepository, T: TaskRepository> {
    boards: B,
    lists: L,
    tasks: T,
    retry: RetryPolicy,
}

impl<B, L, T> TaskService<B, L, T>
where
    B: BoardRepository,
    L: ListRepository,
    T: TaskRepository,
{
    pub fn new(boards: B, lists: L, tasks: T, retry: RetryPolicy) -> Self {
        Self {
            boards,
            lists,
            tasks,
            retry,
        }
    }

    /// Creates a task; without an explicit position it is appended.
    pub fn create_task(
        &self,
        actor: UserId,
        list_id: ListId,
        task: &NewTask,
    ) -> ServiceResult<Task> {
        let board_id = self.lists.list_board_id(list_id)?;
        require_member(&self.boards, board_id, actor)?;
        with_retry(&self.retry, "create_task", || {
            self.tasks.create_task(list_id, actor, task)
        })
    }

    pub fn get_task(&self, actor: UserId, task_id: TaskId) -> ServiceResult<Task> {
        let task = self
            .tasks
            .get_task(task_id)?
            .ok_or_else(|| ServiceError::not_found("task", task_id))?;
        let board_id = self.lists.list_board_id(task.list_id)?;
        require_member(&self.boards, board_id, actor)?;
        Ok(task)
    }

    /// Tasks of a list in position order.
    pub fn list_tasks(&self, actor: UserId, list_id: ListId) -> ServiceResult<Vec<Task>> {
        let board_id = self.lists.list_board_id(list_id)?;
        require_member(&self.boards, board_id, actor)?;
        Ok(self.tasks.list_tasks(list_id)?)
    }

    /// Open tasks of a list whose due date has passed.
    pub fn overdue_tasks(&self, actor: UserId, list_id: ListId) -> ServiceResult<Vec<Task>> {
        let now = now_epoch_ms();
        Ok(self
            .list_tasks(actor, list_id)?
            .into_iter()
            .filter(|task| task.is_overdue(now))
            .collect())
    }

    /// Applies a partial update. Assignees must all have access to the board.
    pub fn update_task(
        &self,
        actor: UserId,
        task_id: TaskId,
        patch: &TaskPatch,
    ) -> ServiceResult<Task> {
        let patch = patch.normalized()?;
        let (_, board_id) = self.locate_task(task_id)?;
        require_member(&self.boards, board_id, actor)?;

        if let Some(assignees) = &patch.assignees {
            for user_id in assignees {
                if self.boards.board_role(board_id, *user_id)?.is_none() {
                    return Err(ServiceError::InvalidInput(format!(
                        "assignee {user_id} is not a member of board {board_id}"
                    )));
                }
            }
        }

        with_retry(&self.retry, "update_task", || {
            self.tasks.update_task(task_id, &patch)
        })
    }

    pub fn set_completion(
        &self,
        actor: UserId,
        task_id: TaskId,
        is_completed: bool,
    ) -> ServiceResult<Task> {
        let patch = TaskPatch {
            is_completed: Some(is_completed),
            ..TaskPatch::default()
        };
        self.update_task(actor, task_id, &patch)
    }

    /// Flips the completion flag.
    pub fn toggle_completion(&self, actor: UserId, task_id: TaskId) -> ServiceResult<Task> {
        let task = self.get_task(actor, task_id)?;
        self.set_completion(actor, task_id, !task.is_completed)
    }

    /// Moves a task within its list or into another list of the same board.
    ///
    /// A `new_list` equal to the current list counts as a move within it.
    /// Within a list the position is clamped to `[1, N]`; across lists to
    /// `[1, N + 1]`, or appended when no position is given.
    pub fn move_task(
        &self,
        actor: UserId,
        task_id: TaskId,
        request: TaskMoveRequest,
    ) -> ServiceResult<Task> {
        if request.new_list.is_none() && request.new_position.is_none() {
            return Err(ServiceError::InvalidInput(
                "either a new list or a new position is required".to_string(),
            ));
        }

        let (current_list, board_id) = self.locate_task(task_id)?;
        require_member(&self.boards, board_id, actor)?;

        let target_list = request.new_list.unwrap_or(current_list);
        if target_list == current_list {
            let Some(position) = request.new_position else {
                return self.get_task(actor, task_id);
            };
            return with_retry(&self.retry, "move_task", || {
                self.tasks.move_task_within(task_id, position)
            });
        }

        let target_board = self.lists.list_board_id(target_list)?;
        if target_board != board_id {
            debug!(
                "event=task_move module=service status=error task={} from_board={} to_board={}",
                task_id, board_id, target_board
            );
            return Err(ServiceError::InvalidOperation(format!(
                "task {task_id} cannot move to list {target_list} on another board"
            )));
        }

        let target = MoveTarget::from(request.new_position);
        let task = with_retry(&self.retry, "move_task", || {
            self.tasks.move_task_to_list(task_id, target_list, target)
        })?;
        info!(
            "event=task_move module=service status=ok task={} from_list={} to_list={} position={}",
            task_id, current_list, target_list, task.position
        );
        Ok(task)
    }

    /// Deletes a task and closes the gap in its list.
    pub fn delete_task(&self, actor: UserId, task_id: TaskId) -> ServiceResult<()> {
        let (_, board_id) = self.locate_task(task_id)?;
        require_member(&self.boards, board_id, actor)?;
        with_retry(&self.retry, "delete_task", || self.tasks.delete_task(task_id))
    }

    /// Tasks assigned to `actor` on any board.
    pub fn my_tasks(&self, actor: UserId) -> ServiceResult<Vec<Task>> {
        Ok(self.tasks.list_tasks_assigned_to(actor)?)
    }

    pub fn add_comment(
        &self,
        actor: UserId,
        task_id: TaskId,
        content: &str,
    ) -> ServiceResult<TaskComment> {
        let content = normalize_comment(content)?;
        let (_, board_id) = self.locate_task(task_id)?;
        require_member(&self.boards, board_id, actor)?;
        Ok(self.tasks.add_comment(task_id, actor, &content)?)
    }

    /// Comments of a task, oldest first.
    pub fn list_comments(&self, actor: UserId, task_id: TaskId) -> ServiceResult<Vec<TaskComment>> {
        let (_, board_id) = self.locate_task(task_id)?;
        require_member(&self.boards, board_id, actor)?;
        Ok(self.tasks.list_comments(task_id)?)
    }

    /// Deletes a comment. Authors delete their own; managers delete any.
    pub fn delete_comment(&self, actor: UserId, comment_id: CommentId) -> ServiceResult<()> {
        let comment = self
            .tasks
            .get_comment(comment_id)?
            .ok_or_else(|| ServiceError::not_found("comment", comment_id))?;
        let (_, board_id) = self.locate_task(comment.task_id)?;
        if comment.author_id == actor {
            require_member(&self.boards, board_id, actor)?;
        } else {
            require_manager(&self.boards, board_id, actor)?;
        }
        Ok(self.tasks.delete_comment(comment_id)?)
    }

    fn locate_task(&self, task_id: TaskId) -> ServiceResult<(ListId, BoardId)> {
        let list_id = self.tasks.task_list_id(task_id)?;
        let board_id = self.lists.list_board_id(list_id)?;
        Ok((list_id, board_id))
    }
}
