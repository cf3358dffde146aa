//! Task and task comment repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist tasks, their assignees and comments.
//! - Route create/move/delete through the position manager so each list's
//!   task positions stay dense.
//!
//! # Invariants
//! - A cross-list move locks both lists in ascending id order and checks
//!   density of both before commit.
//! - `completed_at` is maintained here together with `is_completed`.
//! - Assignees are replaced as a whole set.

use super::position::{self, MoveTarget, OrderedScope};
use super::{
    bool_to_int, ensure_connection_ready, immediate_transaction, parse_bool, parse_uuid,
    RepoError, RepoResult,
};
use crate::model::task::{NewTask, Task, TaskComment, TaskPatch, TaskPriority};
use crate::model::{now_epoch_ms, CommentId, ListId, TaskId, UserId};
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

const TASK_SELECT_SQL: &str = "SELECT
    t.id AS id,
    t.list_id AS list_id,
    t.title AS title,
    t.description AS description,
    t.priority AS priority,
    t.due_at AS due_at,
    t.position AS position,
    t.is_completed AS is_completed,
    t.completed_at AS completed_at,
    t.created_by AS created_by,
    t.created_at AS created_at,
    t.updated_at AS updated_at
FROM tasks t";

const COMMENT_SELECT_SQL: &str = "SELECT
    id,
    task_id,
    author_id,
    content,
    created_at,
    updated_at
FROM task_comments";

/// Repository interface for tasks and comments.
pub trait TaskRepository {
    /// Inserts a task; `task.position` of `None` appends.
    fn create_task(&self, list_id: ListId, created_by: UserId, task: &NewTask)
        -> RepoResult<Task>;
    fn get_task(&self, task_id: TaskId) -> RepoResult<Option<Task>>;
    /// Tasks of `list_id` ordered by position.
    fn list_tasks(&self, list_id: ListId) -> RepoResult<Vec<Task>>;
    fn update_task(&self, task_id: TaskId, patch: &TaskPatch) -> RepoResult<Task>;
    /// Moves a task to `position` (clamped to `[1, N]`) within its list.
    fn move_task_within(&self, task_id: TaskId, position: i64) -> RepoResult<Task>;
    /// Moves a task into `to_list`, compacting the list it leaves.
    ///
    /// When the task already sits in `to_list` it is reordered in place:
    /// `At(p)` clamps to `[1, N]` and `Append` moves it to the end.
    fn move_task_to_list(
        &self,
        task_id: TaskId,
        to_list: ListId,
        target: MoveTarget,
    ) -> RepoResult<Task>;
    /// Deletes a task and compacts its list.
    fn delete_task(&self, task_id: TaskId) -> RepoResult<()>;
    /// Tasks `user_id` is assigned to, by due date then creation.
    fn list_tasks_assigned_to(&self, user_id: UserId) -> RepoResult<Vec<Task>>;
    /// List currently holding `task_id`.
    fn task_list_id(&self, task_id: TaskId) -> RepoResult<ListId>;
    fn add_comment(
        &self,
        task_id: TaskId,
        author_id: UserId,
        content: &str,
    ) -> RepoResult<TaskComment>;
    fn get_comment(&self, comment_id: CommentId) -> RepoResult<Option<TaskComment>>;
    /// Comments of `task_id`, oldest first.
    fn list_comments(&self, task_id: TaskId) -> RepoResult<Vec<TaskComment>>;
    fn delete_comment(&self, comment_id: CommentId) -> RepoResult<()>;
}

/// SQLite-backed task repository.
pub struct SqliteTaskRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTaskRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["lists", "tasks", "task_assignees", "task_comments"])?;
        Ok(Self { conn })
    }
}

impl TaskRepository for SqliteTaskRepository<'_> {
    fn create_task(
        &self,
        list_id: ListId,
        created_by: UserId,
        task: &NewTask,
    ) -> RepoResult<Task> {
        let task_id = Uuid::new_v4();
        immediate_transaction(self.conn, |tx| {
            position::lock_parents(tx, OrderedScope::ListTasks, &[list_id])?;
            let position =
                position::reserve_slot(tx, OrderedScope::ListTasks, list_id, task.position)?;
            tx.execute(
                "INSERT INTO tasks (
                    id, list_id, title, description, priority, due_at, position, created_by
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
                params![
                    task_id.to_string(),
                    list_id.to_string(),
                    task.title,
                    task.description,
                    task.priority.as_db(),
                    task.due_at,
                    position,
                    created_by.to_string(),
                ],
            )?;
            position::check_density(tx, OrderedScope::ListTasks, list_id)
        })?;
        load_required_task(self.conn, task_id)
    }

    fn get_task(&self, task_id: TaskId) -> RepoResult<Option<Task>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TASK_SELECT_SQL} WHERE t.id = ?1;"))?;
        let mut rows = stmt.query([task_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(with_assignees(self.conn, parse_task_row(row)?)?));
        }
        Ok(None)
    }

    fn list_tasks(&self, list_id: ListId) -> RepoResult<Vec<Task>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TASK_SELECT_SQL} WHERE t.list_id = ?1 ORDER BY t.position ASC;"
        ))?;
        let mut rows = stmt.query([list_id.to_string()])?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(parse_task_row(row)?);
        }
        tasks
            .into_iter()
            .map(|task| with_assignees(self.conn, task))
            .collect()
    }

    fn update_task(&self, task_id: TaskId, patch: &TaskPatch) -> RepoResult<Task> {
        immediate_transaction(self.conn, |tx| {
            let current = load_required_task(tx, task_id)?;

            let is_completed = patch.is_completed.unwrap_or(current.is_completed);
            let completed_at = match (current.is_completed, is_completed) {
                (false, true) => Some(now_epoch_ms()),
                (_, false) => None,
                (true, true) => current.completed_at,
            };

            tx.execute(
                "UPDATE tasks
                 SET title = ?2,
                     description = ?3,
                     priority = ?4,
                     due_at = ?5,
                     is_completed = ?6,
                     completed_at = ?7,
                     updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?1;",
                params![
                    task_id.to_string(),
                    patch.title.as_ref().unwrap_or(&current.title),
                    patch
                        .description
                        .as_ref()
                        .unwrap_or(&current.description),
                    patch.priority.unwrap_or(current.priority).as_db(),
                    patch.due_at.unwrap_or(current.due_at),
                    bool_to_int(is_completed),
                    completed_at,
                ],
            )?;

            if let Some(assignees) = &patch.assignees {
                tx.execute(
                    "DELETE FROM task_assignees WHERE task_id = ?1;",
                    [task_id.to_string()],
                )?;
                let mut insert = tx.prepare_cached(
                    "INSERT INTO task_assignees (task_id, user_id) VALUES (?1, ?2);",
                )?;
                for user_id in assignees {
                    insert.execute([task_id.to_string(), user_id.to_string()])?;
                }
            }
            Ok(())
        })?;
        load_required_task(self.conn, task_id)
    }

    fn move_task_within(&self, task_id: TaskId, position: i64) -> RepoResult<Task> {
        immediate_transaction(self.conn, |tx| {
            let placement = position::locate(tx, OrderedScope::ListTasks, task_id)?;
            position::lock_parents(tx, OrderedScope::ListTasks, &[placement.parent_id])?;
            position::move_within(
                tx,
                OrderedScope::ListTasks,
                placement.parent_id,
                task_id,
                position,
            )?;
            position::check_density(tx, OrderedScope::ListTasks, placement.parent_id)
        })?;
        load_required_task(self.conn, task_id)
    }

    fn move_task_to_list(
        &self,
        task_id: TaskId,
        to_list: ListId,
        target: MoveTarget,
    ) -> RepoResult<Task> {
        immediate_transaction(self.conn, |tx| {
            let placement = position::locate(tx, OrderedScope::ListTasks, task_id)?;
            if placement.parent_id == to_list {
                position::lock_parents(tx, OrderedScope::ListTasks, &[to_list])?;
                let requested = match target {
                    MoveTarget::At(requested) => requested,
                    MoveTarget::Append => {
                        position::sibling_count(tx, OrderedScope::ListTasks, to_list)?
                    }
                };
                position::move_within(tx, OrderedScope::ListTasks, to_list, task_id, requested)?;
                return position::check_density(tx, OrderedScope::ListTasks, to_list);
            }
            position::lock_parents(
                tx,
                OrderedScope::ListTasks,
                &[placement.parent_id, to_list],
            )?;
            position::move_across(
                tx,
                OrderedScope::ListTasks,
                task_id,
                placement.parent_id,
                to_list,
                target,
            )?;
            position::check_density(tx, OrderedScope::ListTasks, placement.parent_id)?;
            position::check_density(tx, OrderedScope::ListTasks, to_list)
        })?;
        load_required_task(self.conn, task_id)
    }

    fn delete_task(&self, task_id: TaskId) -> RepoResult<()> {
        immediate_transaction(self.conn, |tx| {
            let placement = position::locate(tx, OrderedScope::ListTasks, task_id)?;
            position::lock_parents(tx, OrderedScope::ListTasks, &[placement.parent_id])?;
            let list_id = position::remove_and_compact(tx, OrderedScope::ListTasks, task_id)?;
            position::check_density(tx, OrderedScope::ListTasks, list_id)
        })
    }

    fn list_tasks_assigned_to(&self, user_id: UserId) -> RepoResult<Vec<Task>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TASK_SELECT_SQL}
             JOIN task_assignees a ON a.task_id = t.id
             WHERE a.user_id = ?1
             ORDER BY t.due_at IS NULL ASC, t.due_at ASC, t.created_at ASC, t.id ASC;"
        ))?;
        let mut rows = stmt.query([user_id.to_string()])?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(parse_task_row(row)?);
        }
        tasks
            .into_iter()
            .map(|task| with_assignees(self.conn, task))
            .collect()
    }

    fn task_list_id(&self, task_id: TaskId) -> RepoResult<ListId> {
        position::locate(self.conn, OrderedScope::ListTasks, task_id)
            .map(|placement| placement.parent_id)
    }

    fn add_comment(
        &self,
        task_id: TaskId,
        author_id: UserId,
        content: &str,
    ) -> RepoResult<TaskComment> {
        let comment_id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO task_comments (id, task_id, author_id, content)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                comment_id.to_string(),
                task_id.to_string(),
                author_id.to_string(),
                content,
            ],
        )?;
        self.get_comment(comment_id)?
            .ok_or_else(|| RepoError::not_found("comment", comment_id))
    }

    fn get_comment(&self, comment_id: CommentId) -> RepoResult<Option<TaskComment>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{COMMENT_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([comment_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_comment_row(row)?));
        }
        Ok(None)
    }

    fn list_comments(&self, task_id: TaskId) -> RepoResult<Vec<TaskComment>> {
        let mut stmt = self.conn.prepare(&format!(
            "{COMMENT_SELECT_SQL} WHERE task_id = ?1 ORDER BY created_at ASC, rowid ASC;"
        ))?;
        let mut rows = stmt.query([task_id.to_string()])?;
        let mut comments = Vec::new();
        while let Some(row) = rows.next()? {
            comments.push(parse_comment_row(row)?);
        }
        Ok(comments)
    }

    fn delete_comment(&self, comment_id: CommentId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM task_comments WHERE id = ?1;",
            [comment_id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("comment", comment_id));
        }
        Ok(())
    }
}

fn load_required_task(conn: &Connection, task_id: TaskId) -> RepoResult<Task> {
    let mut stmt = conn.prepare(&format!("{TASK_SELECT_SQL} WHERE t.id = ?1;"))?;
    let mut rows = stmt.query([task_id.to_string()])?;
    if let Some(row) = rows.next()? {
        return with_assignees(conn, parse_task_row(row)?);
    }
    Err(RepoError::not_found("task", task_id))
}

fn with_assignees(conn: &Connection, mut task: Task) -> RepoResult<Task> {
    let mut stmt = conn.prepare_cached(
        "SELECT user_id FROM task_assignees WHERE task_id = ?1 ORDER BY user_id ASC;",
    )?;
    let raw = stmt
        .query_map([task.id.to_string()], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    task.assignees = raw
        .iter()
        .map(|value| parse_uuid(value, "task_assignees.user_id"))
        .collect::<RepoResult<Vec<_>>>()?;
    Ok(task)
}

fn parse_task_row(row: &Row<'_>) -> RepoResult<Task> {
    let id: String = row.get("id")?;
    let list_id: String = row.get("list_id")?;
    let created_by: String = row.get("created_by")?;
    let priority_text: String = row.get("priority")?;
    let priority = TaskPriority::from_db(&priority_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid priority `{priority_text}` in tasks.priority"))
    })?;

    Ok(Task {
        id: parse_uuid(&id, "tasks.id")?,
        list_id: parse_uuid(&list_id, "tasks.list_id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        priority,
        due_at: row.get("due_at")?,
        position: row.get("position")?,
        is_completed: parse_bool(row.get("is_completed")?, "tasks.is_completed")?,
        completed_at: row.get("completed_at")?,
        created_by: parse_uuid(&created_by, "tasks.created_by")?,
        assignees: Vec::new(),
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_comment_row(row: &Row<'_>) -> RepoResult<TaskComment> {
    let id: String = row.get("id")?;
    let task_id: String = row.get("task_id")?;
    let author_id: String = row.get("author_id")?;
    Ok(TaskComment {
        id: parse_uuid(&id, "task_comments.id")?,
        task_id: parse_uuid(&task_id, "task_comments.task_id")?,
        author_id: parse_uuid(&author_id, "task_comments.author_id")?,
        content: row.get("content")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
