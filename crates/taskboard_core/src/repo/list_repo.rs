//! List repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist lists of a board and expose them in position order.
//! - Route create/move/delete through the position manager so the board's
//!   list positions stay dense.
//!
//! # Invariants
//! - Every position-changing write runs in one immediate transaction that
//!   locks the board row first and checks density before commit.

use super::position::{self, OrderedScope};
use super::{ensure_connection_ready, immediate_transaction, parse_uuid, RepoError, RepoResult};
use crate::model::list::{BoardList, ListPatch, NewList};
use crate::model::{BoardId, ListId};
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

const LIST_SELECT_SQL: &str = "SELECT
    id,
    board_id,
    title,
    color,
    position,
    created_at,
    updated_at
FROM lists";

/// Repository interface for board lists.
pub trait ListRepository {
    /// Inserts a list; `list.position` of `None` appends.
    fn create_list(&self, board_id: BoardId, list: &NewList) -> RepoResult<BoardList>;
    fn get_list(&self, list_id: ListId) -> RepoResult<Option<BoardList>>;
    /// Lists of `board_id` ordered by position.
    fn list_lists(&self, board_id: BoardId) -> RepoResult<Vec<BoardList>>;
    fn update_list(&self, list_id: ListId, patch: &ListPatch) -> RepoResult<BoardList>;
    /// Moves a list to `position` (clamped to `[1, N]`) within its board.
    fn move_list(&self, list_id: ListId, position: i64) -> RepoResult<BoardList>;
    /// Deletes a list with its tasks and compacts the board.
    fn delete_list(&self, list_id: ListId) -> RepoResult<()>;
    /// Board owning `list_id`.
    fn list_board_id(&self, list_id: ListId) -> RepoResult<BoardId>;
}

/// SQLite-backed list repository.
pub struct SqliteListRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteListRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["boards", "lists", "tasks"])?;
        Ok(Self { conn })
    }
}

impl ListRepository for SqliteListRepository<'_> {
    fn create_list(&self, board_id: BoardId, list: &NewList) -> RepoResult<BoardList> {
        let list_id = Uuid::new_v4();
        immediate_transaction(self.conn, |tx| {
            position::lock_parents(tx, OrderedScope::BoardLists, &[board_id])?;
            let position =
                position::reserve_slot(tx, OrderedScope::BoardLists, board_id, list.position)?;
            tx.execute(
                "INSERT INTO lists (id, board_id, title, color, position)
                 VALUES (?1, ?2, ?3, ?4, ?5);",
                params![
                    list_id.to_string(),
                    board_id.to_string(),
                    list.title,
                    list.color,
                    position,
                ],
            )?;
            position::check_density(tx, OrderedScope::BoardLists, board_id)
        })?;
        load_required_list(self.conn, list_id)
    }

    fn get_list(&self, list_id: ListId) -> RepoResult<Option<BoardList>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{LIST_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([list_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_list_row(row)?));
        }
        Ok(None)
    }

    fn list_lists(&self, board_id: BoardId) -> RepoResult<Vec<BoardList>> {
        let mut stmt = self.conn.prepare(&format!(
            "{LIST_SELECT_SQL} WHERE board_id = ?1 ORDER BY position ASC;"
        ))?;
        let mut rows = stmt.query([board_id.to_string()])?;
        let mut lists = Vec::new();
        while let Some(row) = rows.next()? {
            lists.push(parse_list_row(row)?);
        }
        Ok(lists)
    }

    fn update_list(&self, list_id: ListId, patch: &ListPatch) -> RepoResult<BoardList> {
        let changed = self.conn.execute(
            "UPDATE lists
             SET title = COALESCE(?2, title),
                 color = COALESCE(?3, color),
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![list_id.to_string(), patch.title, patch.color],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("list", list_id));
        }
        load_required_list(self.conn, list_id)
    }

    fn move_list(&self, list_id: ListId, position: i64) -> RepoResult<BoardList> {
        immediate_transaction(self.conn, |tx| {
            let placement = position::locate(tx, OrderedScope::BoardLists, list_id)?;
            position::lock_parents(tx, OrderedScope::BoardLists, &[placement.parent_id])?;
            position::move_within(
                tx,
                OrderedScope::BoardLists,
                placement.parent_id,
                list_id,
                position,
            )?;
            position::check_density(tx, OrderedScope::BoardLists, placement.parent_id)
        })?;
        load_required_list(self.conn, list_id)
    }

    fn delete_list(&self, list_id: ListId) -> RepoResult<()> {
        immediate_transaction(self.conn, |tx| {
            let placement = position::locate(tx, OrderedScope::BoardLists, list_id)?;
            position::lock_parents(tx, OrderedScope::BoardLists, &[placement.parent_id])?;
            let board_id = position::remove_and_compact(tx, OrderedScope::BoardLists, list_id)?;
            position::check_density(tx, OrderedScope::BoardLists, board_id)
        })
    }

    fn list_board_id(&self, list_id: ListId) -> RepoResult<BoardId> {
        position::locate(self.conn, OrderedScope::BoardLists, list_id)
            .map(|placement| placement.parent_id)
    }
}

fn load_required_list(conn: &Connection, list_id: ListId) -> RepoResult<BoardList> {
    let mut stmt = conn.prepare(&format!("{LIST_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([list_id.to_string()])?;
    if let Some(row) = rows.next()? {
        return parse_list_row(row);
    }
    Err(RepoError::not_found("list", list_id))
}

fn parse_list_row(row: &Row<'_>) -> RepoResult<BoardList> {
    let id: String = row.get("id")?;
    let board_id: String = row.get("board_id")?;
    Ok(BoardList {
        id: parse_uuid(&id, "lists.id")?,
        board_id: parse_uuid(&board_id, "lists.board_id")?,
        title: row.get("title")?,
        color: row.get("color")?,
        position: row.get("position")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
