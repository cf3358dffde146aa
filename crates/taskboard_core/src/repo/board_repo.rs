//! User, board and membership repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist the collaborators the position manager depends on: users,
//!   boards and board memberships.
//! - Answer the access question "what is this user's role on this board".
//!
//! # Invariants
//! - A new board is committed together with its default lists at
//!   positions `1..=3`.
//! - Every stored membership is active; the owner is never stored as one.

use super::position::{self, OrderedScope};
use super::{
    bool_to_int, ensure_connection_ready, immediate_transaction, insert_error, parse_bool,
    parse_uuid, RepoError, RepoResult,
};
use crate::model::board::{
    Board, BoardDraft, BoardMembership, BoardRole, MemberRole, NewUser, User,
    DEFAULT_LIST_TITLES,
};
use crate::model::list::DEFAULT_LIST_COLOR;
use crate::model::{BoardId, UserId};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

const BOARD_SELECT_SQL: &str = "SELECT
    b.id AS id,
    b.title AS title,
    b.description AS description,
    b.color AS color,
    b.owner_id AS owner_id,
    b.is_public AS is_public,
    b.created_at AS created_at,
    b.updated_at AS updated_at
FROM boards b";

const MEMBERSHIP_SELECT_SQL: &str = "SELECT
    board_id,
    user_id,
    role,
    invited_by,
    created_at
FROM board_memberships";

/// Repository interface for users, boards and memberships.
pub trait BoardRepository {
    fn create_user(&self, user: &NewUser) -> RepoResult<User>;
    fn get_user(&self, user_id: UserId) -> RepoResult<Option<User>>;
    /// Creates a board owned by `owner_id` and seeds its default lists.
    fn create_board(&self, owner_id: UserId, draft: &BoardDraft) -> RepoResult<Board>;
    fn get_board(&self, board_id: BoardId) -> RepoResult<Option<Board>>;
    /// Boards owned by or shared with `user_id`, oldest first.
    fn list_boards_for_user(&self, user_id: UserId) -> RepoResult<Vec<Board>>;
    /// Boards flagged public, newest first.
    fn list_public_boards(&self) -> RepoResult<Vec<Board>>;
    fn update_board(&self, board_id: BoardId, draft: &BoardDraft) -> RepoResult<Board>;
    /// Deletes a board with its lists, tasks and memberships.
    fn delete_board(&self, board_id: BoardId) -> RepoResult<()>;
    fn count_owned_boards(&self, user_id: UserId) -> RepoResult<u32>;
    fn add_membership(
        &self,
        board_id: BoardId,
        user_id: UserId,
        role: MemberRole,
        invited_by: UserId,
    ) -> RepoResult<BoardMembership>;
    fn get_membership(
        &self,
        board_id: BoardId,
        user_id: UserId,
    ) -> RepoResult<Option<BoardMembership>>;
    fn list_memberships(&self, board_id: BoardId) -> RepoResult<Vec<BoardMembership>>;
    fn remove_membership(&self, board_id: BoardId, user_id: UserId) -> RepoResult<()>;
    fn count_members(&self, board_id: BoardId) -> RepoResult<u32>;
    fn count_memberships(&self, user_id: UserId) -> RepoResult<u32>;
    /// Effective role, or `None` when the user has no access.
    fn board_role(&self, board_id: BoardId, user_id: UserId) -> RepoResult<Option<BoardRole>>;
}

/// SQLite-backed board repository.
pub struct SqliteBoardRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteBoardRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["users", "boards", "board_memberships", "lists"])?;
        Ok(Self { conn })
    }
}

impl BoardRepository for SqliteBoardRepository<'_> {
    fn create_user(&self, user: &NewUser) -> RepoResult<User> {
        let user_id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO users (id, username, email) VALUES (?1, ?2, ?3);",
            params![user_id.to_string(), user.username, user.email],
        )
        .map_err(|err| insert_error("user", err))?;
        self.get_user(user_id)?
            .ok_or_else(|| RepoError::not_found("user", user_id))
    }

    fn get_user(&self, user_id: UserId) -> RepoResult<Option<User>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, username, email, created_at FROM users WHERE id = ?1;",
                [user_id.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                },
            )
            .optional()?;
        row.map(|(id, username, email, created_at)| {
            Ok(User {
                id: parse_uuid(&id, "users.id")?,
                username,
                email,
                created_at,
            })
        })
        .transpose()
    }

    fn create_board(&self, owner_id: UserId, draft: &BoardDraft) -> RepoResult<Board> {
        let board_id = Uuid::new_v4();
        immediate_transaction(self.conn, |tx| {
            tx.execute(
                "INSERT INTO boards (id, title, description, color, owner_id, is_public)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
                params![
                    board_id.to_string(),
                    draft.title,
                    draft.description,
                    draft.color,
                    owner_id.to_string(),
                    bool_to_int(draft.is_public),
                ],
            )?;
            for title in DEFAULT_LIST_TITLES {
                let position = position::next_position(tx, OrderedScope::BoardLists, board_id)?;
                tx.execute(
                    "INSERT INTO lists (id, board_id, title, color, position)
                     VALUES (?1, ?2, ?3, ?4, ?5);",
                    params![
                        Uuid::new_v4().to_string(),
                        board_id.to_string(),
                        title,
                        DEFAULT_LIST_COLOR,
                        position,
                    ],
                )?;
            }
            Ok(())
        })?;
        load_required_board(self.conn, board_id)
    }

    fn get_board(&self, board_id: BoardId) -> RepoResult<Option<Board>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{BOARD_SELECT_SQL} WHERE b.id = ?1;"))?;
        let mut rows = stmt.query([board_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_board_row(row)?));
        }
        Ok(None)
    }

    fn list_boards_for_user(&self, user_id: UserId) -> RepoResult<Vec<Board>> {
        let mut stmt = self.conn.prepare(&format!(
            "{BOARD_SELECT_SQL}
             WHERE b.owner_id = ?1
                OR EXISTS (
                    SELECT 1
                    FROM board_memberships m
                    WHERE m.board_id = b.id
                      AND m.user_id = ?1
                )
             ORDER BY b.created_at ASC, b.id ASC;"
        ))?;
        let mut rows = stmt.query([user_id.to_string()])?;
        let mut boards = Vec::new();
        while let Some(row) = rows.next()? {
            boards.push(parse_board_row(row)?);
        }
        Ok(boards)
    }

    fn list_public_boards(&self) -> RepoResult<Vec<Board>> {
        let mut stmt = self.conn.prepare(&format!(
            "{BOARD_SELECT_SQL}
             WHERE b.is_public = 1
             ORDER BY b.created_at DESC, b.id DESC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut boards = Vec::new();
        while let Some(row) = rows.next()? {
            boards.push(parse_board_row(row)?);
        }
        Ok(boards)
    }

    fn update_board(&self, board_id: BoardId, draft: &BoardDraft) -> RepoResult<Board> {
        let changed = self.conn.execute(
            "UPDATE boards
             SET title = ?2,
                 description = ?3,
                 color = ?4,
                 is_public = ?5,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![
                board_id.to_string(),
                draft.title,
                draft.description,
                draft.color,
                bool_to_int(draft.is_public),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("board", board_id));
        }
        load_required_board(self.conn, board_id)
    }

    fn delete_board(&self, board_id: BoardId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM boards WHERE id = ?1;", [board_id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::not_found("board", board_id));
        }
        Ok(())
    }

    fn count_owned_boards(&self, user_id: UserId) -> RepoResult<u32> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM boards WHERE owner_id = ?1;",
            [user_id.to_string()],
            |row| row.get(0),
        )?)
    }

    fn add_membership(
        &self,
        board_id: BoardId,
        user_id: UserId,
        role: MemberRole,
        invited_by: UserId,
    ) -> RepoResult<BoardMembership> {
        self.conn.execute(
            "INSERT INTO board_memberships (board_id, user_id, role, invited_by)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                board_id.to_string(),
                user_id.to_string(),
                role.as_db(),
                invited_by.to_string(),
            ],
        )
        .map_err(|err| insert_error("membership", err))?;
        self.get_membership(board_id, user_id)?
            .ok_or_else(|| RepoError::not_found("membership", user_id))
    }

    fn get_membership(
        &self,
        board_id: BoardId,
        user_id: UserId,
    ) -> RepoResult<Option<BoardMembership>> {
        let mut stmt = self.conn.prepare(&format!(
            "{MEMBERSHIP_SELECT_SQL} WHERE board_id = ?1 AND user_id = ?2;"
        ))?;
        let mut rows = stmt.query([board_id.to_string(), user_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_membership_row(row)?));
        }
        Ok(None)
    }

    fn list_memberships(&self, board_id: BoardId) -> RepoResult<Vec<BoardMembership>> {
        let mut stmt = self.conn.prepare(&format!(
            "{MEMBERSHIP_SELECT_SQL} WHERE board_id = ?1 ORDER BY created_at ASC, user_id ASC;"
        ))?;
        let mut rows = stmt.query([board_id.to_string()])?;
        let mut memberships = Vec::new();
        while let Some(row) = rows.next()? {
            memberships.push(parse_membership_row(row)?);
        }
        Ok(memberships)
    }

    fn remove_membership(&self, board_id: BoardId, user_id: UserId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM board_memberships WHERE board_id = ?1 AND user_id = ?2;",
            [board_id.to_string(), user_id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("membership", user_id));
        }
        Ok(())
    }

    fn count_members(&self, board_id: BoardId) -> RepoResult<u32> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*)
             FROM board_memberships
             WHERE board_id = ?1;",
            [board_id.to_string()],
            |row| row.get(0),
        )?)
    }

    fn count_memberships(&self, user_id: UserId) -> RepoResult<u32> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*)
             FROM board_memberships
             WHERE user_id = ?1;",
            [user_id.to_string()],
            |row| row.get(0),
        )?)
    }

    fn board_role(&self, board_id: BoardId, user_id: UserId) -> RepoResult<Option<BoardRole>> {
        let row: Option<(String, Option<String>)> = self
            .conn
            .query_row(
                "SELECT b.owner_id, m.role
                 FROM boards b
                 LEFT JOIN board_memberships m
                   ON m.board_id = b.id
                  AND m.user_id = ?2
                 WHERE b.id = ?1;",
                [board_id.to_string(), user_id.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((owner_id, member_role)) = row else {
            return Err(RepoError::not_found("board", board_id));
        };
        if parse_uuid(&owner_id, "boards.owner_id")? == user_id {
            return Ok(Some(BoardRole::Owner));
        }
        member_role
            .map(|value| {
                MemberRole::from_db(&value).map(BoardRole::from).ok_or_else(|| {
                    RepoError::InvalidData(format!(
                        "invalid role `{value}` in board_memberships.role"
                    ))
                })
            })
            .transpose()
    }
}

fn load_required_board(conn: &Connection, board_id: BoardId) -> RepoResult<Board> {
    let mut stmt = conn.prepare(&format!("{BOARD_SELECT_SQL} WHERE b.id = ?1;"))?;
    let mut rows = stmt.query([board_id.to_string()])?;
    if let Some(row) = rows.next()? {
        return parse_board_row(row);
    }
    Err(RepoError::not_found("board", board_id))
}

fn parse_board_row(row: &Row<'_>) -> RepoResult<Board> {
    let id: String = row.get("id")?;
    let owner_id: String = row.get("owner_id")?;
    Ok(Board {
        id: parse_uuid(&id, "boards.id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        color: row.get("color")?,
        owner_id: parse_uuid(&owner_id, "boards.owner_id")?,
        is_public: parse_bool(row.get("is_public")?, "boards.is_public")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_membership_row(row: &Row<'_>) -> RepoResult<BoardMembership> {
    let board_id: String = row.get("board_id")?;
    let user_id: String = row.get("user_id")?;
    let invited_by: String = row.get("invited_by")?;
    let role_text: String = row.get("role")?;
    Ok(BoardMembership {
        board_id: parse_uuid(&board_id, "board_memberships.board_id")?,
        user_id: parse_uuid(&user_id, "board_memberships.user_id")?,
        role: MemberRole::from_db(&role_text).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid role `{role_text}` in board_memberships.role"
            ))
        })?,
        invited_by: parse_uuid(&invited_by, "board_memberships.invited_by")?,
        created_at: row.get("created_at")?,
    })
}
