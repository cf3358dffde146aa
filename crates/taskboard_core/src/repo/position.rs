//! Ordered-collection position manager.
//!
//! # Responsibility
//! - Assign, shift and relocate 1-based positions of siblings under one
//!   parent, for both board→lists and list→tasks.
//! - Never produce a transient duplicate `(parent, position)` pair, since
//!   SQLite checks `UNIQUE` row by row during a multi-row `UPDATE`.
//!
//! # Invariants
//! - At every commit the positions under a parent are exactly `1..=N`.
//! - Callers run these primitives inside [`super::immediate_transaction`]
//!   after [`lock_parents`]; nothing here begins or commits a transaction.
//! - A moving item is parked on a scratch slot (`max + count + 1`) before any
//!   sibling shifts, so every shift lands on a slot that was just vacated.
//! - Out-of-range targets are clamped, never rejected.

use super::{parse_uuid, RepoError, RepoResult};
use log::{debug, error};
use rusqlite::{params, Connection, OptionalExtension};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// One parent/child relationship whose children share a position sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderedScope {
    /// Lists ordered within a board.
    BoardLists,
    /// Tasks ordered within a list.
    ListTasks,
}

impl OrderedScope {
    /// Entity name of the ordered children, used in `NotFound` errors.
    pub fn child_entity(self) -> &'static str {
        match self {
            Self::BoardLists => "list",
            Self::ListTasks => "task",
        }
    }

    /// Entity name of the parent scope.
    pub fn parent_entity(self) -> &'static str {
        match self {
            Self::BoardLists => "board",
            Self::ListTasks => "list",
        }
    }

    fn child_table(self) -> &'static str {
        match self {
            Self::BoardLists => "lists",
            Self::ListTasks => "tasks",
        }
    }

    fn parent_table(self) -> &'static str {
        match self {
            Self::BoardLists => "boards",
            Self::ListTasks => "lists",
        }
    }

    fn parent_column(self) -> &'static str {
        match self {
            Self::BoardLists => "board_id",
            Self::ListTasks => "list_id",
        }
    }
}

impl Display for OrderedScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BoardLists => write!(f, "board_lists"),
            Self::ListTasks => write!(f, "list_tasks"),
        }
    }
}

/// Where an item lands in its new parent on a cross-parent move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveTarget {
    /// After the current last sibling.
    Append,
    /// At this position, clamped to `[1, N + 1]`.
    At(i64),
}

impl From<Option<i64>> for MoveTarget {
    fn from(value: Option<i64>) -> Self {
        value.map_or(Self::Append, Self::At)
    }
}

/// Direction of a one-slot sibling shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shift {
    /// `position - 1`, applied in ascending position order.
    Down,
    /// `position + 1`, applied in descending position order.
    Up,
}

impl Shift {
    fn delta(self) -> i64 {
        match self {
            Self::Down => -1,
            Self::Up => 1,
        }
    }

    fn order(self) -> &'static str {
        match self {
            Self::Down => "ASC",
            Self::Up => "DESC",
        }
    }
}

/// Current parent and position of one ordered item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub parent_id: Uuid,
    pub position: i64,
}

/// Clamps `requested` into `[1, upper]`; an empty range collapses to 1.
pub fn clamp_position(requested: i64, upper: i64) -> i64 {
    requested.clamp(1, upper.max(1))
}

/// Loads the current placement of `item_id`.
pub fn locate(conn: &Connection, scope: OrderedScope, item_id: Uuid) -> RepoResult<Placement> {
    let sql = format!(
        "SELECT {parent}, position FROM {table} WHERE id = ?1;",
        parent = scope.parent_column(),
        table = scope.child_table(),
    );
    let row: Option<(String, i64)> = conn
        .query_row(&sql, [item_id.to_string()], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .optional()?;
    let (parent_text, position) =
        row.ok_or_else(|| RepoError::not_found(scope.child_entity(), item_id))?;
    Ok(Placement {
        parent_id: parse_uuid(&parent_text, "position parent column")?,
        position,
    })
}

/// Takes the write lock on each parent row in ascending id order.
///
/// Also proves every parent exists. Sorting gives all writers one global
/// acquisition order, so two opposite cross-parent moves cannot deadlock.
pub fn lock_parents(conn: &Connection, scope: OrderedScope, parents: &[Uuid]) -> RepoResult<()> {
    let mut ordered = parents.to_vec();
    ordered.sort();
    ordered.dedup();

    let sql = format!(
        "UPDATE {table} SET updated_at = updated_at WHERE id = ?1;",
        table = scope.parent_table(),
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    for parent_id in ordered {
        if stmt.execute([parent_id.to_string()])? == 0 {
            return Err(RepoError::not_found(scope.parent_entity(), parent_id));
        }
    }
    Ok(())
}

/// Number of children under `parent_id`.
pub fn sibling_count(conn: &Connection, scope: OrderedScope, parent_id: Uuid) -> RepoResult<i64> {
    let sql = format!(
        "SELECT COUNT(*) FROM {table} WHERE {parent} = ?1;",
        table = scope.child_table(),
        parent = scope.parent_column(),
    );
    Ok(conn.query_row(&sql, [parent_id.to_string()], |row| row.get(0))?)
}

/// Highest child position under `parent_id`, `None` when empty.
pub fn max_position(
    conn: &Connection,
    scope: OrderedScope,
    parent_id: Uuid,
) -> RepoResult<Option<i64>> {
    let sql = format!(
        "SELECT MAX(position) FROM {table} WHERE {parent} = ?1;",
        table = scope.child_table(),
        parent = scope.parent_column(),
    );
    Ok(conn.query_row(&sql, [parent_id.to_string()], |row| row.get(0))?)
}

/// Append slot: `max + 1`, or 1 for an empty parent.
pub fn next_position(conn: &Connection, scope: OrderedScope, parent_id: Uuid) -> RepoResult<i64> {
    Ok(max_position(conn, scope, parent_id)?.unwrap_or(0) + 1)
}

/// A position strictly greater than every live position under `parent_id`.
pub fn scratch_position(
    conn: &Connection,
    scope: OrderedScope,
    parent_id: Uuid,
) -> RepoResult<i64> {
    let max = max_position(conn, scope, parent_id)?.unwrap_or(0);
    let count = sibling_count(conn, scope, parent_id)?;
    Ok(max + count + 1)
}

/// Moves every sibling with `from <= position <= to` by one slot.
///
/// `to = None` means unbounded above. Rows are updated one at a time in the
/// order given by `shift`, which only works when the slot next to the range
/// in the direction of travel is already free.
pub fn shift_positions(
    conn: &Connection,
    scope: OrderedScope,
    parent_id: Uuid,
    from: i64,
    to: Option<i64>,
    shift: Shift,
) -> RepoResult<usize> {
    let upper = to.unwrap_or(i64::MAX);
    if from > upper {
        return Ok(0);
    }

    let select_sql = format!(
        "SELECT id FROM {table}
         WHERE {parent} = ?1 AND position >= ?2 AND position <= ?3
         ORDER BY position {order};",
        table = scope.child_table(),
        parent = scope.parent_column(),
        order = shift.order(),
    );
    let mut select = conn.prepare_cached(&select_sql)?;
    let ids = select
        .query_map(params![parent_id.to_string(), from, upper], |row| {
            row.get::<_, String>(0)
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let update_sql = format!(
        "UPDATE {table}
         SET position = position + ?2,
             updated_at = (strftime('%s', 'now') * 1000)
         WHERE id = ?1;",
        table = scope.child_table(),
    );
    let mut update = conn.prepare_cached(&update_sql)?;
    for id in &ids {
        update.execute(params![id, shift.delta()])?;
    }
    Ok(ids.len())
}

/// Writes a new position for `item_id` without touching siblings.
pub fn set_position(
    conn: &Connection,
    scope: OrderedScope,
    item_id: Uuid,
    position: i64,
) -> RepoResult<()> {
    let sql = format!(
        "UPDATE {table}
         SET position = ?2,
             updated_at = (strftime('%s', 'now') * 1000)
         WHERE id = ?1;",
        table = scope.child_table(),
    );
    if conn.execute(&sql, params![item_id.to_string(), position])? == 0 {
        return Err(RepoError::not_found(scope.child_entity(), item_id));
    }
    Ok(())
}

/// Reassigns parent and position of `item_id` in one write.
pub fn set_parent_and_position(
    conn: &Connection,
    scope: OrderedScope,
    item_id: Uuid,
    parent_id: Uuid,
    position: i64,
) -> RepoResult<()> {
    let sql = format!(
        "UPDATE {table}
         SET {parent} = ?2,
             position = ?3,
             updated_at = (strftime('%s', 'now') * 1000)
         WHERE id = ?1;",
        table = scope.child_table(),
        parent = scope.parent_column(),
    );
    let changed = conn.execute(
        &sql,
        params![item_id.to_string(), parent_id.to_string(), position],
    )?;
    if changed == 0 {
        return Err(RepoError::not_found(scope.child_entity(), item_id));
    }
    Ok(())
}

/// Chooses the position for a child about to be inserted under `parent_id`.
///
/// `None` appends. `Some(p)` is clamped to `[1, N + 1]` and every sibling at
/// or above it moves up one slot, leaving the returned position free.
pub fn reserve_slot(
    conn: &Connection,
    scope: OrderedScope,
    parent_id: Uuid,
    requested: Option<i64>,
) -> RepoResult<i64> {
    match requested {
        None => next_position(conn, scope, parent_id),
        Some(requested) => {
            let count = sibling_count(conn, scope, parent_id)?;
            let position = clamp_position(requested, count + 1);
            shift_positions(conn, scope, parent_id, position, None, Shift::Up)?;
            Ok(position)
        }
    }
}

/// Moves `item_id` to `requested` within `parent_id` and returns the final
/// position.
///
/// Three phases: park on a scratch slot, shift the siblings between the old
/// and new slot by one, land on the target.
pub fn move_within(
    conn: &Connection,
    scope: OrderedScope,
    parent_id: Uuid,
    item_id: Uuid,
    requested: i64,
) -> RepoResult<i64> {
    let current = locate(conn, scope, item_id)?;
    if current.parent_id != parent_id {
        return Err(RepoError::Conflict(format!(
            "{} {item_id} left {} {parent_id} before the move",
            scope.child_entity(),
            scope.parent_entity()
        )));
    }

    let count = sibling_count(conn, scope, parent_id)?;
    let target = clamp_position(requested, count);
    if target == current.position {
        return Ok(target);
    }

    let scratch = scratch_position(conn, scope, parent_id)?;
    set_position(conn, scope, item_id, scratch)?;

    if target > current.position {
        shift_positions(
            conn,
            scope,
            parent_id,
            current.position + 1,
            Some(target),
            Shift::Down,
        )?;
    } else {
        shift_positions(
            conn,
            scope,
            parent_id,
            target,
            Some(current.position - 1),
            Shift::Up,
        )?;
    }

    set_position(conn, scope, item_id, target)?;
    debug!(
        "event=position_move module=position status=ok scope={} item={} parent={} from={} to={}",
        scope, item_id, parent_id, current.position, target
    );
    Ok(target)
}

/// Moves `item_id` from `from_parent` into `to_parent` and returns its new
/// position.
///
/// The old parent is compacted before the new parent opens a slot. Callers
/// must hold the locks of both parents.
pub fn move_across(
    conn: &Connection,
    scope: OrderedScope,
    item_id: Uuid,
    from_parent: Uuid,
    to_parent: Uuid,
    target: MoveTarget,
) -> RepoResult<i64> {
    if from_parent == to_parent {
        return Err(RepoError::InvalidMove(format!(
            "{} {item_id} already belongs to {} {to_parent}",
            scope.child_entity(),
            scope.parent_entity()
        )));
    }

    let current = locate(conn, scope, item_id)?;
    if current.parent_id != from_parent {
        return Err(RepoError::Conflict(format!(
            "{} {item_id} left {} {from_parent} before the move",
            scope.child_entity(),
            scope.parent_entity()
        )));
    }

    let scratch = scratch_position(conn, scope, from_parent)?;
    set_position(conn, scope, item_id, scratch)?;
    shift_positions(
        conn,
        scope,
        from_parent,
        current.position + 1,
        Some(scratch - 1),
        Shift::Down,
    )?;

    let position = match target {
        MoveTarget::Append => next_position(conn, scope, to_parent)?,
        MoveTarget::At(requested) => reserve_slot(conn, scope, to_parent, Some(requested))?,
    };
    set_parent_and_position(conn, scope, item_id, to_parent, position)?;

    debug!(
        "event=position_transfer module=position status=ok scope={} item={} from_parent={} from={} to_parent={} to={}",
        scope, item_id, from_parent, current.position, to_parent, position
    );
    Ok(position)
}

/// Deletes `item_id` and closes the gap it leaves under its parent.
///
/// Returns the parent the item was removed from.
pub fn remove_and_compact(
    conn: &Connection,
    scope: OrderedScope,
    item_id: Uuid,
) -> RepoResult<Uuid> {
    let current = locate(conn, scope, item_id)?;
    let sql = format!("DELETE FROM {table} WHERE id = ?1;", table = scope.child_table());
    if conn.execute(&sql, [item_id.to_string()])? == 0 {
        return Err(RepoError::not_found(scope.child_entity(), item_id));
    }
    let shifted = shift_positions(
        conn,
        scope,
        current.parent_id,
        current.position + 1,
        None,
        Shift::Down,
    )?;
    debug!(
        "event=position_remove module=position status=ok scope={} item={} parent={} position={} shifted={}",
        scope, item_id, current.parent_id, current.position, shifted
    );
    Ok(current.parent_id)
}

/// Fails unless the positions under `parent_id` are exactly `1..=N`.
///
/// A failure means one of the primitives above is wrong; it is logged at
/// error level and the surrounding transaction must roll back.
pub fn check_density(conn: &Connection, scope: OrderedScope, parent_id: Uuid) -> RepoResult<()> {
    let sql = format!(
        "SELECT position FROM {table} WHERE {parent} = ?1 ORDER BY position ASC;",
        table = scope.child_table(),
        parent = scope.parent_column(),
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let positions = stmt
        .query_map([parent_id.to_string()], |row| row.get::<_, i64>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    let dense = positions
        .iter()
        .zip(1_i64..)
        .all(|(position, expected)| *position == expected);
    if dense {
        return Ok(());
    }

    error!(
        "event=position_invariant module=position status=error scope={} parent={} positions={:?}",
        scope, parent_id, positions
    );
    Err(RepoError::DensityViolation {
        scope,
        parent_id,
        positions,
    })
}
