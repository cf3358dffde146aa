//! Core domain logic for the task board.
//! This crate is the single source of truth for ordering and access invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{BoardLimits, ConfigError, CoreConfig, DatabaseConfig, LoggingConfig, RetryPolicy};
pub use db::{open_db, open_db_in_memory, open_db_with_config, DbError};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::board::{Board, BoardDraft, BoardMembership, BoardRole, MemberRole, User};
pub use model::list::{BoardList, ListPatch, NewList};
pub use model::task::{NewTask, Task, TaskComment, TaskMoveRequest, TaskPatch, TaskPriority};
pub use repo::board_repo::{BoardRepository, SqliteBoardRepository};
pub use repo::list_repo::{ListRepository, SqliteListRepository};
pub use repo::position::{MoveTarget, OrderedScope};
pub use repo::task_repo::{SqliteTaskRepository, TaskRepository};
pub use repo::{RepoError, RepoResult};
pub use service::{BoardService, ListService, ServiceError, ServiceResult, TaskService};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
