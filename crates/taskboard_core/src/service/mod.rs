//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Check the acting user's board role before any write.
//! - Retry transient write conflicts under the configured policy.

mod access;
pub mod board_service;
pub mod error;
pub mod list_service;
mod retry;
pub mod task_service;

pub use board_service::BoardService;
pub use error::{ServiceError, ServiceResult};
pub use list_service::ListService;
pub use task_service::TaskService;
