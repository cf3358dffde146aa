//! Bounded retry for transient write conflicts.

use super::error::{ServiceError, ServiceResult};
use crate::config::RetryPolicy;
use crate::repo::{RepoError, RepoResult};
use log::warn;
use std::thread;
use std::time::Duration;

/// Runs `attempt` until it succeeds, fails with a non-retryable error, or
/// `policy.max_attempts` is used up.
///
/// Each attempt is a fresh transaction, so clamped targets are recomputed
/// from the state visible at that time.
pub(crate) fn with_retry<T>(
    policy: &RetryPolicy,
    operation: &'static str,
    attempt: impl FnMut() -> RepoResult<T>,
) -> ServiceResult<T> {
    with_retry_or(policy, operation, attempt, ServiceError::from)
}

/// Like [`with_retry`], with `on_error` mapping the final non-retryable error.
pub(crate) fn with_retry_or<T>(
    policy: &RetryPolicy,
    operation: &'static str,
    mut attempt: impl FnMut() -> RepoResult<T>,
    on_error: impl FnOnce(RepoError) -> ServiceError,
) -> ServiceResult<T> {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt_no = 1;
    loop {
        match attempt() {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt_no < max_attempts => {
                let backoff_ms = policy.backoff_ms(attempt_no);
                warn!(
                    "event=conflict_retry module=service status=retry op={} attempt={} backoff_ms={} error={}",
                    operation, attempt_no, backoff_ms, err
                );
                thread::sleep(Duration::from_millis(backoff_ms));
                attempt_no += 1;
            }
            Err(err) if err.is_retryable() => {
                warn!(
                    "event=conflict_retry module=service status=error op={} attempts={} error={}",
                    operation, attempt_no, err
                );
                return Err(ServiceError::Conflict {
                    attempts: attempt_no,
                    message: err.to_string(),
                });
            }
            Err(err) => return Err(on_error(err)),
        }
    }
}
