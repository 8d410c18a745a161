//! Timeout enforcement for handlers.
//!
//! # Responsibilities
//! - Decide which timeout applies to an invocation
//! - Run the handler as its own task so it is shielded from cancellation
//!   of whoever is waiting on it
//! - Race the wait against the deadline
//!
//! # Design Decisions
//! - The handler task is spawned and its `JoinHandle` is only ever dropped,
//!   never aborted; a late result is discarded with the handle
//! - The ambient tracking ID is re-scoped inside the spawned task
//! - Timeout errors are distinct from handler errors

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinError;

use crate::http::request::{tracking_id, with_tracking_id};

/// Why a shielded run did not yield the handler's output.
#[derive(Debug, Error)]
pub enum ShieldedError {
    #[error("deadline of {0:?} elapsed")]
    Elapsed(Duration),

    /// The handler task panicked or the runtime is shutting down.
    #[error("handler task failed: {0}")]
    Join(#[from] JoinError),
}

/// `secs` as a timeout, if it is positive and finite.
pub fn valid_timeout(secs: f64) -> Option<Duration> {
    if secs.is_finite() && secs > 0.0 {
        Duration::try_from_secs_f64(secs).ok()
    } else {
        None
    }
}

/// The endpoint override when present, otherwise the process default.
pub fn effective_timeout(override_timeout: Option<Duration>, default: Duration) -> Duration {
    override_timeout.unwrap_or(default)
}

/// Run `work` on its own task and wait at most `deadline` for it.
///
/// Dropping the returned future, or hitting the deadline, leaves the task
/// running to completion.
pub async fn run_shielded<F>(work: F, deadline: Duration) -> Result<F::Output, ShieldedError>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let mut task = tokio::spawn(with_tracking_id(tracking_id(), work));

    match tokio::time::timeout(deadline, &mut task).await {
        Ok(joined) => Ok(joined?),
        Err(_) => {
            tracing::debug!(deadline = ?deadline, "Shielded task outlived its deadline; detaching");
            drop(task);
            Err(ShieldedError::Elapsed(deadline))
        }
    }
}
