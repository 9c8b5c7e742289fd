//! Per-attempt deadline enforcement.
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from the operation's own errors
//! - The composed guard treats a timeout as a transient failure

use std::future::Future;
use std::time::Duration;

use crate::error::GuardError;
use crate::observability::metrics;

/// Run `fut` with a deadline.
///
/// An elapsed deadline surfaces as [`GuardError::Timeout`]; the underlying
/// future is dropped at that point, which cancels it.
pub async fn with_timeout<T, E, Fut>(limit: Duration, fut: Fut) -> Result<T, GuardError<E>>
where
    Fut: Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(GuardError::Operation(err)),
        Err(_) => {
            tracing::warn!(limit = ?limit, "attempt timed out");
            metrics::record_timeout();
            Err(GuardError::Timeout(limit))
        }
    }
}
