//! Fallback to a secondary operation.
//!
//! # Responsibilities
//! - Invoke the secondary operation when the primary fails recoverably
//! - Keep cancellation and permanent failures flowing through untouched
//!
//! # Design Decisions
//! - The fallback shares the primary's captured arguments (closure capture)
//! - Whatever the fallback produces, success or error, is what the caller
//!   sees; no second-level recovery

use std::future::Future;

use crate::error::FailureKind;
use crate::observability::metrics;

/// Run `primary`; on a transient failure, run `fallback` instead.
///
/// Errors classified [`FailureKind::Permanent`] or
/// [`FailureKind::Cancelled`] propagate immediately and the fallback is
/// never invoked.
pub async fn with_fallback<T, E, C, P, PFut, S, SFut>(
    classify: C,
    primary: P,
    fallback: S,
) -> Result<T, E>
where
    E: std::fmt::Display,
    C: Fn(&E) -> FailureKind,
    P: FnOnce() -> PFut,
    PFut: Future<Output = Result<T, E>>,
    S: FnOnce() -> SFut,
    SFut: Future<Output = Result<T, E>>,
{
    match primary().await {
        Ok(value) => Ok(value),
        Err(err) => match classify(&err) {
            FailureKind::Transient => {
                tracing::debug!(error = %err, "primary failed, invoking fallback");
                metrics::record_fallback();
                fallback().await
            }
            FailureKind::Permanent | FailureKind::Cancelled => Err(err),
        },
    }
}
