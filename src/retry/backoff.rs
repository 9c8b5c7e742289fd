//! Exponential backoff with jitter.

use std::time::Duration;
use rand::Rng;

/// Delay before the next attempt, given the attempt that just failed
/// (1-indexed).
///
/// Grows as `base * 2^(attempt-1)`, capped at `max`. With `jitter`, up to
/// 10% of the capped delay is added to spread out synchronized retriers.
pub fn delay_for_attempt(attempt: u32, base: Duration, max: Duration, jitter: bool) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let base_ms = base.as_millis() as u64;
    let max_ms = max.as_millis() as u64;

    let factor = 2u64.saturating_pow(attempt - 1);
    let capped_ms = base_ms.saturating_mul(factor).min(max_ms);

    let jitter_ms = if jitter && capped_ms >= 10 {
        rand::thread_rng().gen_range(0..capped_ms / 10)
    } else {
        0
    };

    Duration::from_millis(capped_ms + jitter_ms)
}
