//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All wrappers produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters for attempts, retries, trips, fallbacks)
//!
//! Consumers:
//!     → Log aggregation (stdout, env-filtered)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Events and counters are observers only; they never change control flow
//! - Metric updates are cheap (atomic increments)
//! - The exporter is opt-in; recording without it installed is a no-op

pub mod logging;
pub mod metrics;
