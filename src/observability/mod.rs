//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Every server-side invocation produces:
//!     → stats.rs (process-wide counters + one OutcomeRecord)
//!     → metrics.rs (StatsRecorder backed by the `metrics` facade)
//!     → logging.rs (structured events on the `stats` and `exceptions` targets)
//!
//! Consumers:
//!     → Log aggregation (stdout, JSON or pretty)
//!     → Metrics endpoint (Prometheus scrape)
//!     → GET {internal_prefix}/stats, /__onlyinternal/stats by default
//!       (counter snapshot)
//! ```
//!
//! # Design Decisions
//! - Tracking ID flows through all log records
//! - Counters are atomic increments; no locks on the hot path
//! - The stats backend is a trait so deployments can swap aggregators

pub mod identity;
pub mod logging;
pub mod metrics;
pub mod stats;

pub use identity::ServiceIdentity;
pub use stats::{HttpStats, OutcomeRecord, OutcomeStatus, StatsRecorder, StatsSnapshot};
