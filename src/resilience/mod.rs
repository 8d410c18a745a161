//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Server-side invocation:
//!     → timeouts.rs (resolve effective timeout, run handler shielded,
//!       race it against the deadline)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every handler runs against a deadline
//! - A deadline abandons the wait, never the handler
//! - No retries here; callers own retry policy

pub mod timeouts;
