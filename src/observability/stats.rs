//! Process-wide request counters and per-invocation outcome records.
//!
//! # Responsibilities
//! - Count requests, responses, errors, and timeouts across all endpoints
//! - Describe each finished invocation as one [`OutcomeRecord`]
//! - Hand records to a pluggable [`StatsRecorder`]
//!
//! # Design Decisions
//! - Counters are `AtomicU64` with relaxed ordering; handlers may run on any
//!   worker thread, and no counter is read to make a decision
//! - `HttpStats` is owned by the service runtime and shared through `Arc`,
//!   never a global

use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Label used for every record produced by the HTTP wrapper.
pub const HTTP_SERVER_TYPE: &str = "http";

/// Counters shared by every endpoint of a service.
#[derive(Debug, Default)]
pub struct HttpStats {
    total_requests: AtomicU64,
    total_responses: AtomicU64,
    total_errors: AtomicU64,
    timedout: AtomicU64,
}

impl HttpStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_response(&self) {
        self.total_responses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.total_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timeout(&self) {
        self.timedout.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            total_responses: self.total_responses.load(Ordering::Relaxed),
            total_errors: self.total_errors.load(Ordering::Relaxed),
            timedout: self.timedout.load(Ordering::Relaxed),
        }
    }
}

/// Serializable view of [`HttpStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub total_requests: u64,
    pub total_responses: u64,
    pub total_errors: u64,
    pub timedout: u64,
}

/// Final classification of one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    /// The HTTP status of the response that was produced.
    Code(u16),
    Timeout,
    HandledException,
    UnhandledException,
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeStatus::Code(code) => write!(f, "{code}"),
            OutcomeStatus::Timeout => f.write_str("timeout"),
            OutcomeStatus::HandledException => f.write_str("handled_exception"),
            OutcomeStatus::UnhandledException => f.write_str("unhandled_exception"),
        }
    }
}

impl Serialize for OutcomeStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            OutcomeStatus::Code(code) => serializer.serialize_u16(*code),
            other => serializer.collect_str(other),
        }
    }
}

/// The single telemetry record emitted per server-side invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutcomeRecord {
    pub endpoint: String,
    pub status: OutcomeStatus,
    pub success: bool,
    pub server_type: &'static str,
    pub time_taken_ms: u64,
    pub process_time_taken_ms: u64,
    pub service_name: String,
    pub hostname: String,
    pub tracking_id: Option<String>,
}

/// Aggregation backend receiving one record per invocation.
pub trait StatsRecorder: Send + Sync {
    fn update_stats(&self, record: &OutcomeRecord);
}

/// CPU time consumed by this process so far.
#[cfg(unix)]
pub fn process_time() -> Duration {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    // SAFETY: `ts` is a valid, exclusively borrowed timespec for the call.
    let rc = unsafe { libc::clock_gettime(libc::CLOCK_PROCESS_CPUTIME_ID, &mut ts) };
    if rc != 0 {
        return Duration::ZERO;
    }
    Duration::new(ts.tv_sec as u64, ts.tv_nsec as u32)
}

#[cfg(not(unix))]
pub fn process_time() -> Duration {
    Duration::ZERO
}

/// Whole milliseconds, saturating.
pub fn as_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_are_independent() {
        let stats = HttpStats::new();
        stats.record_request();
        stats.record_request();
        stats.record_response();
        stats.record_timeout();

        assert_eq!(
            stats.snapshot(),
            StatsSnapshot {
                total_requests: 2,
                total_responses: 1,
                total_errors: 0,
                timedout: 1,
            }
        );
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(OutcomeStatus::Code(400).to_string(), "400");
        assert_eq!(OutcomeStatus::Timeout.to_string(), "timeout");
        assert_eq!(
            serde_json::to_value(OutcomeStatus::HandledException).unwrap(),
            serde_json::json!("handled_exception")
        );
        assert_eq!(
            serde_json::to_value(OutcomeStatus::Code(200)).unwrap(),
            serde_json::json!(200)
        );
    }

    #[test]
    fn test_process_time_is_monotonic() {
        let first = process_time();
        let mut acc = 0u64;
        for i in 0..100_000u64 {
            acc = acc.wrapping_add(i * i);
        }
        assert!(acc > 0);
        assert!(process_time() >= first);
    }
}
