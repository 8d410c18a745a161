//! Outcome classification for server-side invocations.
//!
//! Every finished invocation lands in exactly one [`OutcomeKind`]. Each kind
//! bumps at most one outcome counter and decides what gets logged; none of
//! them swallows the handler's error.
//!
//! | kind                      | counter           | status                | success |
//! |---------------------------|-------------------|-----------------------|---------|
//! | `Success`                 | `total_responses` | response status       | true    |
//! | `ValidationFailure`       | `total_responses` | 400                   | false   |
//! | `Timeout`                 | `timedout`        | `timeout`             | false   |
//! | `HandledServiceException` | `total_responses` | `handled_exception`   | true    |
//! | `SuppressedException`     | none              | `handled_exception`   | false   |
//! | `UnhandledException`      | `total_errors`    | `unhandled_exception` | false   |

use axum::response::Response;
use std::time::Duration;

use crate::endpoint::descriptor::EndpointDescriptor;
use crate::endpoint::error::HandlerError;
use crate::observability::logging::{EXCEPTIONS_TARGET, STATS_TARGET};
use crate::observability::stats::{as_millis, HttpStats, OutcomeStatus, HTTP_SERVER_TYPE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Success,
    ValidationFailure,
    Timeout,
    HandledServiceException,
    SuppressedException,
    UnhandledException,
}

/// Result of classifying one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub kind: OutcomeKind,
    pub status: OutcomeStatus,
    pub success: bool,
}

impl Classification {
    fn new(kind: OutcomeKind, status: OutcomeStatus, success: bool) -> Self {
        Self {
            kind,
            status,
            success,
        }
    }
}

/// Per-invocation view used to count and log an outcome.
pub(crate) struct Classifier<'a> {
    pub endpoint: &'a str,
    pub service_name: &'a str,
    pub hostname: &'a str,
    pub host_addr: &'a str,
    pub tracking_id: Option<&'a str>,
    pub stats: &'a HttpStats,
}

impl Classifier<'_> {
    pub fn validation_failure(&self, missing: &[&str]) -> Classification {
        self.stats.record_response();
        tracing::debug!(
            endpoint = self.endpoint,
            missing = %missing.join(","),
            tracking_id = self.tracking_id,
            "Rejected call with missing required params"
        );
        Classification::new(OutcomeKind::ValidationFailure, OutcomeStatus::Code(400), false)
    }

    pub fn success(
        &self,
        response: &Response,
        elapsed: Duration,
        cpu: Duration,
        slow_threshold: Duration,
    ) -> Classification {
        let status = response.status().as_u16();
        let slow = elapsed > slow_threshold;

        if slow {
            tracing::info!(
                target: STATS_TARGET,
                status,
                time_taken = as_millis(elapsed),
                process_time_taken = as_millis(cpu),
                server_type = HTTP_SERVER_TYPE,
                hostname = self.hostname,
                service_name = self.service_name,
                endpoint = self.endpoint,
                api_execution_threshold_exceed = true,
                tracking_id = self.tracking_id,
                "Slow API call"
            );
        } else {
            tracing::debug!(
                target: STATS_TARGET,
                status,
                time_taken = as_millis(elapsed),
                process_time_taken = as_millis(cpu),
                server_type = HTTP_SERVER_TYPE,
                hostname = self.hostname,
                service_name = self.service_name,
                endpoint = self.endpoint,
                api_execution_threshold_exceed = false,
                tracking_id = self.tracking_id,
                "API call completed"
            );
        }

        self.stats.record_response();
        Classification::new(OutcomeKind::Success, OutcomeStatus::Code(status), true)
    }

    pub fn timeout(&self, timeout: Duration) -> Classification {
        self.stats.record_timeout();
        tracing::error!(
            endpoint = self.endpoint,
            tracking_id = self.tracking_id,
            "HTTP request had a timeout for method {}",
            self.endpoint
        );
        tracing::info!(
            target: STATS_TARGET,
            time_taken = as_millis(timeout),
            server_type = HTTP_SERVER_TYPE,
            hostname = self.host_addr,
            service_name = self.service_name,
            endpoint = self.endpoint,
            api_execution_threshold_exceed = true,
            api_timeout = true,
            tracking_id = self.tracking_id,
            "API timeout"
        );
        Classification::new(OutcomeKind::Timeout, OutcomeStatus::Timeout, false)
    }

    pub fn failure(&self, error: &HandlerError, descriptor: &EndpointDescriptor) -> Classification {
        if let Some(exception) = error.service_exception() {
            self.stats.record_response();
            tracing::info!(
                endpoint = self.endpoint,
                status = exception.status().as_u16(),
                tracking_id = self.tracking_id,
                "Handled exception {} for method {}",
                error.kind(),
                self.endpoint
            );
            return Classification::new(
                OutcomeKind::HandledServiceException,
                OutcomeStatus::HandledException,
                true,
            );
        }

        if let Some(suppressed) = descriptor.suppresses(error) {
            tracing::debug!(
                endpoint = self.endpoint,
                suppressed = suppressed.kind(),
                status = %OutcomeStatus::HandledException,
                tracking_id = self.tracking_id,
                "Suppressed exception {} for method {}",
                error.kind(),
                self.endpoint
            );
            return Classification::new(
                OutcomeKind::SuppressedException,
                OutcomeStatus::HandledException,
                false,
            );
        }

        self.stats.record_error();
        tracing::error!(
            endpoint = self.endpoint,
            error = %error,
            tracking_id = self.tracking_id,
            "Unhandled exception {} for method {}",
            error.kind(),
            self.endpoint
        );
        tracing::info!(
            target: STATS_TARGET,
            exception_type = error.kind(),
            method_name = self.endpoint,
            message = %error,
            service_name = self.service_name,
            hostname = self.host_addr,
            tracking_id = self.tracking_id,
            "Unhandled exception"
        );
        tracing::info!(
            target: EXCEPTIONS_TARGET,
            exception_type = error.kind(),
            method_name = self.endpoint,
            message = ?error,
            service_name = self.service_name,
            hostname = self.host_addr,
            tracking_id = self.tracking_id,
            "Unhandled exception trace"
        );
        Classification::new(
            OutcomeKind::UnhandledException,
            OutcomeStatus::UnhandledException,
            false,
        )
    }
}
