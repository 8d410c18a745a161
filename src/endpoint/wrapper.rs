//! The endpoint wrapper: validation, shielded execution, classification,
//! and exactly-once outcome reporting around a handler.

use axum::response::Response;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::endpoint::classify::{Classification, Classifier};
use crate::endpoint::descriptor::EndpointDescriptor;
use crate::endpoint::error::{EndpointError, HandlerError};
use crate::endpoint::handler::{Handler, HttpService};
use crate::endpoint::params;
use crate::endpoint::runtime::ServiceRuntime;
use crate::http::request::{tracking_id, InboundRequest};
use crate::observability::stats::{
    as_millis, process_time, OutcomeRecord, OutcomeStatus, StatsRecorder, HTTP_SERVER_TYPE,
};
use crate::resilience::timeouts::{effective_timeout, run_shielded, ShieldedError};

/// A handler bound to its descriptor.
///
/// Cloning is cheap; clones share the descriptor and handler.
pub struct Endpoint<S> {
    name: Arc<str>,
    descriptor: Arc<EndpointDescriptor>,
    handler: Arc<dyn Handler<S>>,
}

impl<S> Clone for Endpoint<S> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            descriptor: self.descriptor.clone(),
            handler: self.handler.clone(),
        }
    }
}

impl<S> fmt::Debug for Endpoint<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("name", &self.name)
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

impl<S: HttpService> Endpoint<S> {
    pub fn new(
        name: impl Into<Arc<str>>,
        descriptor: EndpointDescriptor,
        handler: impl Handler<S>,
    ) -> Self {
        Self {
            name: name.into(),
            descriptor: Arc::new(descriptor),
            handler: Arc::new(handler),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptor(&self) -> &EndpointDescriptor {
        &self.descriptor
    }

    /// Run one server-side invocation.
    ///
    /// Missing required params produce a 400 response without calling the
    /// handler. Otherwise the handler runs shielded against the effective
    /// timeout, and its failure (or the timeout) is returned after being
    /// counted and logged. One outcome record is submitted either way, even
    /// if this future is dropped before completing.
    pub async fn serve(
        &self,
        runtime: &ServiceRuntime,
        service: Arc<S>,
        mut request: InboundRequest,
    ) -> Result<Response, EndpointError> {
        let stats = runtime.stats();
        stats.record_request();

        let identity = runtime.identity();
        let tracking_id = tracking_id();
        let service_name = service
            .service_name()
            .unwrap_or(identity.service_name.as_str())
            .to_string();

        let classifier = Classifier {
            endpoint: &self.name,
            service_name: &service_name,
            hostname: &identity.hostname,
            host_addr: &identity.host_addr,
            tracking_id: tracking_id.as_deref(),
            stats,
        };

        let record = OutcomeRecord {
            endpoint: self.name.to_string(),
            status: OutcomeStatus::UnhandledException,
            success: false,
            server_type: HTTP_SERVER_TYPE,
            time_taken_ms: 0,
            process_time_taken_ms: 0,
            service_name: service_name.clone(),
            hostname: identity.hostname.clone(),
            tracking_id: tracking_id.clone(),
        };

        if let Some(required) = self.descriptor.required() {
            let present = params::request_params(&request);
            let missing = params::missing_params(required, &present);
            if !missing.is_empty() {
                let c = classifier.validation_failure(&missing);
                runtime.recorder().update_stats(&OutcomeRecord {
                    status: c.status,
                    success: c.success,
                    ..record
                });
                return Ok(params::missing_params_response(&missing));
            }
        }

        request.adopt_structured_body();

        let settings = runtime.settings();
        let timeout = effective_timeout(self.descriptor.timeout_override(), settings.default_timeout);
        let mut outcome = OutcomeGuard::start(runtime.recorder().clone(), record);

        let work = self.handler.call(service, request);
        match run_shielded(work, timeout).await {
            Ok(Ok(response)) => {
                let (wall, cpu) = outcome.elapsed();
                outcome.set(classifier.success(&response, wall, cpu, settings.slow_threshold));
                Ok(response)
            }
            Ok(Err(error)) => {
                outcome.set(classifier.failure(&error, &self.descriptor));
                Err(EndpointError::Handler(error))
            }
            Err(ShieldedError::Elapsed(_)) => {
                outcome.set(classifier.timeout(timeout));
                Err(EndpointError::Timeout {
                    endpoint: self.name.to_string(),
                    timeout,
                })
            }
            Err(ShieldedError::Join(join_error)) => {
                let kind = if join_error.is_panic() { "panic" } else { "JoinError" };
                let error = HandlerError::new(kind, anyhow::Error::new(join_error));
                outcome.set(classifier.failure(&error, &self.descriptor));
                Err(EndpointError::Handler(error))
            }
        }
    }
}

/// Submits its record to the stats backend when dropped, so every exit
/// path (including the caller abandoning the invocation) reports once.
struct OutcomeGuard {
    recorder: Arc<dyn StatsRecorder>,
    record: OutcomeRecord,
    started: Instant,
    cpu_started: Duration,
}

impl OutcomeGuard {
    fn start(recorder: Arc<dyn StatsRecorder>, record: OutcomeRecord) -> Self {
        Self {
            recorder,
            record,
            started: Instant::now(),
            cpu_started: process_time(),
        }
    }

    fn elapsed(&self) -> (Duration, Duration) {
        (
            self.started.elapsed(),
            process_time().saturating_sub(self.cpu_started),
        )
    }

    fn set(&mut self, classification: Classification) {
        self.record.status = classification.status;
        self.record.success = classification.success;
    }
}

impl Drop for OutcomeGuard {
    fn drop(&mut self) {
        let (wall, cpu) = self.elapsed();
        self.record.time_taken_ms = as_millis(wall);
        self.record.process_time_taken_ms = as_millis(cpu);
        self.recorder.update_stats(&self.record);
    }
}
