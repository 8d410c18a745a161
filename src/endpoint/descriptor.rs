//! Endpoint descriptors: the static HTTP metadata attached to a handler.
//!
//! One constructor per verb mirrors the decorator surface:
//!
//! ```
//! use duplex_endpoint::endpoint::descriptor::{post, HttpMethod};
//!
//! let create = post("/users")
//!     .path("/v2/users")
//!     .required_params(["name", "email"])
//!     .timeout(2.5);
//! assert_eq!(create.method(), HttpMethod::Post);
//! assert_eq!(create.paths().len(), 2);
//! ```

use axum::http::Method;
use axum::routing::MethodFilter;
use std::fmt;
use std::time::Duration;

use crate::endpoint::error::{short_type_name, HandlerError};
use crate::resilience::timeouts::valid_timeout;

/// HTTP verbs an endpoint can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HttpMethod {
    Get,
    Head,
    Options,
    Patch,
    Post,
    Put,
    Trace,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Trace => "TRACE",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Verbs whose parameters travel in the request body.
    pub fn carries_body(self) -> bool {
        matches!(
            self,
            HttpMethod::Post | HttpMethod::Delete | HttpMethod::Put | HttpMethod::Patch
        )
    }

    pub fn to_http(self) -> Method {
        match self {
            HttpMethod::Get => Method::GET,
            HttpMethod::Head => Method::HEAD,
            HttpMethod::Options => Method::OPTIONS,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Trace => Method::TRACE,
            HttpMethod::Delete => Method::DELETE,
        }
    }

    pub fn from_http(method: &Method) -> Option<Self> {
        Some(match method.as_str() {
            "GET" => HttpMethod::Get,
            "HEAD" => HttpMethod::Head,
            "OPTIONS" => HttpMethod::Options,
            "PATCH" => HttpMethod::Patch,
            "POST" => HttpMethod::Post,
            "PUT" => HttpMethod::Put,
            "TRACE" => HttpMethod::Trace,
            "DELETE" => HttpMethod::Delete,
            _ => return None,
        })
    }

    pub fn method_filter(self) -> MethodFilter {
        match self {
            HttpMethod::Get => MethodFilter::GET,
            HttpMethod::Head => MethodFilter::HEAD,
            HttpMethod::Options => MethodFilter::OPTIONS,
            HttpMethod::Patch => MethodFilter::PATCH,
            HttpMethod::Post => MethodFilter::POST,
            HttpMethod::Put => MethodFilter::PUT,
            HttpMethod::Trace => MethodFilter::TRACE,
            HttpMethod::Delete => MethodFilter::DELETE,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error kind that an endpoint expects and does not count as an error.
#[derive(Clone, Copy)]
pub struct SuppressedError {
    kind: &'static str,
    type_name: &'static str,
    matches: fn(&HandlerError) -> bool,
}

impl SuppressedError {
    /// Suppress errors raised as type `E`. An `E` that only appears as the
    /// source of another error does not match.
    pub fn of<E>() -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            kind: short_type_name::<E>(),
            type_name: std::any::type_name::<E>(),
            matches: HandlerError::is::<E>,
        }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn matches(&self, error: &HandlerError) -> bool {
        (self.matches)(error)
    }
}

impl fmt::Debug for SuppressedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SuppressedError").field(&self.kind).finish()
    }
}

impl PartialEq for SuppressedError {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name
    }
}

/// Static metadata of one endpoint. Built once, then shared (read-only) by
/// every invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointDescriptor {
    method: HttpMethod,
    paths: Vec<String>,
    required_params: Option<Vec<String>>,
    timeout: Option<Duration>,
    is_internal: bool,
    suppressed_errors: Vec<SuppressedError>,
}

impl EndpointDescriptor {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            paths: vec![path.into()],
            required_params: None,
            timeout: None,
            is_internal: false,
            suppressed_errors: Vec::new(),
        }
    }

    /// Also serve this endpoint under `path`.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.paths.push(path.into());
        self
    }

    pub fn required_params<I, P>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.required_params = Some(params.into_iter().map(Into::into).collect());
        self
    }

    /// Per-endpoint timeout in seconds. Values that are not positive and
    /// finite are ignored and the process-wide default applies.
    pub fn timeout(mut self, secs: f64) -> Self {
        self.timeout = valid_timeout(secs);
        if self.timeout.is_none() {
            tracing::warn!(timeout = secs, "Ignoring invalid endpoint timeout");
        }
        self
    }

    /// Serve under the configured internal-API prefix.
    pub fn internal(mut self) -> Self {
        self.is_internal = true;
        self
    }

    /// Do not count errors of type `E` as failures of this endpoint.
    pub fn suppress<E>(mut self) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.suppressed_errors.push(SuppressedError::of::<E>());
        self
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// Path templates as declared.
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Final paths, with `internal_prefix` prepended for internal endpoints.
    pub fn resolved_paths(&self, internal_prefix: &str) -> Vec<String> {
        self.paths
            .iter()
            .map(|path| {
                if self.is_internal {
                    format!("{internal_prefix}{path}")
                } else {
                    path.clone()
                }
            })
            .collect()
    }

    pub fn required(&self) -> Option<&[String]> {
        self.required_params.as_deref()
    }

    pub fn timeout_override(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn is_internal(&self) -> bool {
        self.is_internal
    }

    pub fn suppressed_errors(&self) -> &[SuppressedError] {
        &self.suppressed_errors
    }

    /// First suppressed kind matching `error`.
    pub fn suppresses(&self, error: &HandlerError) -> Option<&SuppressedError> {
        self.suppressed_errors.iter().find(|s| s.matches(error))
    }
}

pub fn get(path: impl Into<String>) -> EndpointDescriptor {
    EndpointDescriptor::new(HttpMethod::Get, path)
}

pub fn head(path: impl Into<String>) -> EndpointDescriptor {
    EndpointDescriptor::new(HttpMethod::Head, path)
}

pub fn options(path: impl Into<String>) -> EndpointDescriptor {
    EndpointDescriptor::new(HttpMethod::Options, path)
}

pub fn patch(path: impl Into<String>) -> EndpointDescriptor {
    EndpointDescriptor::new(HttpMethod::Patch, path)
}

pub fn post(path: impl Into<String>) -> EndpointDescriptor {
    EndpointDescriptor::new(HttpMethod::Post, path)
}

pub fn put(path: impl Into<String>) -> EndpointDescriptor {
    EndpointDescriptor::new(HttpMethod::Put, path)
}

pub fn trace(path: impl Into<String>) -> EndpointDescriptor {
    EndpointDescriptor::new(HttpMethod::Trace, path)
}

pub fn delete(path: impl Into<String>) -> EndpointDescriptor {
    EndpointDescriptor::new(HttpMethod::Delete, path)
}
