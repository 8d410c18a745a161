//! Errors raised by handlers and returned by the endpoint wrapper.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::client::ClientError;

/// Last path segment of a type name, without generic arguments.
pub fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Domain-level failure that carries its own response. Counted as a
/// response, never as an error.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{status}: {payload}")]
pub struct ServiceException {
    status: StatusCode,
    payload: Value,
}

impl ServiceException {
    pub fn new(status: StatusCode, payload: impl Into<Value>) -> Self {
        Self {
            status,
            payload: payload.into(),
        }
    }

    /// Exception whose payload is `{"error": message}`.
    pub fn message(status: StatusCode, message: impl Into<String>) -> Self {
        Self::new(status, json!({ "error": message.into() }))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }
}

impl IntoResponse for ServiceException {
    fn into_response(self) -> Response {
        (self.status, Json(self.payload)).into_response()
    }
}

/// Any failure returned by a handler, with the kind of the original error.
///
/// Every `std::error::Error` converts into it, so handlers can use `?`.
pub struct HandlerError {
    kind: &'static str,
    inner: anyhow::Error,
}

impl HandlerError {
    pub fn new(kind: &'static str, inner: anyhow::Error) -> Self {
        Self { kind, inner }
    }

    /// Ad-hoc error from a message.
    pub fn msg(message: impl fmt::Display + fmt::Debug + Send + Sync + 'static) -> Self {
        Self::new("Error", anyhow::Error::msg(message))
    }

    /// Kind (short type name) of the original error.
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Whether the raised error itself is an `E`. Causes in its source
    /// chain are not considered.
    pub fn is<E>(&self) -> bool
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.inner.is::<E>()
    }

    /// Whether the raised error or any of its causes is an `E`.
    pub fn caused_by<E>(&self) -> bool
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.inner.chain().any(|cause| cause.is::<E>())
    }

    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.inner.downcast_ref::<E>()
    }

    pub fn service_exception(&self) -> Option<&ServiceException> {
        self.downcast_ref::<ServiceException>()
    }

    pub fn as_anyhow(&self) -> &anyhow::Error {
        &self.inner
    }

    pub fn into_anyhow(self) -> anyhow::Error {
        self.inner
    }
}

impl<E> From<E> for HandlerError
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(error: E) -> Self {
        Self {
            kind: short_type_name::<E>(),
            inner: anyhow::Error::new(error),
        }
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

/// Includes the cause chain and, when captured, the backtrace.
impl fmt::Debug for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:?}", self.kind, self.inner)
    }
}

/// What the wrapper hands back to the transport when a call does not
/// produce a response.
#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("endpoint `{endpoint}` timed out after {}ms", .timeout.as_millis())]
    Timeout { endpoint: String, timeout: Duration },

    /// The handler's error, unchanged.
    #[error("{0}")]
    Handler(HandlerError),

    #[error(transparent)]
    Client(#[from] ClientError),
}

impl EndpointError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, EndpointError::Timeout { .. })
    }

    pub fn handler_error(&self) -> Option<&HandlerError> {
        match self {
            EndpointError::Handler(err) => Some(err),
            _ => None,
        }
    }
}

impl From<HandlerError> for EndpointError {
    fn from(error: HandlerError) -> Self {
        EndpointError::Handler(error)
    }
}

/// Transport-level translation of a propagated failure.
impl IntoResponse for EndpointError {
    fn into_response(self) -> Response {
        match self {
            EndpointError::Timeout { .. } => (
                StatusCode::GATEWAY_TIMEOUT,
                Json(json!({ "error": "Request timed out" })),
            )
                .into_response(),
            EndpointError::Handler(err) => match err.service_exception() {
                Some(exception) => exception.clone().into_response(),
                None => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal server error" })),
                )
                    .into_response(),
            },
            EndpointError::Client(err) => (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": err.to_string() })),
            )
                .into_response(),
        }
    }
}
