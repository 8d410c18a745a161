//! Handler and service-role traits.

use axum::response::{IntoResponse, Response};
use futures_util::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

use crate::endpoint::error::HandlerError;
use crate::http::request::InboundRequest;

/// Marker for objects that serve endpoints (the server role).
pub trait HttpService: Send + Sync + 'static {
    /// Name reported in stats and logs; defaults to the discovered process
    /// identity when `None`.
    fn service_name(&self) -> Option<&str> {
        None
    }
}

pub type HandlerResult = Result<Response, HandlerError>;

/// A server-side endpoint body.
///
/// Implemented for every `Fn(Arc<S>, InboundRequest) -> impl Future` whose
/// output is `Result<impl IntoResponse, HandlerError>`.
pub trait Handler<S>: Send + Sync + 'static {
    fn call(&self, service: Arc<S>, request: InboundRequest) -> BoxFuture<'static, HandlerResult>;
}

impl<S, F, Fut, R> Handler<S> for F
where
    S: Send + Sync + 'static,
    F: Fn(Arc<S>, InboundRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, HandlerError>> + Send + 'static,
    R: IntoResponse,
{
    fn call(&self, service: Arc<S>, request: InboundRequest) -> BoxFuture<'static, HandlerResult> {
        let fut = self(service, request);
        Box::pin(async move { fut.await.map(IntoResponse::into_response) })
    }
}
