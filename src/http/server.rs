//! HTTP server setup and endpoint registration.
//!
//! # Responsibilities
//! - Register endpoints on an Axum router, one route per resolved path
//! - Wire up middleware (request ID, tracking-ID scope, tracing)
//! - Buffer bodies and hand requests to the endpoint wrapper
//! - Translate propagated failures into responses
//! - Apply reloaded settings and shut down gracefully

use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::Request,
    response::{IntoResponse, Response},
    routing::{get, MethodRouter},
    Json, Router,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::{HttpConfig, ServiceConfig};
use crate::endpoint::{Endpoint, HttpMethod, HttpService, ServiceRuntime};
use crate::http::request::{tracking_id_middleware, InboundRequest, MakeTrackingId};

/// One registered (method, path) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    pub method: HttpMethod,
    pub path: String,
    pub endpoint: String,
}

/// Collects the endpoints of one service and turns them into a router.
pub struct ServiceRouter<S> {
    service: Arc<S>,
    runtime: Arc<ServiceRuntime>,
    internal_prefix: String,
    max_body_bytes: usize,
    endpoints: BTreeMap<String, BTreeMap<HttpMethod, Endpoint<S>>>,
}

impl<S: HttpService> ServiceRouter<S> {
    pub fn new(service: Arc<S>, runtime: Arc<ServiceRuntime>, config: &HttpConfig) -> Self {
        Self {
            service,
            runtime,
            internal_prefix: config.internal_prefix.clone(),
            max_body_bytes: config.max_body_bytes,
            endpoints: BTreeMap::new(),
        }
    }

    /// Register `endpoint` under each of its resolved paths. Registering the
    /// same (method, path) again replaces the earlier endpoint.
    pub fn endpoint(mut self, endpoint: Endpoint<S>) -> Self {
        let method = endpoint.descriptor().method();
        for path in endpoint.descriptor().resolved_paths(&self.internal_prefix) {
            let previous = self
                .endpoints
                .entry(path.clone())
                .or_default()
                .insert(method, endpoint.clone());
            if let Some(previous) = previous {
                tracing::warn!(
                    path = %path,
                    method = %method,
                    replaced = previous.name(),
                    endpoint = endpoint.name(),
                    "Endpoint registered twice; keeping the latest"
                );
            }
        }
        self
    }

    pub fn runtime(&self) -> &Arc<ServiceRuntime> {
        &self.runtime
    }

    /// Path of the counter snapshot route.
    pub fn stats_path(&self) -> String {
        format!("{}/stats", self.internal_prefix)
    }

    pub fn routes(&self) -> Vec<RouteEntry> {
        self.endpoints
            .iter()
            .flat_map(|(path, methods)| {
                methods.iter().map(move |(method, endpoint)| RouteEntry {
                    method: *method,
                    path: path.clone(),
                    endpoint: endpoint.name().to_string(),
                })
            })
            .collect()
    }

    pub fn into_router(self) -> Router {
        let stats_path = self.stats_path();
        let stats_shadowed = self.endpoints.contains_key(&stats_path);
        let mut router = Router::new();

        for (path, methods) in self.endpoints {
            let mut method_router: MethodRouter = MethodRouter::new();
            for (method, endpoint) in methods {
                tracing::debug!(
                    method = %method,
                    path = %path,
                    endpoint = endpoint.name(),
                    "Route registered"
                );
                let service = self.service.clone();
                let runtime = self.runtime.clone();
                method_router = method_router.on(
                    method.method_filter(),
                    move |request: Request<Body>| async move {
                        serve_http(endpoint, runtime, service, request).await
                    },
                );
            }
            router = router.route(&path, method_router);
        }

        if stats_shadowed {
            tracing::warn!(path = %stats_path, "Endpoint shadows the stats route");
        } else {
            let runtime = self.runtime.clone();
            router = router.route(
                &stats_path,
                get(move || async move { Json(runtime.stats().snapshot()) }),
            );
        }

        router.layer(
            ServiceBuilder::new()
                .layer(DefaultBodyLimit::max(self.max_body_bytes))
                .layer(SetRequestIdLayer::x_request_id(MakeTrackingId))
                .layer(TraceLayer::new_for_http())
                .layer(axum::middleware::from_fn(tracking_id_middleware))
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
    }
}

async fn serve_http<S: HttpService>(
    endpoint: Endpoint<S>,
    runtime: Arc<ServiceRuntime>,
    service: Arc<S>,
    request: Request<Body>,
) -> Response {
    let request = match InboundRequest::from_http(request).await {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!(endpoint = endpoint.name(), error = %e, "Rejected request body");
            return e.into_response();
        }
    };

    match endpoint.serve(&runtime, service, request).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

/// HTTP server for a service.
pub struct HttpServer {
    router: Router,
    runtime: Arc<ServiceRuntime>,
}

impl HttpServer {
    pub fn new<S: HttpService>(routes: ServiceRouter<S>) -> Self {
        let runtime = routes.runtime().clone();
        Self {
            router: routes.into_router(),
            runtime,
        }
    }

    /// The fully layered router, e.g. for in-process requests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn runtime(&self) -> &Arc<ServiceRuntime> {
        &self.runtime
    }

    /// Serve on `listener` until `shutdown` fires, applying reloaded
    /// settings from `config_updates` as they arrive.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<ServiceConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let runtime = self.runtime.clone();
        let mut reload_shutdown = shutdown.resubscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    update = config_updates.recv() => match update {
                        Some(config) => runtime.update_settings(config.http.settings()),
                        None => break,
                    },
                    _ = reload_shutdown.recv() => break,
                }
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
