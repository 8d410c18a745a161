//! Endpoints served through the HTTP router.

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use duplex_endpoint::config::{HttpConfig, HttpSettings};
use duplex_endpoint::descriptor::{get, post, trace};
use duplex_endpoint::endpoint::HttpMethod;
use duplex_endpoint::http::{tracking_id, InboundRequest, RouteEntry, X_REQUEST_ID};
use duplex_endpoint::observability::OutcomeStatus;
use duplex_endpoint::{Endpoint, HandlerError, HttpServer, ServiceRouter};

mod common;
use common::{runtime, RecordingRecorder, TestService};

fn build(config: &HttpConfig) -> (HttpServer, Arc<TestService>, Arc<RecordingRecorder>) {
    let (runtime, recorder) = runtime(HttpSettings {
        default_timeout: Duration::from_secs(60),
        slow_threshold: Duration::from_secs(1),
    });
    let service = Arc::new(TestService::default());

    let routes = ServiceRouter::new(service.clone(), runtime, config)
        .endpoint(Endpoint::new(
            "create_order",
            post("/orders").required_params(["id"]),
            |svc: Arc<TestService>, req: InboundRequest| async move {
                svc.called();
                Ok::<_, HandlerError>((StatusCode::CREATED, Json(Value::Object(req.post()))))
            },
        ))
        .endpoint(Endpoint::new(
            "get_order",
            get("/orders/{id}"),
            |_: Arc<TestService>, mut req: InboundRequest| async move {
                let id: u64 = req
                    .path_params()
                    .await
                    .map_err(|_| HandlerError::msg("bad id"))?;
                Ok::<_, HandlerError>(Json(json!({ "id": id, "tracking_id": tracking_id() })))
            },
        ))
        .endpoint(Endpoint::new(
            "diagnostics",
            trace("/diag"),
            |_: Arc<TestService>, _req: InboundRequest| async move {
                Ok::<_, HandlerError>(StatusCode::OK)
            },
        ))
        .endpoint(Endpoint::new(
            "health",
            get("/health").internal(),
            |_: Arc<TestService>, _req: InboundRequest| async move {
                Ok::<_, HandlerError>("ok")
            },
        ))
        .endpoint(Endpoint::new(
            "hang",
            get("/hang").timeout(0.02),
            |_: Arc<TestService>, _req: InboundRequest| async move {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, HandlerError>(StatusCode::OK)
            },
        ));

    (HttpServer::new(routes), service, recorder)
}

async fn send(router: &Router, request: Request<Body>) -> Response {
    router.clone().oneshot(request).await.unwrap()
}

async fn json_body(response: Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_missing_param_returns_json_400() {
    let (server, service, recorder) = build(&HttpConfig::default());

    let response = send(
        &server.router(),
        Request::post("/orders")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"qty":2}"#))
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/json"
    );
    assert!(response.headers().contains_key(X_REQUEST_ID));
    assert_eq!(
        json_body(response).await,
        json!({ "error": "Required params id not found" })
    );
    assert_eq!(service.calls(), 0);
    assert_eq!(recorder.records().len(), 1);
}

#[tokio::test]
async fn test_form_body_satisfies_required_params() {
    let (server, service, _recorder) = build(&HttpConfig::default());

    let response = send(
        &server.router(),
        Request::post("/orders")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("id=5&qty=2"))
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(service.calls(), 1);
}

#[tokio::test]
async fn test_multipart_body_satisfies_required_params() {
    let (server, service, recorder) = build(&HttpConfig::default());
    let body = concat!(
        "--XB\r\n",
        "Content-Disposition: form-data; name=\"id\"\r\n\r\n",
        "7\r\n",
        "--XB--\r\n",
    );

    let response = send(
        &server.router(),
        Request::post("/orders")
            .header(header::CONTENT_TYPE, "multipart/form-data; boundary=XB")
            .body(Body::from(body))
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(json_body(response).await, json!({ "id": "7" }));
    assert_eq!(service.calls(), 1);
    assert_eq!(recorder.records()[0].status, OutcomeStatus::Ok);
}

#[tokio::test]
async fn test_tracking_id_is_propagated() {
    let (server, _service, recorder) = build(&HttpConfig::default());

    let response = send(
        &server.router(),
        Request::get("/orders/42")
            .header(X_REQUEST_ID, "req-123")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get(X_REQUEST_ID).unwrap(), "req-123");
    assert_eq!(
        json_body(response).await,
        json!({ "id": 42, "tracking_id": "req-123" })
    );
    assert_eq!(recorder.records()[0].tracking_id.as_deref(), Some("req-123"));
}

#[tokio::test]
async fn test_tracking_id_is_generated_when_absent() {
    let (server, _service, recorder) = build(&HttpConfig::default());

    let response = send(
        &server.router(),
        Request::get("/orders/1").body(Body::empty()).unwrap(),
    )
    .await;

    let header_id = response
        .headers()
        .get(X_REQUEST_ID)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(uuid::Uuid::parse_str(&header_id).is_ok());
    assert_eq!(recorder.records()[0].tracking_id.as_deref(), Some(header_id.as_str()));
}

#[tokio::test]
async fn test_trace_verb_is_routed_as_trace() {
    let (server, _service, _recorder) = build(&HttpConfig::default());
    let router = server.router();

    let traced = send(
        &router,
        Request::builder()
            .method(Method::TRACE)
            .uri("/diag")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(traced.status(), StatusCode::OK);

    let put = send(
        &router,
        Request::put("/diag").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(put.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_internal_endpoint_lives_under_prefix() {
    let config = HttpConfig {
        internal_prefix: "/_private".to_string(),
        ..HttpConfig::default()
    };
    let (server, _service, _recorder) = build(&config);
    let router = server.router();

    let internal = send(
        &router,
        Request::get("/_private/health").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(internal.status(), StatusCode::OK);

    let public = send(&router, Request::get("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(public.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_stats_route_follows_internal_prefix() {
    let config = HttpConfig {
        internal_prefix: "/_private".to_string(),
        ..HttpConfig::default()
    };
    let (server, _service, _recorder) = build(&config);
    let router = server.router();

    let moved = send(
        &router,
        Request::get("/_private/stats").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(moved.status(), StatusCode::OK);
    assert_eq!(json_body(moved).await["total_requests"], 0);

    let default = send(
        &router,
        Request::get("/__onlyinternal/stats").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(default.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_stats_route_reports_counters() {
    let (server, _service, _recorder) = build(&HttpConfig::default());
    let router = server.router();

    send(&router, Request::get("/orders/1").body(Body::empty()).unwrap()).await;
    send(
        &router,
        Request::post("/orders").body(Body::empty()).unwrap(),
    )
    .await;

    let response = send(
        &router,
        Request::get("/__onlyinternal/stats").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({
            "total_requests": 2,
            "total_responses": 2,
            "total_errors": 0,
            "timedout": 0,
        })
    );
}

#[tokio::test]
async fn test_timeout_maps_to_gateway_timeout() {
    let (server, _service, recorder) = build(&HttpConfig::default());

    let response = send(
        &server.router(),
        Request::get("/hang").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(server.runtime().stats().snapshot().timedout, 1);
    assert_eq!(recorder.records()[0].status, OutcomeStatus::Timeout);
}

#[tokio::test]
async fn test_oversized_body_is_rejected_before_the_wrapper() {
    let config = HttpConfig {
        max_body_bytes: 16,
        ..HttpConfig::default()
    };
    let (server, service, recorder) = build(&config);

    let response = send(
        &server.router(),
        Request::post("/orders")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(format!(r#"{{"id":1,"pad":"{}"}}"#, "x".repeat(64))))
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(service.calls(), 0);
    assert!(recorder.records().is_empty());
    assert_eq!(server.runtime().stats().snapshot().total_requests, 0);
}

#[tokio::test]
async fn test_broken_body_is_bad_request() {
    let (server, service, recorder) = build(&HttpConfig::default());
    let chunks: Vec<Result<&'static str, std::io::Error>> = vec![
        Ok("id="),
        Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "peer reset")),
    ];

    let response = send(
        &server.router(),
        Request::post("/orders")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from_stream(futures_util::stream::iter(chunks)))
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(service.calls(), 0);
    assert!(recorder.records().is_empty());
}

#[tokio::test]
async fn test_duplicate_registration_keeps_latest() {
    let (runtime, _recorder) = runtime(HttpSettings::default());
    let service = Arc::new(TestService::default());
    let first = Endpoint::new(
        "first",
        get("/ping"),
        |_: Arc<TestService>, _req: InboundRequest| async move { Ok::<_, HandlerError>("one") },
    );
    let second = Endpoint::new(
        "second",
        get("/ping"),
        |_: Arc<TestService>, _req: InboundRequest| async move { Ok::<_, HandlerError>("two") },
    );

    let routes = ServiceRouter::new(service, runtime, &HttpConfig::default())
        .endpoint(first)
        .endpoint(second.clone())
        .endpoint(second);

    assert_eq!(
        routes.routes(),
        vec![RouteEntry {
            method: HttpMethod::Get,
            path: "/ping".to_string(),
            endpoint: "second".to_string(),
        }]
    );

    let server = HttpServer::new(routes);
    let response = send(&server.router(), Request::get("/ping").body(Body::empty()).unwrap()).await;
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"two");
}

#[tokio::test]
async fn test_run_applies_reloaded_settings_and_shuts_down() {
    use duplex_endpoint::config::ServiceConfig;
    use duplex_endpoint::Shutdown;
    use tokio::sync::mpsc;

    let (server, _service, _recorder) = build(&HttpConfig::default());
    let runtime = server.runtime().clone();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();

    let shutdown = Shutdown::new();
    let (updates_tx, updates_rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(server.run(listener, updates_rx, shutdown.subscribe()));

    let mut config = ServiceConfig::default();
    config.http.timeout_secs = 2.5;
    updates_tx.send(config).unwrap();

    let expected = Duration::from_millis(2500);
    for _ in 0..50 {
        if runtime.settings().default_timeout == expected {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(runtime.settings().default_timeout, expected);

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server stops after shutdown")
        .unwrap()
        .unwrap();
}
