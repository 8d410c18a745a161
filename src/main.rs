//! Example service process.
//!
//! Serves a small `greeter` service through the endpoint wrapper:
//!
//! - `GET  /ping`                    liveness
//! - `POST /greetings`               requires `name`
//! - `GET  /greetings/{id}`          404 as a handled service exception
//! - `GET  /slow?ms=`                1s endpoint timeout
//! - `GET  /__onlyinternal/health`   internal-only

use axum::{http::StatusCode, Json};
use clap::Parser;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use duplex_endpoint::config::{load_config, watcher::ConfigWatcher, ServiceConfig};
use duplex_endpoint::descriptor::{get, post};
use duplex_endpoint::http::InboundRequest;
use duplex_endpoint::lifecycle::signals::spawn_signal_listener;
use duplex_endpoint::observability::{logging, metrics, ServiceIdentity};
use duplex_endpoint::{
    Endpoint, HandlerError, HttpServer, HttpService, ServiceException, ServiceRouter,
    ServiceRuntime, Shutdown,
};

#[derive(Parser)]
#[command(name = "endpoint-service")]
#[command(about = "Example service served through the endpoint wrapper", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

struct Greeter {
    greeting: String,
}

impl HttpService for Greeter {
    fn service_name(&self) -> Option<&str> {
        Some("greeter")
    }
}

async fn ping(_: Arc<Greeter>, _: InboundRequest) -> Result<Json<Value>, HandlerError> {
    Ok(Json(json!({ "pong": true })))
}

async fn create_greeting(
    service: Arc<Greeter>,
    request: InboundRequest,
) -> Result<(StatusCode, Json<Value>), HandlerError> {
    let params = request.post();
    let name = params
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default();
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": format!("{}, {}!", service.greeting, name) })),
    ))
}

async fn get_greeting(
    _: Arc<Greeter>,
    mut request: InboundRequest,
) -> Result<Json<Value>, HandlerError> {
    let id: u64 = request
        .path_params()
        .await
        .map_err(|_| ServiceException::message(StatusCode::BAD_REQUEST, "id must be a number"))?;
    if id != 1 {
        return Err(ServiceException::message(StatusCode::NOT_FOUND, "no such greeting").into());
    }
    Ok(Json(json!({ "id": id, "message": "Hello, world!" })))
}

async fn slow(_: Arc<Greeter>, request: InboundRequest) -> Result<Json<Value>, HandlerError> {
    let ms = match request.query().get("ms").and_then(Value::as_str) {
        Some(raw) => raw
            .parse()
            .map_err(|_| ServiceException::message(StatusCode::BAD_REQUEST, "ms must be a number"))?,
        None => 100,
    };
    tokio::time::sleep(Duration::from_millis(ms)).await;
    Ok(Json(json!({ "slept_ms": ms })))
}

async fn health(_: Arc<Greeter>, _: InboundRequest) -> Result<StatusCode, HandlerError> {
    Ok(StatusCode::OK)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServiceConfig::default(),
    };

    logging::init(&config.observability);
    tracing::info!("endpoint-service v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let identity = ServiceIdentity::discover(config.service.name.as_deref());
    let runtime = Arc::new(ServiceRuntime::new(
        config.http.settings(),
        identity,
        Arc::new(metrics::MetricsRecorder),
    ));

    let service = Arc::new(Greeter {
        greeting: "Hello".to_string(),
    });

    let routes = ServiceRouter::new(service, runtime, &config.http)
        .endpoint(Endpoint::new("ping", get("/ping"), ping))
        .endpoint(Endpoint::new(
            "create_greeting",
            post("/greetings").required_params(["name"]),
            create_greeting,
        ))
        .endpoint(Endpoint::new("get_greeting", get("/greetings/{id}"), get_greeting))
        .endpoint(Endpoint::new("slow", get("/slow").timeout(1.0), slow))
        .endpoint(Endpoint::new("health", get("/health").internal(), health));

    for route in routes.routes() {
        tracing::info!(method = %route.method, path = %route.path, endpoint = %route.endpoint, "Serving");
    }

    // Keep the watcher alive for the lifetime of the server.
    let (_watcher, config_updates) = match &cli.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run(config.clone())?), updates)
        }
        None => {
            let (_, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    spawn_signal_listener(shutdown.clone());

    let server = HttpServer::new(routes);
    server.run(listener, config_updates, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
