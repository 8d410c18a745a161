//! Shared utilities for integration tests.

#![allow(dead_code)]

use axum::body::Bytes;
use axum::http::{header, Method, Request};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

use duplex_endpoint::config::HttpSettings;
use duplex_endpoint::http::InboundRequest;
use duplex_endpoint::observability::{OutcomeRecord, ServiceIdentity, StatsRecorder};
use duplex_endpoint::{HttpService, ServiceRuntime};

/// One captured log event.
#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub target: String,
    pub level: Level,
    pub fields: HashMap<String, String>,
}

impl CapturedEvent {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Layer that keeps every event it sees.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<CapturedEvent>>>);

impl CapturedLogs {
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.0.lock().unwrap().clone()
    }

    pub fn on_target(&self, target: &str) -> Vec<CapturedEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.target == target)
            .collect()
    }
}

struct FieldVisitor<'a>(&'a mut HashMap<String, String>);

impl Visit for FieldVisitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{:?}", value));
    }
}

impl<S: Subscriber> Layer<S> for CapturedLogs {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = HashMap::new();
        event.record(&mut FieldVisitor(&mut fields));
        self.0.lock().unwrap().push(CapturedEvent {
            target: event.metadata().target().to_string(),
            level: *event.metadata().level(),
            fields,
        });
    }
}

/// Install a capturing subscriber for the current thread.
pub fn capture_logs() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::registry().with(logs.clone());
    let guard = tracing::subscriber::set_default(subscriber);
    (logs, guard)
}

/// Stats backend that keeps every record.
#[derive(Default)]
pub struct RecordingRecorder(Mutex<Vec<OutcomeRecord>>);

impl RecordingRecorder {
    pub fn records(&self) -> Vec<OutcomeRecord> {
        self.0.lock().unwrap().clone()
    }
}

impl StatsRecorder for RecordingRecorder {
    fn update_stats(&self, record: &OutcomeRecord) {
        self.0.lock().unwrap().push(record.clone());
    }
}

/// Runtime with fixed identity and a recording backend.
pub fn runtime(settings: HttpSettings) -> (Arc<ServiceRuntime>, Arc<RecordingRecorder>) {
    let recorder = Arc::new(RecordingRecorder::default());
    let runtime = Arc::new(ServiceRuntime::new(
        settings,
        ServiceIdentity::new("orders", "test-host", "10.0.0.7"),
        recorder.clone(),
    ));
    (runtime, recorder)
}

/// Service that counts handler invocations.
#[derive(Default)]
pub struct TestService {
    calls: AtomicUsize,
}

impl TestService {
    pub fn called(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl HttpService for TestService {}

pub fn inbound(method: Method, uri: &str, content_type: Option<&str>, body: &str) -> InboundRequest {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(ct) = content_type {
        builder = builder.header(header::CONTENT_TYPE, ct);
    }
    let (parts, _) = builder.body(()).unwrap().into_parts();
    InboundRequest::from_parts(parts, Bytes::from(body.to_string()))
}

/// A request as seen by the mock backend.
#[derive(Debug, Clone)]
pub struct ReceivedRequest {
    pub method: String,
    pub target: String,
    pub headers: HashMap<String, String>,
    pub body: String,
}

/// Start a programmable mock backend on an ephemeral port.
///
/// `f` sees each parsed request and returns the status and body to send.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(ReceivedRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let Some(request) = read_request(&mut socket).await else {
                            return;
                        };
                        let (status, body) = f(request).await;
                        let status_text = match status {
                            200 => "200 OK",
                            201 => "201 Created",
                            400 => "400 Bad Request",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> Option<ReceivedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();

    let headers: HashMap<String, String> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    let content_length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let end = buf.len().min(header_end + content_length);
    let body = String::from_utf8_lossy(&buf[header_end..end]).to_string();

    Some(ReceivedRequest {
        method,
        target,
        headers,
        body,
    })
}
