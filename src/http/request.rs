//! Request handling and tracking-ID propagation.
//!
//! # Responsibilities
//! - Generate a tracking ID (UUID v4) when the caller did not send one
//! - Expose the tracking ID to everything running on behalf of the request
//! - Buffer the body once and parse it as form data, JSON, or query string
//!
//! # Design Decisions
//! - Tracking ID lives in a task-local, set by middleware before any handler
//! - Form decoding applies to `application/x-www-form-urlencoded` and
//!   `multipart/form-data`; multipart bodies are decoded once, when buffered
//! - The body size limit is whatever `DefaultBodyLimit` is in effect
//! - A body that is not valid JSON simply yields no structured parameters

use axum::{
    body::{Body, Bytes},
    extract::{
        rejection::{BytesRejection, FailedToBufferBody},
        FromRequest, FromRequestParts, Multipart, Path,
    },
    http::{header, request::Parts, HeaderMap, Method, Request, StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::future::Future;
use thiserror::Error;
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

/// Header carrying the tracking identifier between services.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Parameter set extracted from a request (query, form, or JSON object).
pub type Params = Map<String, Value>;

tokio::task_local! {
    static TRACKING_ID: Option<String>;
}

/// Tracking ID of the request currently being served, if any.
pub fn tracking_id() -> Option<String> {
    TRACKING_ID.try_with(Clone::clone).ok().flatten()
}

/// Run `fut` with `id` as its ambient tracking ID.
pub async fn with_tracking_id<F: Future>(id: Option<String>, fut: F) -> F::Output {
    TRACKING_ID.scope(id, fut).await
}

/// Middleware that scopes the `x-request-id` header into the task-local.
pub async fn tracking_id_middleware(request: Request<Body>, next: Next) -> Response {
    let id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    with_tracking_id(id, next.run(request)).await
}

/// Generates UUID v4 tracking IDs for requests that arrive without one.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeTrackingId;

impl MakeRequestId for MakeTrackingId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let value = Uuid::new_v4().to_string().parse().ok()?;
        Some(RequestId::new(value))
    }
}

/// Failure to buffer a request body.
#[derive(Debug, Error)]
#[error("failed to read request body: {0}")]
pub struct BodyError(#[from] BytesRejection);

impl BodyError {
    /// 413 when the body exceeded the limit, 400 for any other read failure.
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            BytesRejection::FailedToBufferBody(FailedToBufferBody::LengthLimitError(_)) => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for BodyError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

/// An incoming request with its body fully buffered.
#[derive(Debug)]
pub struct InboundRequest {
    parts: Parts,
    body: Bytes,
    multipart: Option<Params>,
    structured_body: bool,
}

impl InboundRequest {
    /// Buffer `request` under the `DefaultBodyLimit` in effect (axum's
    /// 2 MiB unless a layer sets another) and decode multipart form data.
    pub async fn from_http(request: Request<Body>) -> Result<Self, BodyError> {
        let (parts, body) = request.into_parts();
        let mut carrier = Request::new(body);
        *carrier.extensions_mut() = parts.extensions.clone();
        let body = Bytes::from_request(carrier, &()).await?;

        let multipart = decode_multipart(&parts, &body).await;
        Ok(Self {
            multipart,
            ..Self::from_parts(parts, body)
        })
    }

    /// Wrap an already buffered body. Multipart bodies are not decoded.
    pub fn from_parts(parts: Parts, body: Bytes) -> Self {
        Self {
            parts,
            body,
            multipart: None,
            structured_body: false,
        }
    }

    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn parts_mut(&mut self) -> &mut Parts {
        &mut self.parts
    }

    /// Path parameters captured by the route template.
    pub async fn path_params<T>(&mut self) -> Result<T, Response>
    where
        T: DeserializeOwned + Send,
    {
        Path::<T>::from_request_parts(&mut self.parts, &())
            .await
            .map(|Path(value)| value)
            .map_err(IntoResponse::into_response)
    }

    /// Query string parameters.
    pub fn query(&self) -> Params {
        decode_pairs(self.parts.uri.query().unwrap_or_default().as_bytes())
    }

    /// URL-encoded or multipart form parameters; empty for any other
    /// content type.
    pub fn form(&self) -> Params {
        if let Some(fields) = &self.multipart {
            return fields.clone();
        }
        let is_form = self
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.starts_with("application/x-www-form-urlencoded"))
            .unwrap_or(false);
        if is_form {
            decode_pairs(&self.body)
        } else {
            Params::new()
        }
    }

    /// The body parsed as JSON, if it is JSON.
    pub fn json(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }

    /// The body deserialized into `T`.
    pub fn json_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Top-level members of a JSON object body.
    pub fn json_params(&self) -> Params {
        match self.json() {
            Some(Value::Object(map)) => map,
            _ => Params::new(),
        }
    }

    /// Body parameters: form data, or the JSON object once the request has
    /// been switched to structured decoding.
    pub fn post(&self) -> Params {
        if self.structured_body {
            self.json_params()
        } else {
            self.form()
        }
    }

    /// Switch [`post`](Self::post) to JSON decoding when the body is JSON.
    /// Returns whether the switch happened.
    pub fn adopt_structured_body(&mut self) -> bool {
        if self.json().is_some() {
            self.structured_body = true;
        }
        self.structured_body
    }

    pub fn is_structured(&self) -> bool {
        self.structured_body
    }
}

/// Text fields by value and file fields by file name, for
/// `multipart/form-data` bodies only.
async fn decode_multipart(parts: &Parts, body: &Bytes) -> Option<Params> {
    let content_type = parts.headers.get(header::CONTENT_TYPE)?;
    if !content_type.to_str().ok()?.starts_with("multipart/form-data") {
        return None;
    }

    let mut carrier = Request::new(Body::from(body.clone()));
    carrier
        .headers_mut()
        .insert(header::CONTENT_TYPE, content_type.clone());
    *carrier.extensions_mut() = parts.extensions.clone();

    let mut multipart = match Multipart::from_request(carrier, &()).await {
        Ok(multipart) => multipart,
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring unreadable multipart body");
            return Some(Params::new());
        }
    };

    let mut fields = Params::new();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(error = %e, "Malformed multipart body; keeping fields read so far");
                break;
            }
        };
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        let value = match field.file_name().map(str::to_owned) {
            Some(file_name) => file_name,
            None => match field.text().await {
                Ok(text) => text,
                Err(e) => {
                    tracing::debug!(field = %name, error = %e, "Unreadable multipart field");
                    break;
                }
            },
        };
        fields.insert(name, Value::String(value));
    }
    Some(fields)
}

fn decode_pairs(input: &[u8]) -> Params {
    url::form_urlencoded::parse(input)
        .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
        .collect()
}
