//! Client transport collaborator and its reqwest implementation.

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::config::ClientConfig;
use crate::endpoint::descriptor::HttpMethod;
use crate::http::request::{tracking_id, Params, X_REQUEST_ID};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("unknown app `{0}`")]
    UnknownApp(String),

    #[error("no app named in the call and no default app configured")]
    NoApp,

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid call arguments: {0}")]
    Arguments(serde_json::Error),

    #[error("call arguments must be an object, got {0}")]
    NotAnObject(Value),

    #[error("invalid response body: {0}")]
    Body(serde_json::Error),
}

/// Response of another service, as received.
#[derive(Debug, Clone)]
pub struct ClientResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl ClientResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        serde_json::from_slice(&self.body).map_err(ClientError::Body)
    }
}

/// Anything that can carry an endpoint call to another service
/// (the client role).
#[async_trait]
pub trait HttpServiceClient: Send + Sync {
    async fn send_http_request(
        &self,
        app_name: Option<&str>,
        method: HttpMethod,
        entity: Option<&str>,
        params: Params,
    ) -> Result<ClientResponse, ClientError>;
}

/// [`HttpServiceClient`] over a pooled `reqwest::Client`.
///
/// Apps are resolved through the `[clients.apps]` table; the entity is
/// appended to the app's base path. Body verbs send params as JSON, the
/// others as a query string.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    apps: HashMap<String, Url>,
    default_app: Option<String>,
}

impl ReqwestTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        let apps = config
            .apps
            .iter()
            .map(|(name, base)| Ok((name.clone(), Url::parse(base)?)))
            .collect::<Result<HashMap<_, _>, url::ParseError>>()?;

        Ok(Self {
            client,
            apps,
            default_app: config.default_app.clone(),
        })
    }

    /// URL of `entity` within `app_name` (or the default app).
    pub fn url_for(&self, app_name: Option<&str>, entity: Option<&str>) -> Result<Url, ClientError> {
        let app = app_name
            .or(self.default_app.as_deref())
            .ok_or(ClientError::NoApp)?;
        let mut url = self
            .apps
            .get(app)
            .cloned()
            .ok_or_else(|| ClientError::UnknownApp(app.to_string()))?;

        if let Some(entity) = entity {
            let path = format!(
                "{}/{}",
                url.path().trim_end_matches('/'),
                entity.trim_start_matches('/')
            );
            url.set_path(&path);
        }
        Ok(url)
    }
}

#[async_trait]
impl HttpServiceClient for ReqwestTransport {
    async fn send_http_request(
        &self,
        app_name: Option<&str>,
        method: HttpMethod,
        entity: Option<&str>,
        params: Params,
    ) -> Result<ClientResponse, ClientError> {
        let url = self.url_for(app_name, entity)?;
        let mut request = self.client.request(method.to_http(), url);

        if method.carries_body() {
            request = request.json(&params);
        } else if !params.is_empty() {
            let pairs: Vec<(String, String)> = params
                .into_iter()
                .map(|(key, value)| (key, query_value(value)))
                .collect();
            request = request.query(&pairs);
        }

        if let Some(id) = tracking_id() {
            request = request.header(X_REQUEST_ID, id);
        }

        let response = request.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        Ok(ClientResponse::new(status, headers, body))
    }
}

fn query_value(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}
