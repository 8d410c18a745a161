//! Outbound request construction from call arguments.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::client::transport::{ClientError, ClientResponse, HttpServiceClient};
use crate::endpoint::descriptor::HttpMethod;
use crate::http::request::Params;

/// Reserved argument addressing the target resource.
pub const ENTITY_KEY: &str = "entity";

/// Reserved argument naming the target app.
pub const APP_NAME_KEY: &str = "app_name";

/// Keyword arguments of a client-side endpoint call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs(Map<String, Value>);

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arguments taken from the fields of a serializable struct.
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self, ClientError> {
        match serde_json::to_value(value).map_err(ClientError::Arguments)? {
            Value::Object(map) => Ok(Self(map)),
            other => Err(ClientError::NotAnObject(other)),
        }
    }

    pub fn entity(self, entity: impl Into<String>) -> Self {
        self.arg(ENTITY_KEY, entity.into())
    }

    pub fn app_name(self, app_name: impl Into<String>) -> Self {
        self.arg(APP_NAME_KEY, app_name.into())
    }

    pub fn arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Split into `(app_name, entity, remaining params)`.
    pub fn into_parts(mut self) -> (Option<String>, Option<String>, Params) {
        let entity = self.0.remove(ENTITY_KEY).and_then(into_string);
        let app_name = self.0.remove(APP_NAME_KEY).and_then(into_string);
        (app_name, entity, self.0)
    }
}

impl From<Map<String, Value>> for CallArgs {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

fn into_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// Hand a call to the client transport and return its response verbatim.
pub async fn make_request(
    client: &dyn HttpServiceClient,
    method: HttpMethod,
    args: CallArgs,
) -> Result<ClientResponse, ClientError> {
    let (app_name, entity, params) = args.into_parts();
    tracing::debug!(
        app = ?app_name,
        method = %method,
        entity = ?entity,
        params = params.len(),
        "Sending service request"
    );
    client
        .send_http_request(app_name.as_deref(), method, entity.as_deref(), params)
        .await
}
