//! Required-parameter validation.
//!
//! Body verbs (POST/PUT/PATCH/DELETE) read form data first and fall back to
//! a JSON object body; every other verb reads the query string.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::endpoint::descriptor::HttpMethod;
use crate::http::request::{InboundRequest, Params};

/// Parameters visible to validation for this request.
pub fn request_params(request: &InboundRequest) -> Params {
    let carries_body = HttpMethod::from_http(request.method())
        .map(HttpMethod::carries_body)
        .unwrap_or(false);

    if carries_body {
        let form = request.post();
        if form.is_empty() {
            request.json_params()
        } else {
            form
        }
    } else {
        request.query()
    }
}

/// Required names absent from `present`, in declaration order.
pub fn missing_params<'a>(required: &'a [String], present: &Params) -> Vec<&'a str> {
    required
        .iter()
        .filter(|name| !present.contains_key(name.as_str()))
        .map(String::as_str)
        .collect()
}

/// The 400 response sent instead of invoking the handler.
pub fn missing_params_response(missing: &[&str]) -> Response {
    let body = json!({
        "error": format!("Required params {} not found", missing.join(",")),
    });
    (
        StatusCode::BAD_REQUEST,
        [(header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use axum::http::{Method, Request};

    fn request(method: Method, uri: &str, content_type: &str, body: &str) -> InboundRequest {
        let (parts, _) = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, content_type)
            .body(())
            .unwrap()
            .into_parts();
        InboundRequest::from_parts(parts, Bytes::from(body.to_string()))
    }

    fn required(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_get_reads_query() {
        let req = request(Method::GET, "/u?id=1", "text/plain", "name=x");
        let params = request_params(&req);
        assert_eq!(missing_params(&required(&["id", "name"]), &params), vec!["name"]);
    }

    #[test]
    fn test_post_form_then_json_fallback() {
        let form = request(
            Method::POST,
            "/u?name=q",
            "application/x-www-form-urlencoded",
            "id=1",
        );
        assert!(missing_params(&required(&["id"]), &request_params(&form)).is_empty());

        let json = request(Method::PUT, "/u", "application/json", r#"{"id": 3}"#);
        assert!(missing_params(&required(&["id"]), &request_params(&json)).is_empty());

        // Query parameters never satisfy a body verb.
        assert_eq!(
            missing_params(&required(&["id", "name"]), &request_params(&form)),
            vec!["name"]
        );
    }

    #[test]
    fn test_unparsable_body_misses_everything() {
        let req = request(Method::PATCH, "/u", "application/json", "{not json");
        assert_eq!(
            missing_params(&required(&["a", "b"]), &request_params(&req)),
            vec!["a", "b"]
        );
    }

    #[tokio::test]
    async fn test_missing_params_response() {
        let response = missing_params_response(&["a", "b"]);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value, json!({"error": "Required params a,b not found"}));
    }
}
