//! Response shaping.
//!
//! # Responsibilities
//! - Relay upstream answers to the client as JSON, status untouched
//! - Map dispatch failures to fixed statuses with `{"error": ...}` bodies
//!
//! # Design Decisions
//! - The facade never reinterprets a forwarder result
//! - Non-JSON upstream bodies are relayed as a JSON string, empty ones as `{}`

use axum::body::Bytes;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use thiserror::Error;

use crate::forward::{ForwardError, ForwardOutcome};

/// Value of the `Allow` header on 405 responses.
pub const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE";

/// Why the gateway answered instead of the upstream.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no service registered for {0}")]
    NotFound(String),

    #[error("method {0} not allowed")]
    MethodNotAllowed(Method),

    #[error("request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    #[error("rate limit exceeded")]
    RateLimited,

    #[error(transparent)]
    Forward(#[from] ForwardError),

    #[error("forwarding task failed: {0}")]
    Internal(String),
}

impl DispatchError {
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::NotFound(_) => StatusCode::NOT_FOUND,
            DispatchError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            DispatchError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            DispatchError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            DispatchError::Forward(e) => e.status(),
            DispatchError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message; internal details stay in the logs.
    pub fn message(&self) -> &'static str {
        match self {
            DispatchError::NotFound(_) => "Service not found",
            DispatchError::MethodNotAllowed(_) => "Method not allowed",
            DispatchError::PayloadTooLarge(_) => "Request body too large",
            DispatchError::RateLimited => "Rate limit exceeded",
            DispatchError::Forward(e) => e.message(),
            DispatchError::Internal(_) => "Internal gateway error",
        }
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.message() }));
        let mut response = (self.status(), body).into_response();
        if let DispatchError::MethodNotAllowed(_) = self {
            response
                .headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static(ALLOWED_METHODS));
        }
        response
    }
}

/// Interpret an upstream body as JSON.
pub fn json_body(body: &Bytes) -> Value {
    if body.iter().all(u8::is_ascii_whitespace) {
        return json!({});
    }
    serde_json::from_slice(body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()))
}

/// Relay an upstream answer.
pub fn relay(outcome: ForwardOutcome) -> Response {
    (outcome.status, Json(json_body(&outcome.body))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forward::ErrorKind;

    #[test]
    fn json_bodies_pass_through() {
        let body = Bytes::from_static(br#"{"id": 5, "balance": "10.00"}"#);
        assert_eq!(json_body(&body), json!({"id": 5, "balance": "10.00"}));
        assert_eq!(json_body(&Bytes::from_static(b"[1,2]")), json!([1, 2]));
    }

    #[test]
    fn non_json_bodies_become_strings() {
        assert_eq!(json_body(&Bytes::from_static(b"plain text")), json!("plain text"));
        assert_eq!(json_body(&Bytes::new()), json!({}));
        assert_eq!(json_body(&Bytes::from_static(b" \n")), json!({}));
    }

    #[test]
    fn relay_keeps_upstream_status() {
        let body = Bytes::from_static(br#"{"detail":"no"}"#);
        let outcome = ForwardOutcome::from_response(StatusCode::NOT_FOUND, body);
        assert_eq!(relay(outcome).status(), StatusCode::NOT_FOUND);
    }

    fn exhausted(kind: ErrorKind) -> DispatchError {
        ForwardError::Exhausted {
            service: "s".into(),
            kind,
            attempts: 3,
        }
        .into()
    }

    #[test]
    fn dispatch_errors_map_to_fixed_statuses() {
        let cases = [
            (DispatchError::NotFound("/x".into()), StatusCode::NOT_FOUND),
            (DispatchError::MethodNotAllowed(Method::PATCH), StatusCode::METHOD_NOT_ALLOWED),
            (DispatchError::PayloadTooLarge(10), StatusCode::PAYLOAD_TOO_LARGE),
            (DispatchError::RateLimited, StatusCode::TOO_MANY_REQUESTS),
            (
                ForwardError::CircuitOpen { service: "s".into() }.into(),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (exhausted(ErrorKind::Timeout), StatusCode::GATEWAY_TIMEOUT),
            (exhausted(ErrorKind::ConnectionError), StatusCode::SERVICE_UNAVAILABLE),
            (exhausted(ErrorKind::UpstreamError), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn method_not_allowed_lists_allowed_methods() {
        let response = DispatchError::MethodNotAllowed(Method::PATCH).into_response();
        assert_eq!(response.headers()[header::ALLOW], ALLOWED_METHODS);
    }
}
