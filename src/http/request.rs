//! Request handling and transformation.
//!
//! # Responsibilities
//! - Resolve the correlation ID (client supplied or generated)
//! - Capture what the forwarder needs from an inbound request
//!
//! # Design Decisions
//! - Correlation ID set as early as possible, by the outermost layer
//! - Only whitelisted headers are captured; nothing else can leak upstream

use axum::body::{Body, Bytes};
use axum::http::{request::Parts, HeaderMap, HeaderValue, Method, Request};
use axum::middleware::Next;
use axum::response::Response;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use uuid::Uuid;

use crate::forward::headers::{whitelist, X_CORRELATION_ID, X_USER_ID};

/// Layer that sets `X-Correlation-ID` on requests lacking one.
pub fn set_correlation_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(X_CORRELATION_ID, MakeRequestUuid)
}

/// Layer that echoes the request's `X-Correlation-ID` on the response.
pub fn propagate_correlation_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(X_CORRELATION_ID)
}

/// Visible ASCII and not blank.
fn usable_correlation_id(value: &HeaderValue) -> Option<&str> {
    value.to_str().ok().filter(|v| !v.trim().is_empty())
}

/// Middleware dropping a client correlation ID that cannot be logged or
/// forwarded, so the request-id layer replaces it and the echoed, logged
/// and forwarded IDs stay identical.
pub async fn drop_unusable_correlation_id(mut request: Request<Body>, next: Next) -> Response {
    let unusable = request
        .headers()
        .get(X_CORRELATION_ID)
        .is_some_and(|v| usable_correlation_id(v).is_none());
    if unusable {
        tracing::debug!("Discarding unusable client correlation ID");
        request.headers_mut().remove(X_CORRELATION_ID);
    }
    next.run(request).await
}

/// Correlation ID from the inbound headers, or a fresh UUID v4.
pub fn correlation_id(headers: &HeaderMap) -> String {
    headers
        .get(X_CORRELATION_ID)
        .and_then(usable_correlation_id)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Per-request data handed to the forwarder.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub correlation_id: String,
    pub method: Method,
    /// Full request path, forwarded unchanged.
    pub path: String,
    /// Whitelisted inbound headers.
    pub headers: HeaderMap,
    /// Raw query string, without the `?`.
    pub query: Option<String>,
    pub body: Bytes,
}

impl RequestContext {
    pub fn from_parts(parts: &Parts, body: Bytes) -> Self {
        Self {
            correlation_id: correlation_id(&parts.headers),
            method: parts.method.clone(),
            path: parts.uri.path().to_string(),
            headers: whitelist(&parts.headers),
            query: parts.uri.query().map(str::to_string),
            body,
        }
    }

    /// Caller identity set by the authentication layer, if any.
    pub fn user_id(&self) -> Option<&str> {
        self.headers.get(X_USER_ID).and_then(|v| v.to_str().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[test]
    fn captures_path_query_and_whitelisted_headers() {
        let (parts, _) = Request::builder()
            .method("POST")
            .uri("http://gw/api/v1/transfers?dry_run=true")
            .header("authorization", "Bearer t")
            .header("x-user-id", "7")
            .header("cookie", "a=b")
            .header("x-correlation-id", "abc-123")
            .body(())
            .unwrap()
            .into_parts();

        let ctx = RequestContext::from_parts(&parts, Bytes::from_static(b"{}"));
        assert_eq!(ctx.correlation_id, "abc-123");
        assert_eq!(ctx.method, Method::POST);
        assert_eq!(ctx.path, "/api/v1/transfers");
        assert_eq!(ctx.query.as_deref(), Some("dry_run=true"));
        assert_eq!(ctx.user_id(), Some("7"));
        assert!(ctx.headers.get("cookie").is_none());
        assert_eq!(ctx.body, Bytes::from_static(b"{}"));
    }

    #[test]
    fn generates_correlation_id_when_missing() {
        let id = correlation_id(&HeaderMap::new());
        assert!(Uuid::parse_str(&id).is_ok());
    }
}
