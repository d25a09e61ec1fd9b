//! Header whitelist for upstream requests.
//!
//! Only credentials, content type and the caller identity set by the auth
//! layer travel upstream, plus the correlation ID. Everything else the client
//! sent (cookies, hop-by-hop headers, spoofed forwarding headers) is dropped.

use axum::http::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

/// Correlation ID header, accepted from clients and injected upstream.
pub const X_CORRELATION_ID: HeaderName = HeaderName::from_static("x-correlation-id");

/// Caller identity set by the authentication layer.
pub const X_USER_ID: HeaderName = HeaderName::from_static("x-user-id");

/// Inbound headers copied to the upstream request.
pub const FORWARDED_HEADERS: [HeaderName; 3] = [AUTHORIZATION, CONTENT_TYPE, X_USER_ID];

/// Keep only whitelisted headers (all values of each).
pub fn whitelist(inbound: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for name in &FORWARDED_HEADERS {
        for value in inbound.get_all(name) {
            headers.append(name.clone(), value.clone());
        }
    }
    headers
}

/// Whitelisted headers plus the correlation ID.
pub fn upstream_headers(inbound: &HeaderMap, correlation_id: &str) -> HeaderMap {
    let mut headers = whitelist(inbound);
    match HeaderValue::from_str(correlation_id) {
        Ok(value) => {
            headers.insert(X_CORRELATION_ID, value);
        }
        Err(_) => {
            tracing::warn!(
                correlation_id = %correlation_id,
                "Correlation ID is not a valid header value"
            );
        }
    }
    headers
}
