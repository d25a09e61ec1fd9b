//! Attempt outcomes and the forwarding error taxonomy.

use std::fmt;

use axum::body::Bytes;
use axum::http::StatusCode;
use serde::Serialize;
use thiserror::Error;

/// Why an upstream attempt did not produce a usable answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The attempt exceeded the service timeout.
    Timeout,
    /// Connection refused, DNS failure, or any other connect-phase error.
    ConnectionError,
    /// Any other failure, including a 5xx answer from the service.
    UpstreamError,
}

impl ErrorKind {
    /// Status returned to the client when attempts run out on this kind.
    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorKind::ConnectionError => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::UpstreamError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing error message.
    pub fn message(self) -> &'static str {
        match self {
            ErrorKind::Timeout => "Service timeout",
            ErrorKind::ConnectionError => "Service unavailable",
            ErrorKind::UpstreamError => "Internal service error",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Timeout => "timeout",
            ErrorKind::ConnectionError => "connection_error",
            ErrorKind::UpstreamError => "upstream_error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one upstream attempt.
///
/// `error_kind == None` means the service answered below 500. Failed
/// attempts carry either the service's own 5xx or the synthetic status of
/// their kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardOutcome {
    pub status: StatusCode,
    pub body: Bytes,
    pub error_kind: Option<ErrorKind>,
}

impl ForwardOutcome {
    /// Classify a response the service actually sent.
    pub fn from_response(status: StatusCode, body: Bytes) -> Self {
        let error_kind = (status.as_u16() >= 500).then_some(ErrorKind::UpstreamError);
        Self {
            status,
            body,
            error_kind,
        }
    }

    /// An attempt that produced no response.
    pub fn failed(kind: ErrorKind) -> Self {
        Self {
            status: kind.status(),
            body: Bytes::new(),
            error_kind: Some(kind),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error_kind.is_none()
    }

    /// Metrics label for this attempt.
    pub fn label(&self) -> &'static str {
        self.error_kind.map_or("success", ErrorKind::as_str)
    }
}

/// A proxied call that produced no relayable answer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForwardError {
    #[error("circuit open for {service}")]
    CircuitOpen { service: String },

    #[error("{service}: {kind} after {attempts} attempt(s)")]
    Exhausted {
        service: String,
        kind: ErrorKind,
        attempts: u32,
    },
}

impl ForwardError {
    pub fn status(&self) -> StatusCode {
        match self {
            ForwardError::CircuitOpen { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ForwardError::Exhausted { kind, .. } => kind.status(),
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ForwardError::CircuitOpen { .. } => "Service temporarily unavailable",
            ForwardError::Exhausted { kind, .. } => kind.message(),
        }
    }

    /// The last attempt's classification, if any attempt was made.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            ForwardError::CircuitOpen { .. } => None,
            ForwardError::Exhausted { kind, .. } => Some(*kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausted_kinds_map_to_gateway_statuses() {
        assert_eq!(ErrorKind::Timeout.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(ErrorKind::ConnectionError.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(ErrorKind::UpstreamError.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn server_errors_are_failed_attempts() {
        let outcome =
            ForwardOutcome::from_response(StatusCode::BAD_GATEWAY, Bytes::from_static(b"oops"));
        assert_eq!(outcome.error_kind, Some(ErrorKind::UpstreamError));
        assert_eq!(outcome.status, StatusCode::BAD_GATEWAY);
        assert_eq!(outcome.label(), "upstream_error");
    }

    #[test]
    fn nonstandard_statuses_above_599_are_failed_attempts() {
        for code in [600, 799, 999] {
            let status = StatusCode::from_u16(code).unwrap();
            let outcome = ForwardOutcome::from_response(status, Bytes::new());
            assert_eq!(outcome.error_kind, Some(ErrorKind::UpstreamError), "{code}");
        }
    }

    #[test]
    fn client_errors_are_successful_attempts() {
        for status in [StatusCode::OK, StatusCode::NOT_FOUND, StatusCode::UNPROCESSABLE_ENTITY] {
            let outcome = ForwardOutcome::from_response(status, Bytes::new());
            assert!(outcome.is_success(), "{status} should not count as a failure");
        }
    }

    #[test]
    fn circuit_open_is_503_without_kind() {
        let err = ForwardError::CircuitOpen { service: "ledger".into() };
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.message(), "Service temporarily unavailable");
        assert!(err.error_kind().is_none());

        let err = ForwardError::Exhausted {
            service: "ledger".into(),
            kind: ErrorKind::Timeout,
            attempts: 3,
        };
        assert_eq!(err.to_string(), "ledger: timeout after 3 attempt(s)");
    }
}
