//! Retrying upstream forwarder.
//!
//! # Responsibilities
//! - Gate every call on the service's circuit breaker
//! - Run up to `retry_count` attempts, each under the service timeout
//! - Sleep an exponential backoff between attempts
//! - Record exactly one breaker success or failure per attempted call
//!
//! # Design Decisions
//! - Any answer below 500 ends the loop, 4xx included
//! - 5xx answers, timeouts and transport errors are retried
//! - Only the classification of the last attempt decides the final status

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::config::ForwardingConfig;
use crate::forward::headers::upstream_headers;
use crate::forward::outcome::{ErrorKind, ForwardError, ForwardOutcome};
use crate::http::request::RequestContext;
use crate::observability::metrics;
use crate::resilience::{backoff_delay, CircuitBreakerRegistry};
use crate::routing::ServiceDescriptor;

/// HTTP client used for upstream calls and health probes.
pub type HttpClient = Client<HttpConnector, Body>;

/// Build the shared upstream client.
pub fn http_client() -> HttpClient {
    Client::builder(TokioExecutor::new())
        .pool_idle_timeout(Duration::from_secs(30))
        .build(HttpConnector::new())
}

/// Executes proxied calls against backend services.
#[derive(Debug, Clone)]
pub struct Forwarder {
    client: HttpClient,
    breakers: Arc<CircuitBreakerRegistry>,
    backoff_base: Duration,
    max_response_bytes: usize,
}

impl Forwarder {
    pub fn new(
        client: HttpClient,
        breakers: Arc<CircuitBreakerRegistry>,
        config: &ForwardingConfig,
    ) -> Self {
        Self {
            client,
            breakers,
            backoff_base: Duration::from_millis(config.backoff_base_ms),
            max_response_bytes: config.max_response_bytes,
        }
    }

    pub fn breakers(&self) -> &Arc<CircuitBreakerRegistry> {
        &self.breakers
    }

    /// Forward one request to `service`.
    ///
    /// Returns the first answer below 500, or the reason none was obtained.
    pub async fn call(
        &self,
        service: &ServiceDescriptor,
        request: &RequestContext,
    ) -> Result<ForwardOutcome, ForwardError> {
        if self.breakers.is_open(&service.name) {
            tracing::warn!(
                correlation_id = %request.correlation_id,
                service = %service.name,
                "Circuit open, rejecting request"
            );
            return Err(ForwardError::CircuitOpen {
                service: service.name.clone(),
            });
        }

        let attempts = service.retry_count.max(1);
        let mut last_kind = ErrorKind::UpstreamError;

        for attempt in 0..attempts {
            let outcome = self.attempt(service, request).await;
            metrics::record_upstream_attempt(&service.name, outcome.label());

            match outcome.error_kind {
                None => {
                    tracing::debug!(
                        correlation_id = %request.correlation_id,
                        service = %service.name,
                        attempt = attempt + 1,
                        status = %outcome.status,
                        "Upstream answered"
                    );
                    self.breakers.record_success(&service.name);
                    return Ok(outcome);
                }
                Some(kind) => {
                    tracing::warn!(
                        correlation_id = %request.correlation_id,
                        service = %service.name,
                        attempt = attempt + 1,
                        max_attempts = attempts,
                        kind = %kind,
                        status = %outcome.status,
                        "Upstream attempt failed"
                    );
                    last_kind = kind;
                }
            }

            if attempt + 1 < attempts {
                let delay = backoff_delay(attempt, self.backoff_base);
                tracing::debug!(
                    correlation_id = %request.correlation_id,
                    service = %service.name,
                    delay = ?delay,
                    "Retrying request"
                );
                tokio::time::sleep(delay).await;
            }
        }

        self.breakers.record_failure(&service.name);
        tracing::error!(
            correlation_id = %request.correlation_id,
            service = %service.name,
            attempts,
            kind = %last_kind,
            "Upstream attempts exhausted"
        );
        Err(ForwardError::Exhausted {
            service: service.name.clone(),
            kind: last_kind,
            attempts,
        })
    }

    /// One request/response exchange, bounded by the service timeout.
    async fn attempt(
        &self,
        service: &ServiceDescriptor,
        request: &RequestContext,
    ) -> ForwardOutcome {
        let url = service.upstream_url(&request.path, request.query.as_deref());

        let mut builder = Request::builder().method(request.method.clone()).uri(url.as_str());
        if let Some(headers) = builder.headers_mut() {
            headers.extend(upstream_headers(&request.headers, &request.correlation_id));
        }
        let upstream = match builder.body(Body::from(request.body.clone())) {
            Ok(req) => req,
            Err(e) => {
                tracing::error!(url = %url, error = %e, "Failed to build upstream request");
                return ForwardOutcome::failed(ErrorKind::UpstreamError);
            }
        };

        let exchange = async {
            let response = self.client.request(upstream).await.map_err(|e| {
                let kind = if e.is_connect() {
                    ErrorKind::ConnectionError
                } else {
                    ErrorKind::UpstreamError
                };
                tracing::debug!(url = %url, error = ?e, kind = %kind, "Upstream transport error");
                kind
            })?;

            let (parts, body) = response.into_parts();
            let bytes = axum::body::to_bytes(Body::new(body), self.max_response_bytes)
                .await
                .map_err(|e| {
                    tracing::debug!(url = %url, error = %e, "Failed to read upstream body");
                    ErrorKind::UpstreamError
                })?;

            Ok::<_, ErrorKind>(ForwardOutcome::from_response(parts.status, bytes))
        };

        match tokio::time::timeout(service.timeout, exchange).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(kind)) => ForwardOutcome::failed(kind),
            Err(_) => ForwardOutcome::failed(ErrorKind::Timeout),
        }
    }
}
