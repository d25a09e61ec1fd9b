//! Request handlers: health, services view, and the proxy entry point.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::task::JoinError;

use crate::audit::{AuditEvent, AuditOutcome};
use crate::health::ServiceStatus;
use crate::http::request::RequestContext;
use crate::http::response::{relay, DispatchError};
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::resilience::{CircuitBreakerRegistry, CircuitState};

/// One entry of the services view.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceView {
    pub status: ServiceStatus,
    pub url: String,
    pub routes: Vec<String>,
    pub circuit_breaker_state: CircuitState,
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "services": state.registry.names(),
    }))
}

/// `GET /api/v1/services`: probe every service and report breaker state.
pub async fn services(State(state): State<AppState>) -> Json<BTreeMap<String, ServiceView>> {
    let services = state.registry.services();
    let statuses = state.prober.probe_all(services).await;
    let breakers = state.forwarder.breakers();

    let view = services
        .iter()
        .zip(statuses)
        .map(|(service, status)| {
            (
                service.name.clone(),
                ServiceView {
                    status,
                    url: service.base_url.clone(),
                    routes: service.route_prefixes.clone(),
                    circuit_breaker_state: breakers.state(&service.name),
                },
            )
        })
        .collect();

    Json(view)
}

/// Fallback for paths outside the gateway surface.
pub async fn not_found(request: Request<Body>) -> Response {
    tracing::debug!(path = %request.uri().path(), "No gateway route");
    DispatchError::NotFound(request.uri().path().to_string()).into_response()
}

fn is_supported(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::POST | Method::PUT | Method::DELETE)
}

/// The forwarding task died before recording its outcome. Count it as a
/// failure so a lost Half-Open trial reopens the circuit.
fn forwarding_task_lost(
    breakers: &CircuitBreakerRegistry,
    service: &str,
    correlation_id: &str,
    error: &JoinError,
) -> Response {
    tracing::error!(
        correlation_id = %correlation_id,
        service = %service,
        error = %error,
        "Forwarding task failed"
    );
    breakers.record_failure(service);
    DispatchError::Internal(error.to_string()).into_response()
}

/// `/api/v1/*`: resolve the owning service and forward.
pub async fn proxy(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    if !is_supported(&method) {
        tracing::warn!(method = %method, path = %path, "Unsupported method");
        metrics::record_request(method.as_str(), 405, "none", start);
        return DispatchError::MethodNotAllowed(method).into_response();
    }

    let Some(service) = state.registry.resolve(&path) else {
        tracing::warn!(path = %path, "No service matched");
        metrics::record_request(method.as_str(), 404, "none", start);
        return DispatchError::NotFound(path).into_response();
    };

    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(
                path = %path,
                error = %e,
                limit = state.max_body_bytes,
                "Failed to read request body"
            );
            metrics::record_request(method.as_str(), 413, &service.name, start);
            return DispatchError::PayloadTooLarge(state.max_body_bytes).into_response();
        }
    };
    let context = RequestContext::from_parts(&parts, body);

    tracing::debug!(
        correlation_id = %context.correlation_id,
        method = %method,
        path = %path,
        service = %service.name,
        "Dispatching request"
    );

    let mut event = AuditEvent::now(
        &context.correlation_id,
        &service.name,
        method.as_str(),
        &path,
        context.user_id(),
    );

    // Run on its own task so a client disconnect cannot abort the attempt
    // loop between the breaker check and its success/failure record.
    let forwarder = Arc::clone(&state.forwarder);
    let target = Arc::clone(&service);
    let result = tokio::spawn(async move { forwarder.call(&target, &context).await }).await;

    let response = match result {
        Ok(Ok(outcome)) => {
            event.outcome = AuditOutcome::Relayed;
            relay(outcome)
        }
        Ok(Err(e)) => {
            event.outcome = match e.error_kind() {
                None => AuditOutcome::Rejected,
                Some(_) => AuditOutcome::Failed,
            };
            event.error_kind = e.error_kind();
            DispatchError::from(e).into_response()
        }
        Err(e) => {
            event.outcome = AuditOutcome::Failed;
            forwarding_task_lost(
                state.forwarder.breakers(),
                &service.name,
                &event.correlation_id,
                &e,
            )
        }
    };

    let status = response.status().as_u16();
    event.status = status;
    event.duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
    state.audit.notify(event);
    metrics::record_request(method.as_str(), status, &service.name, start);

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::BreakerSettings;
    use axum::http::StatusCode;
    use std::time::Duration;

    #[test]
    fn only_crud_methods_are_supported() {
        for method in [Method::GET, Method::POST, Method::PUT, Method::DELETE] {
            assert!(is_supported(&method));
        }
        for method in [Method::PATCH, Method::HEAD, Method::OPTIONS, Method::TRACE] {
            assert!(!is_supported(&method));
        }
    }

    #[test]
    fn service_view_uses_camel_case_keys() {
        let view = ServiceView {
            status: ServiceStatus::Healthy,
            url: "http://ledger:8004".into(),
            routes: vec!["/api/v1/ledger".into()],
            circuit_breaker_state: CircuitState::HalfOpen,
        };
        let value = serde_json::to_value(&view).unwrap();
        assert_eq!(value["status"], "healthy");
        assert_eq!(value["circuitBreakerState"], "half-open");
        assert_eq!(value["routes"][0], "/api/v1/ledger");
    }

    #[tokio::test]
    async fn lost_trial_reopens_the_circuit() {
        let breakers = CircuitBreakerRegistry::new([(
            "ledger-service".to_string(),
            BreakerSettings {
                failure_threshold: 1,
                recovery_timeout: Duration::ZERO,
            },
        )]);
        breakers.record_failure("ledger-service");
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(!breakers.is_open("ledger-service"));
        assert_eq!(breakers.state("ledger-service"), CircuitState::HalfOpen);

        let error = tokio::spawn(async { panic!("forwarder crashed") }).await.unwrap_err();
        let response = forwarding_task_lost(&breakers, "ledger-service", "c-9", &error);

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(breakers.state("ledger-service"), CircuitState::Open);
    }
}
