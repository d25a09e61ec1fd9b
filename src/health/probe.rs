//! Active health probing.
//!
//! # Responsibilities
//! - Probe each service's health path on demand
//! - Report healthy/unavailable for the services view
//!
//! Probe results are informational only. They never touch the circuit
//! breakers, which are driven solely by proxied traffic.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use futures_util::future::join_all;
use serde::Serialize;
use tokio::time;

use crate::forward::HttpClient;
use crate::routing::ServiceDescriptor;

/// Result of one probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Healthy,
    Unavailable,
}

/// Probes service health endpoints with a short timeout.
#[derive(Debug, Clone)]
pub struct HealthProber {
    client: HttpClient,
    timeout: Duration,
}

impl HealthProber {
    pub fn new(client: HttpClient, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// `Healthy` iff the health path answers 2xx within the timeout.
    pub async fn probe(&self, service: &ServiceDescriptor) -> ServiceStatus {
        let url = service.health_url();

        let request = match Request::builder()
            .method("GET")
            .uri(url.as_str())
            .header("user-agent", "fintech-gateway-health-check")
            .body(Body::empty())
        {
            Ok(req) => req,
            Err(e) => {
                tracing::error!(
                    service = %service.name,
                    error = %e,
                    "Failed to build health check request"
                );
                return ServiceStatus::Unavailable;
            }
        };

        match time::timeout(self.timeout, self.client.request(request)).await {
            Ok(Ok(response)) if response.status().is_success() => ServiceStatus::Healthy,
            Ok(Ok(response)) => {
                tracing::warn!(
                    service = %service.name,
                    status = %response.status(),
                    "Health check failed: non-success status"
                );
                ServiceStatus::Unavailable
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    service = %service.name,
                    error = ?e,
                    "Health check failed: connection error"
                );
                ServiceStatus::Unavailable
            }
            Err(_) => {
                tracing::warn!(service = %service.name, "Health check failed: timeout");
                ServiceStatus::Unavailable
            }
        }
    }

    /// Probe every service concurrently, results in input order.
    pub async fn probe_all(&self, services: &[Arc<ServiceDescriptor>]) -> Vec<ServiceStatus> {
        join_all(services.iter().map(|s| self.probe(s))).await
    }
}
