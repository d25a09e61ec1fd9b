//! Immutable description of one backend service.

use std::time::Duration;

use crate::config::ServiceConfig;
use crate::resilience::circuit_breaker::BreakerSettings;

/// A backend service as seen by the dispatch core.
///
/// Built once from [`ServiceConfig`] at startup and shared behind `Arc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    pub name: String,
    /// Base URL without a trailing slash.
    pub base_url: String,
    pub health_path: String,
    /// Route prefixes in declaration order.
    pub route_prefixes: Vec<String>,
    /// Deadline for a single upstream attempt.
    pub timeout: Duration,
    /// Maximum attempts per proxied call (at least 1).
    pub retry_count: u32,
    pub breaker: BreakerSettings,
}

impl ServiceDescriptor {
    /// Upstream URL for a request path (and optional query string).
    pub fn upstream_url(&self, path: &str, query: Option<&str>) -> String {
        match query {
            Some(q) if !q.is_empty() => format!("{}{}?{}", self.base_url, path, q),
            _ => format!("{}{}", self.base_url, path),
        }
    }

    /// URL probed by the services view.
    pub fn health_url(&self) -> String {
        format!("{}{}", self.base_url, self.health_path)
    }
}

impl From<&ServiceConfig> for ServiceDescriptor {
    fn from(config: &ServiceConfig) -> Self {
        let mut prefixes: Vec<String> = Vec::with_capacity(config.route_prefixes.len());
        for prefix in &config.route_prefixes {
            if !prefixes.contains(prefix) {
                prefixes.push(prefix.clone());
            }
        }

        Self {
            name: config.name.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            health_path: config.health_path.clone(),
            route_prefixes: prefixes,
            timeout: Duration::from_millis(config.timeout_ms),
            retry_count: config.retry_count.max(1),
            breaker: BreakerSettings {
                failure_threshold: config.failure_threshold.max(1),
                recovery_timeout: Duration::from_millis(config.recovery_timeout_ms),
            },
        }
    }
}
