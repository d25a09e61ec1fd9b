//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, body limit).
    pub listener: ListenerConfig,

    /// Backend service definitions, in declaration order.
    pub services: Vec<ServiceConfig>,

    /// Retry backoff and health probe settings.
    pub forwarding: ForwardingConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: String,

    /// Maximum inbound request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
            max_body_bytes: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// A backend service the gateway dispatches to.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// Unique service name (also the circuit breaker key).
    pub name: String,

    /// Base URL requests are forwarded to (e.g., "http://account-service:8002").
    pub base_url: String,

    /// Path probed by the services view.
    #[serde(default = "default_health_path")]
    pub health_path: String,

    /// Path prefixes routed to this service.
    pub route_prefixes: Vec<String>,

    /// Per-attempt upstream timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum attempts per proxied call.
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Failed calls before the circuit opens.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Time the circuit stays open before a trial call, in milliseconds.
    #[serde(default = "default_recovery_timeout_ms")]
    pub recovery_timeout_ms: u64,
}

fn default_health_path() -> String {
    "/health".to_string()
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_retry_count() -> u32 {
    3
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_recovery_timeout_ms() -> u64 {
    60_000
}

impl ServiceConfig {
    /// Build a service entry with default timeouts and thresholds.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        route_prefixes: &[&str],
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            health_path: default_health_path(),
            route_prefixes: route_prefixes.iter().map(|p| p.to_string()).collect(),
            timeout_ms: default_timeout_ms(),
            retry_count: default_retry_count(),
            failure_threshold: default_failure_threshold(),
            recovery_timeout_ms: default_recovery_timeout_ms(),
        }
    }

    /// Environment variable that overrides `base_url`, e.g. `ACCOUNT_SERVICE_URL`.
    pub fn url_env_var(&self) -> String {
        let mut var: String = self
            .name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
            .collect();
        var.push_str("_URL");
        var
    }
}

/// Forwarding behaviour shared by all services.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ForwardingConfig {
    /// Base delay for exponential backoff in milliseconds.
    pub backoff_base_ms: u64,

    /// Timeout for the services view health probes in milliseconds.
    pub probe_timeout_ms: u64,

    /// Maximum upstream response body size in bytes.
    pub max_response_bytes: usize,
}

impl Default for ForwardingConfig {
    fn default() -> Self {
        Self {
            backoff_base_ms: 100,
            probe_timeout_ms: 5_000,
            max_response_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Sustained requests per second per client.
    pub requests_per_second: u32,

    /// Burst capacity.
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            requests_per_second: 100,
            burst_size: 50,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
