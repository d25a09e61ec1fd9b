//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, thresholds >= 1)
//! - Detect prefixes claimed by more than one service
//! - Keep route prefixes inside the proxied `/api/v1/` namespace
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::GatewayConfig;

/// Namespace the proxy is mounted under.
pub const API_PREFIX: &str = "/api/v1/";

/// Served by the gateway itself; no service may claim it.
pub const SERVICES_VIEW_PATH: &str = "/api/v1/services";

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid bind address {0:?}")]
    BindAddress(String),

    #[error("service #{0} has an empty name")]
    EmptyName(usize),

    #[error("service {0:?} is declared more than once")]
    DuplicateService(String),

    #[error("service {service:?}: invalid base_url {url:?} ({reason})")]
    BaseUrl {
        service: String,
        url: String,
        reason: String,
    },

    #[error("service {0:?} declares no route prefixes")]
    NoRoutes(String),

    #[error("service {service:?}: path {path:?} must start with '/'")]
    RelativePath { service: String, path: String },

    #[error("service {service:?}: route prefix {prefix:?} is outside /api/v1/")]
    OutsideApi { service: String, prefix: String },

    #[error("service {service:?}: route prefix {prefix:?} is reserved by the gateway")]
    ReservedPrefix { service: String, prefix: String },

    #[error("route prefix {prefix:?} is claimed by both {first:?} and {second:?}")]
    DuplicatePrefix {
        prefix: String,
        first: String,
        second: String,
    },

    #[error("service {service:?}: {field} must be at least 1")]
    ZeroValue { service: String, field: &'static str },

    #[error("rate_limit: {0} must be at least 1 when enabled")]
    RateLimit(&'static str),
}

/// Validate a parsed configuration, collecting every error found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    let mut names = HashSet::new();
    let mut prefixes: HashMap<&str, &str> = HashMap::new();

    for (index, service) in config.services.iter().enumerate() {
        let name = service.name.as_str();
        if name.trim().is_empty() {
            errors.push(ValidationError::EmptyName(index));
        } else if !names.insert(name) {
            errors.push(ValidationError::DuplicateService(name.to_string()));
        }

        if let Err(reason) = check_base_url(&service.base_url) {
            errors.push(ValidationError::BaseUrl {
                service: name.to_string(),
                url: service.base_url.clone(),
                reason,
            });
        }

        if !service.health_path.starts_with('/') {
            errors.push(ValidationError::RelativePath {
                service: name.to_string(),
                path: service.health_path.clone(),
            });
        }

        if service.route_prefixes.is_empty() {
            errors.push(ValidationError::NoRoutes(name.to_string()));
        }

        for prefix in &service.route_prefixes {
            if !prefix.starts_with('/') {
                errors.push(ValidationError::RelativePath {
                    service: name.to_string(),
                    path: prefix.clone(),
                });
                continue;
            }
            if !prefix.starts_with(API_PREFIX) || prefix.len() == API_PREFIX.len() {
                errors.push(ValidationError::OutsideApi {
                    service: name.to_string(),
                    prefix: prefix.clone(),
                });
                continue;
            }
            if prefix.trim_end_matches('/') == SERVICES_VIEW_PATH {
                errors.push(ValidationError::ReservedPrefix {
                    service: name.to_string(),
                    prefix: prefix.clone(),
                });
                continue;
            }
            if let Some(first) = prefixes.insert(prefix.as_str(), name) {
                errors.push(ValidationError::DuplicatePrefix {
                    prefix: prefix.clone(),
                    first: first.to_string(),
                    second: name.to_string(),
                });
            }
        }

        for (field, value) in [
            ("timeout_ms", service.timeout_ms),
            ("retry_count", u64::from(service.retry_count)),
            ("failure_threshold", u64::from(service.failure_threshold)),
        ] {
            if value == 0 {
                errors.push(ValidationError::ZeroValue {
                    service: name.to_string(),
                    field,
                });
            }
        }
    }

    if config.rate_limit.enabled {
        if config.rate_limit.requests_per_second == 0 {
            errors.push(ValidationError::RateLimit("requests_per_second"));
        }
        if config.rate_limit.burst_size == 0 {
            errors.push(ValidationError::RateLimit("burst_size"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_base_url(raw: &str) -> Result<(), String> {
    let url = Url::parse(raw).map_err(|e| e.to_string())?;
    if url.scheme() != "http" {
        return Err(format!("unsupported scheme {:?}", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    Ok(())
}
