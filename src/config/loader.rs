//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Overrides the listener bind address.
pub const BIND_ADDRESS_ENV: &str = "GATEWAY_BIND_ADDRESS";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load, apply environment overrides to, and validate a TOML config file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config = load_from_str(&content)?;

    tracing::debug!(
        path = %path.display(),
        services = config.services.len(),
        "Configuration file read"
    );
    Ok(config)
}

/// Parse, apply environment overrides to, and validate TOML config text.
pub fn load_from_str(content: &str) -> Result<GatewayConfig, ConfigError> {
    let mut config: GatewayConfig = toml::from_str(content)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Replace values for which `lookup` yields an override.
///
/// Each service's `base_url` is read from `<NAME>_URL` (see
/// [`ServiceConfig::url_env_var`](crate::config::ServiceConfig::url_env_var)).
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(addr) = lookup(BIND_ADDRESS_ENV) {
        config.listener.bind_address = addr;
    }

    for service in &mut config.services {
        let var = service.url_env_var();
        if let Some(url) = lookup(&var) {
            tracing::info!(
                service = %service.name,
                env = %var,
                "Base URL overridden from environment"
            );
            service.base_url = url;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SAMPLE: &str = r#"
        [listener]
        bind_address = "127.0.0.1:8000"

        [[services]]
        name = "account-service"
        base_url = "http://account-service:8002"
        route_prefixes = ["/api/v1/accounts", "/api/v1/account-types"]
        retry_count = 2

        [[services]]
        name = "transaction-service"
        base_url = "http://transaction-service:8003"
        route_prefixes = ["/api/v1/transactions"]
        health_path = "/status"
    "#;

    #[test]
    fn parses_services_with_defaults() {
        let config: GatewayConfig = toml::from_str(SAMPLE).unwrap();
        assert!(validate_config(&config).is_ok());
        assert_eq!(config.services.len(), 2);

        let accounts = &config.services[0];
        assert_eq!(accounts.retry_count, 2);
        assert_eq!(accounts.failure_threshold, 5);
        assert_eq!(accounts.timeout_ms, 30_000);
        assert_eq!(accounts.health_path, "/health");
        assert_eq!(config.services[1].health_path, "/status");
        assert_eq!(config.forwarding.backoff_base_ms, 100);
    }

    #[test]
    fn env_overrides_base_url_and_bind_address() {
        let mut config: GatewayConfig = toml::from_str(SAMPLE).unwrap();
        let env: HashMap<&str, &str> = [
            ("ACCOUNT_SERVICE_URL", "http://10.0.0.5:9000"),
            (BIND_ADDRESS_ENV, "0.0.0.0:9999"),
        ]
        .into_iter()
        .collect();

        apply_env_overrides(&mut config, |key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.services[0].base_url, "http://10.0.0.5:9000");
        assert_eq!(config.services[1].base_url, "http://transaction-service:8003");
        assert_eq!(config.listener.bind_address, "0.0.0.0:9999");
    }

    #[test]
    fn validation_errors_surface_from_loader() {
        let err = load_from_str(
            r#"
            [[services]]
            name = "x"
            base_url = "ftp://x"
            route_prefixes = ["/api/v1/x"]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref v) if v.len() == 1));
        assert!(err.to_string().starts_with("Validation failed: "));
    }

    #[test]
    fn parse_errors_are_reported() {
        let err = load_from_str("[[services]]\nname = 5").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
