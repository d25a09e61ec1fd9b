//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse, deserialize, apply env overrides)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → ServiceRegistry / CircuitBreakerRegistry built once at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no runtime registration
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_from_str, ConfigError};
pub use schema::{
    ForwardingConfig, GatewayConfig, ListenerConfig, LogFormat, ObservabilityConfig,
    RateLimitConfig, ServiceConfig,
};
pub use validation::ValidationError;
