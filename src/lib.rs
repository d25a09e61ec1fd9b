//! Fintech API gateway library.
//!
//! Routes `/api/v1/*` requests to the owning backend service by longest
//! path prefix, guards each service with a circuit breaker, and retries
//! failed upstream calls with exponential backoff.

pub mod audit;
pub mod config;
pub mod forward;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod routing;
pub mod security;

pub use config::GatewayConfig;
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
