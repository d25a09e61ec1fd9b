//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Proxied call:
//!     → circuit_breaker.rs (gate: reject fast while Open)
//!     → forwarder attempts, sleeping backoff.rs delays between them
//!     → circuit_breaker.rs (record exactly one success or failure)
//! ```
//!
//! # Design Decisions
//! - Every upstream attempt has a deadline
//! - Backoff is bounded by the per-service attempt count
//! - Circuit breaker prevents cascading failures and retry storms

pub mod backoff;
pub mod circuit_breaker;

pub use backoff::backoff_delay;
pub use circuit_breaker::{
    BreakerSettings, BreakerState, BreakerTransition, CircuitBreakerRegistry, CircuitState,
};
