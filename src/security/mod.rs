//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (per-client token bucket, 429 on exhaustion)
//!     → Pass to routing
//! ```
//!
//! Authentication runs in front of the gateway; by the time a request gets
//! here its `X-User-ID` is trusted.

pub mod rate_limit;

pub use rate_limit::{rate_limit_middleware, RateLimiter};
