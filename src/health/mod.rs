//! Health reporting subsystem.
//!
//! # Data Flow
//! ```text
//! GET /api/v1/services
//!     → probe.rs (concurrent GET of every health path, short timeout)
//!     → combined with read-only breaker snapshots
//!     → per-service status view
//! ```
//!
//! # Design Decisions
//! - Probing is on demand, not periodic
//! - Probes never feed the circuit breakers

pub mod probe;

pub use probe::{HealthProber, ServiceStatus};
