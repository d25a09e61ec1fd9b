//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path
//!     → registry.rs (longest-prefix lookup)
//!     → Return: ServiceDescriptor or no match (404)
//!
//! Registry construction (at startup):
//!     ServiceConfig[]
//!     → descriptor.rs (normalize URL, dedupe prefixes, durations)
//!     → Freeze as immutable ServiceRegistry
//! ```
//!
//! # Design Decisions
//! - Services compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same path always resolves to the same service

pub mod descriptor;
pub mod registry;

pub use descriptor::ServiceDescriptor;
pub use registry::ServiceRegistry;
