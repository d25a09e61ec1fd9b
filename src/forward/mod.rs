//! Upstream forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! RequestContext + ServiceDescriptor
//!     → forwarder.rs (breaker gate, attempt loop, backoff)
//!     → headers.rs (whitelist + correlation ID)
//!     → upstream HTTP call (hyper client, per-attempt timeout)
//!     → outcome.rs (classify: success / timeout / connection / upstream)
//!     → ForwardOutcome or ForwardError back to the facade
//! ```

pub mod forwarder;
pub mod headers;
pub mod outcome;

pub use forwarder::{http_client, Forwarder, HttpClient};
pub use headers::{X_CORRELATION_ID, X_USER_ID};
pub use outcome::{ErrorKind, ForwardError, ForwardOutcome};
