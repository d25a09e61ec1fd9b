//! HTTP surface of the gateway.
//!
//! # Data Flow
//! ```text
//! Client request
//!     → server.rs (Axum setup, correlation ID, tracing, rate limit)
//!     → handlers.rs (method check, route resolution, body read)
//!     → request.rs (RequestContext with whitelisted headers)
//!     → [forward layer calls the upstream]
//!     → response.rs (relay upstream answer or map the failure)
//!     → Send to client
//! ```

pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use request::RequestContext;
pub use response::DispatchError;
pub use server::{AppState, GatewayServer};
