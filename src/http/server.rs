//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the dispatch core (registry, breakers, forwarder) from config
//! - Create the Axum router with all handlers
//! - Wire up middleware (correlation ID, tracing, optional rate limit)
//! - Serve until the shutdown signal fires

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware,
    routing::{any, get},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::audit::{AuditLogger, AuditSink, ChannelAuditSink};
use crate::config::GatewayConfig;
use crate::forward::{http_client, Forwarder};
use crate::health::HealthProber;
use crate::http::handlers;
use crate::http::request::{
    drop_unusable_correlation_id, propagate_correlation_id_layer, set_correlation_id_layer,
};
use crate::resilience::CircuitBreakerRegistry;
use crate::routing::ServiceRegistry;
use crate::security::{rate_limit_middleware, RateLimiter};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ServiceRegistry>,
    pub forwarder: Arc<Forwarder>,
    pub prober: Arc<HealthProber>,
    pub audit: Arc<dyn AuditSink>,
    pub max_body_bytes: usize,
}

/// HTTP server for the gateway.
pub struct GatewayServer {
    router: Router,
    config: GatewayConfig,
    registry: Arc<ServiceRegistry>,
    breakers: Arc<CircuitBreakerRegistry>,
    audit_logger: Option<AuditLogger>,
}

impl GatewayServer {
    /// Create a server whose audit events go to the `audit` log target.
    pub fn new(config: GatewayConfig) -> Self {
        let (sink, rx) = ChannelAuditSink::new();
        let mut server = Self::with_audit_sink(config, Arc::new(sink));
        server.audit_logger = Some(AuditLogger::new(rx));
        server
    }

    /// Create a server reporting audit events to `audit`.
    pub fn with_audit_sink(config: GatewayConfig, audit: Arc<dyn AuditSink>) -> Self {
        let registry = Arc::new(ServiceRegistry::from_config(&config.services));
        let breakers = Arc::new(CircuitBreakerRegistry::from_registry(&registry));

        let client = http_client();
        let forwarder = Arc::new(Forwarder::new(
            client.clone(),
            Arc::clone(&breakers),
            &config.forwarding,
        ));
        let prober = Arc::new(HealthProber::new(
            client,
            Duration::from_millis(config.forwarding.probe_timeout_ms),
        ));

        let state = AppState {
            registry: Arc::clone(&registry),
            forwarder,
            prober,
            audit,
            max_body_bytes: config.listener.max_body_bytes,
        };

        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            registry,
            breakers,
            audit_logger: None,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        let mut router = Router::new()
            .route("/health", get(handlers::health))
            .route("/api/v1/services", get(handlers::services))
            .route("/api/v1/{*path}", any(handlers::proxy))
            .fallback(handlers::not_found)
            .with_state(state);

        if config.rate_limit.enabled {
            let limiter = Arc::new(RateLimiter::new(&config.rate_limit));
            router = router.layer(middleware::from_fn_with_state(limiter, rate_limit_middleware));
        }

        // Last added runs first: the correlation ID is checked and set before
        // tracing starts and is copied onto every response.
        router
            .layer(propagate_correlation_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_correlation_id_layer())
            .layer(middleware::from_fn(drop_unusable_correlation_id))
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            services = self.registry.len(),
            "Gateway listening"
        );

        if let Some(logger) = self.audit_logger {
            tokio::spawn(logger.run());
        }

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Router without a listener, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn registry(&self) -> Arc<ServiceRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn breakers(&self) -> Arc<CircuitBreakerRegistry> {
        Arc::clone(&self.breakers)
    }
}
