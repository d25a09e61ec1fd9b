//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header::CONTENT_TYPE, HeaderMap, Method, Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;

use fintech_gateway::audit::{AuditEvent, AuditSink};
use fintech_gateway::config::{GatewayConfig, ServiceConfig};
use fintech_gateway::lifecycle::Shutdown;
use fintech_gateway::resilience::CircuitBreakerRegistry;
use fintech_gateway::GatewayServer;

/// What the mock backend answers for one hit.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub body: String,
    pub delay: Duration,
}

impl Reply {
    pub fn json(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn ok() -> Self {
        Self::json(200, r#"{"ok":true}"#)
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// A request the mock backend received.
#[derive(Debug, Clone)]
pub struct Hit {
    pub at: Instant,
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

type Behavior = dyn Fn(usize) -> Reply + Send + Sync;

struct BackendState {
    hits: Mutex<Vec<Hit>>,
    behavior: Box<Behavior>,
}

/// Programmable upstream bound to an ephemeral local port.
#[derive(Clone)]
pub struct MockBackend {
    pub addr: SocketAddr,
    state: Arc<BackendState>,
}

impl MockBackend {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn hits(&self) -> Vec<Hit> {
        self.state.hits.lock().unwrap().clone()
    }

    pub fn hit_count(&self) -> usize {
        self.state.hits.lock().unwrap().len()
    }
}

async fn handle(State(state): State<Arc<BackendState>>, request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, usize::MAX).await.unwrap_or_default();

    let index = {
        let mut hits = state.hits.lock().unwrap();
        hits.push(Hit {
            at: Instant::now(),
            method: parts.method.clone(),
            path: parts.uri.path().to_string(),
            query: parts.uri.query().map(str::to_string),
            headers: parts.headers.clone(),
            body,
        });
        hits.len() - 1
    };

    let reply = (state.behavior)(index);
    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }

    let status = StatusCode::from_u16(reply.status).unwrap();
    (status, [(CONTENT_TYPE, "application/json")], reply.body).into_response()
}

/// Start a backend whose reply depends on the zero-based hit index.
pub async fn start_backend<F>(behavior: F) -> MockBackend
where
    F: Fn(usize) -> Reply + Send + Sync + 'static,
{
    let state = Arc::new(BackendState {
        hits: Mutex::new(Vec::new()),
        behavior: Box::new(behavior),
    });
    let app = Router::new().fallback(handle).with_state(Arc::clone(&state));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockBackend { addr, state }
}

/// An address nothing listens on.
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

/// Audit sink that keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl AuditSink for RecordingSink {
    fn notify(&self, event: AuditEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// A running gateway on an ephemeral port.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub breakers: Arc<CircuitBreakerRegistry>,
    pub audit: Arc<RecordingSink>,
    pub client: reqwest::Client,
    shutdown: Shutdown,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.unwrap()
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Service config with test-friendly limits.
pub fn service(name: &str, base_url: &str, prefixes: &[&str]) -> ServiceConfig {
    let mut service = ServiceConfig::new(name, base_url, prefixes);
    service.timeout_ms = 2_000;
    service
}

pub async fn spawn_gateway(services: Vec<ServiceConfig>) -> TestGateway {
    let mut config = GatewayConfig::default();
    config.services = services;
    spawn_gateway_with(config).await
}

pub async fn spawn_gateway_with(config: GatewayConfig) -> TestGateway {
    let audit = Arc::new(RecordingSink::default());
    let server = GatewayServer::with_audit_sink(config, Arc::clone(&audit) as Arc<dyn AuditSink>);
    let breakers = server.breakers();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        server.run(listener, rx).await.unwrap();
    });

    TestGateway {
        addr,
        breakers,
        audit,
        client: reqwest::Client::new(),
        shutdown,
    }
}
