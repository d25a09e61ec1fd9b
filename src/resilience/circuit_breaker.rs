//! Circuit breaker for backend protection.
//!
//! # States
//! - Closed: normal operation, requests pass through
//! - Open: backend assumed down, requests fail fast
//! - Half-Open: one trial request is testing if the backend recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure_count >= failure_threshold
//! Open → Half-Open: first gate check after recovery_timeout has elapsed
//! Half-Open → Closed: trial call succeeds (failure_count reset to 0)
//! Half-Open → Open: trial call fails (recovery window restarts)
//! ```
//!
//! # Design Decisions
//! - Per-service circuit breaker (not global), one mutex each
//! - Fail fast in Open state (no waiting for timeout)
//! - Single trial in Half-Open: the gate check that performs the
//!   Open → Half-Open transition is the only caller let through
//! - A success while Closed leaves earlier failures counted; only a
//!   successful trial clears them

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::observability::metrics;
use crate::routing::ServiceRegistry;

/// Breaker state of one service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half-open",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Thresholds for one service's breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerSettings {
    /// Failed calls (while Closed) that open the circuit.
    pub failure_threshold: u32,
    /// How long the circuit stays Open before a trial call.
    pub recovery_timeout: Duration,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
        }
    }
}

/// Point-in-time copy of a service's breaker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakerState {
    pub service_name: String,
    pub state: CircuitState,
    pub failure_count: u32,
    pub last_failure_at: Option<Instant>,
}

impl BreakerState {
    fn new(service_name: &str) -> Self {
        Self {
            service_name: service_name.to_string(),
            state: CircuitState::Closed,
            failure_count: 0,
            last_failure_at: None,
        }
    }
}

/// Published on every state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakerTransition {
    pub service: String,
    pub from: CircuitState,
    pub to: CircuitState,
}

#[derive(Debug)]
struct ServiceBreaker {
    settings: BreakerSettings,
    state: Mutex<BreakerState>,
}

impl ServiceBreaker {
    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        // Every critical section leaves the state consistent, so a panic
        // elsewhere while holding the lock does not invalidate it.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Owns the breaker of every service, keyed by service name.
///
/// State is only reachable through [`is_open`](Self::is_open),
/// [`record_success`](Self::record_success) and
/// [`record_failure`](Self::record_failure); each runs under the
/// service's own mutex, so transitions for one service are linearizable
/// while different services never contend.
#[derive(Debug)]
pub struct CircuitBreakerRegistry {
    breakers: DashMap<String, Arc<ServiceBreaker>>,
    settings: HashMap<String, BreakerSettings>,
    default_settings: BreakerSettings,
    transitions: broadcast::Sender<BreakerTransition>,
}

impl CircuitBreakerRegistry {
    /// Create a registry with per-service thresholds.
    ///
    /// Services not listed get [`BreakerSettings::default`].
    pub fn new<I>(settings: I) -> Self
    where
        I: IntoIterator<Item = (String, BreakerSettings)>,
    {
        let (transitions, _) = broadcast::channel(64);
        Self {
            breakers: DashMap::new(),
            settings: settings.into_iter().collect(),
            default_settings: BreakerSettings::default(),
            transitions,
        }
    }

    /// Take thresholds from the service registry.
    pub fn from_registry(registry: &ServiceRegistry) -> Self {
        Self::new(
            registry
                .services()
                .iter()
                .map(|s| (s.name.clone(), s.breaker)),
        )
    }

    /// Receive every subsequent state transition.
    pub fn subscribe(&self) -> broadcast::Receiver<BreakerTransition> {
        self.transitions.subscribe()
    }

    fn breaker(&self, service: &str) -> Arc<ServiceBreaker> {
        if let Some(existing) = self.breakers.get(service) {
            return Arc::clone(existing.value());
        }

        let settings = self
            .settings
            .get(service)
            .copied()
            .unwrap_or(self.default_settings);

        self.breakers
            .entry(service.to_string())
            .or_insert_with(|| {
                tracing::debug!(service = %service, "Circuit breaker created");
                Arc::new(ServiceBreaker {
                    settings,
                    state: Mutex::new(BreakerState::new(service)),
                })
            })
            .value()
            .clone()
    }

    /// Gate a call: `true` means reject without contacting the service.
    ///
    /// When the circuit is Open and the recovery timeout has passed, this
    /// call moves it to Half-Open and returns `false`, making the caller the
    /// trial. While the trial is in flight every other caller is rejected.
    pub fn is_open(&self, service: &str) -> bool {
        let breaker = self.breaker(service);
        let mut state = breaker.lock();

        match state.state {
            CircuitState::Closed => false,
            CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let recovered = state
                    .last_failure_at
                    .map_or(true, |at| at.elapsed() > breaker.settings.recovery_timeout);
                if recovered {
                    state.state = CircuitState::HalfOpen;
                    self.emit(service, CircuitState::Open, CircuitState::HalfOpen);
                    false
                } else {
                    true
                }
            }
        }
    }

    /// Record a call that got a non-5xx answer.
    pub fn record_success(&self, service: &str) {
        let breaker = self.breaker(service);
        let mut state = breaker.lock();

        if state.state == CircuitState::HalfOpen {
            state.state = CircuitState::Closed;
            state.failure_count = 0;
            self.emit(service, CircuitState::HalfOpen, CircuitState::Closed);
        }
    }

    /// Record a call that exhausted its attempts.
    pub fn record_failure(&self, service: &str) {
        let breaker = self.breaker(service);
        let mut state = breaker.lock();

        state.failure_count = state.failure_count.saturating_add(1);
        state.last_failure_at = Some(Instant::now());

        let from = state.state;
        let opens = match from {
            CircuitState::Closed => state.failure_count >= breaker.settings.failure_threshold,
            CircuitState::HalfOpen => true,
            CircuitState::Open => false,
        };

        if opens {
            state.state = CircuitState::Open;
            self.emit(service, from, CircuitState::Open);
        }
    }

    /// Read-only copy of a service's breaker.
    pub fn snapshot(&self, service: &str) -> BreakerState {
        self.breaker(service).lock().clone()
    }

    /// Current state of a service's breaker, without side effects.
    pub fn state(&self, service: &str) -> CircuitState {
        self.breaker(service).lock().state
    }

    fn emit(&self, service: &str, from: CircuitState, to: CircuitState) {
        match to {
            CircuitState::Open => {
                tracing::warn!(service = %service, from = %from, "Circuit opened");
            }
            _ => {
                tracing::info!(service = %service, from = %from, to = %to, "Circuit state changed");
            }
        }
        metrics::record_breaker_transition(service, to);

        // No subscribers is fine.
        let _ = self.transitions.send(BreakerTransition {
            service: service.to_string(),
            from,
            to,
        });
    }
}
