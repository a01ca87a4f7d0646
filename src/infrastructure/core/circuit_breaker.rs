use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,   // Requests pass through
    Open,     // Failure threshold breached, requests rejected
    HalfOpen, // Probing whether the provider recovered
}

/// Fails fast once an upstream provider keeps failing, and probes it again
/// after `cooldown`.
pub struct CircuitBreaker {
    name: String,
    failure_threshold: usize,
    success_threshold: usize,
    cooldown: Duration,
    state: RwLock<BreakerState>,
}

struct BreakerState {
    circuit: CircuitState,
    consecutive_failures: usize,
    consecutive_successes: usize,
    opened_at: Option<Instant>,
}

#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError<E> {
    #[error("Circuit breaker is open: {0}")]
    Open(String),

    #[error(transparent)]
    Inner(E),
}

impl CircuitBreaker {
    /// * `failure_threshold` - consecutive failures that open the circuit
    /// * `success_threshold` - consecutive HalfOpen successes that close it
    /// * `cooldown` - time spent Open before a probe is let through
    pub fn new(
        name: impl Into<String>,
        failure_threshold: usize,
        success_threshold: usize,
        cooldown: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            failure_threshold,
            success_threshold,
            cooldown,
            state: RwLock::new(BreakerState {
                circuit: CircuitState::Closed,
                consecutive_failures: 0,
                consecutive_successes: 0,
                opened_at: None,
            }),
        }
    }

    /// Runs `f` under the breaker; every error counts as a failure.
    pub async fn call<F, T, E>(&self, f: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: Future<Output = Result<T, E>>,
    {
        self.call_counting(f, |_| true).await
    }

    /// Runs `f` under the breaker. Errors for which `trips` returns false
    /// (a bad symbol, say) are passed through without counting against the
    /// provider.
    pub async fn call_counting<F, T, E>(
        &self,
        f: F,
        trips: impl Fn(&E) -> bool,
    ) -> Result<T, CircuitBreakerError<E>>
    where
        F: Future<Output = Result<T, E>>,
    {
        self.admit().await.map_err(CircuitBreakerError::Open)?;

        match f.await {
            Ok(value) => {
                self.on_success().await;
                Ok(value)
            }
            Err(e) => {
                if trips(&e) {
                    self.on_failure().await;
                } else {
                    self.on_success().await;
                }
                Err(CircuitBreakerError::Inner(e))
            }
        }
    }

    pub async fn state(&self) -> CircuitState {
        self.state.read().await.circuit
    }

    /// Err carries the rejection message while the circuit stays open
    async fn admit(&self) -> Result<(), String> {
        let mut state = self.state.write().await;
        if state.circuit != CircuitState::Open {
            return Ok(());
        }

        let elapsed = state.opened_at.map(|t| t.elapsed()).unwrap_or(self.cooldown);
        if elapsed >= self.cooldown {
            info!("CircuitBreaker [{}]: Open -> HalfOpen (cooldown elapsed)", self.name);
            state.circuit = CircuitState::HalfOpen;
            state.consecutive_successes = 0;
            Ok(())
        } else {
            Err(format!(
                "{} rejected calls, retry in {:?}",
                self.name,
                self.cooldown - elapsed
            ))
        }
    }

    async fn on_success(&self) {
        let mut state = self.state.write().await;
        match state.circuit {
            CircuitState::HalfOpen => {
                state.consecutive_successes += 1;
                if state.consecutive_successes >= self.success_threshold {
                    info!(
                        "CircuitBreaker [{}]: HalfOpen -> Closed ({} successes)",
                        self.name, state.consecutive_successes
                    );
                    state.circuit = CircuitState::Closed;
                    state.consecutive_failures = 0;
                    state.consecutive_successes = 0;
                    state.opened_at = None;
                }
            }
            CircuitState::Closed => state.consecutive_failures = 0,
            CircuitState::Open => {}
        }
    }

    async fn on_failure(&self) {
        let mut state = self.state.write().await;
        state.consecutive_failures += 1;

        match state.circuit {
            CircuitState::Closed if state.consecutive_failures >= self.failure_threshold => {
                error!(
                    "CircuitBreaker [{}]: Closed -> Open ({} failures)",
                    self.name, state.consecutive_failures
                );
                state.circuit = CircuitState::Open;
                state.opened_at = Some(Instant::now());
            }
            CircuitState::HalfOpen => {
                warn!("CircuitBreaker [{}]: HalfOpen -> Open (probe failed)", self.name);
                state.circuit = CircuitState::Open;
                state.consecutive_successes = 0;
                state.opened_at = Some(Instant::now());
            }
            _ => {}
        }
    }
}
