//! Circuit breaker for downstream protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: service assumed down, calls fail fast
//! - Half-Open: trial calls test whether the service recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: failures / requests >= failure_ratio within window
//!                (once min_requests samples are present)
//! Open → Half-Open: after cooldown
//! Half-Open → Closed: success_threshold trial calls succeed
//! Half-Open → Open: any trial call fails or is abandoned
//! ```
//!
//! # Design Decisions
//! - One breaker per service id, created on first use
//! - Callers decide what counts as a failure (`acceptable` predicate)
//! - The lock is never held across an await; permits settle outcomes
//! - A forced-open breaker stays open until reset

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::BreakerConfig;
use crate::observability::metrics;

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Returned when a breaker refuses a call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("circuit breaker open for service {service}")]
pub struct BreakerOpen {
    pub service: String,
    /// Time left until trial calls are allowed. `None` when the breaker was
    /// forced open or the half-open trial slots are taken.
    pub retry_after: Option<Duration>,
}

/// Point-in-time view of one breaker.
#[derive(Debug, Clone, Serialize)]
pub struct BreakerSnapshot {
    pub service: String,
    pub state: CircuitState,
    pub window_requests: usize,
    pub window_failures: usize,
    pub forced_open: bool,
}

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Success,
    Failure,
    Abandoned,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    /// Bumped on every transition; permits from older generations are ignored.
    generation: u64,
    /// (recorded at, failed) samples inside the window. Closed state only.
    samples: VecDeque<(Instant, bool)>,
    opened_at: Option<Instant>,
    forced_open: bool,
    trials_in_flight: u32,
    trial_successes: u32,
}

/// Breaker guarding a single downstream service.
#[derive(Debug)]
pub struct CircuitBreaker {
    service: String,
    config: BreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(service: impl Into<String>, config: BreakerConfig) -> Self {
        Self {
            service: service.into(),
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                generation: 0,
                samples: VecDeque::new(),
                opened_at: None,
                forced_open: false,
                trials_in_flight: 0,
                trial_successes: 0,
            }),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    fn lock(&self) -> MutexGuard<'_, BreakerInner> {
        // Critical sections never panic midway, so a poisoned state is still consistent.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current state. An open breaker whose cooldown elapsed still reports
    /// `Open` until the next call attempt moves it to half-open.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Ask permission to make a call. The returned permit must be settled
    /// with [`BreakerPermit::success`] or [`BreakerPermit::failure`].
    pub fn try_acquire(self: &Arc<Self>) -> Result<BreakerPermit, BreakerOpen> {
        let mut inner = self.lock();
        let now = Instant::now();

        match inner.state {
            CircuitState::Closed => Ok(self.permit(&inner, false)),
            CircuitState::Open => {
                let elapsed = inner
                    .opened_at
                    .map(|at| now.saturating_duration_since(at))
                    .unwrap_or_default();
                let cooldown = self.config.cooldown();

                if !inner.forced_open && elapsed >= cooldown {
                    self.transition(&mut inner, CircuitState::HalfOpen, now);
                    inner.trials_in_flight = 1;
                    Ok(self.permit(&inner, true))
                } else {
                    debug!(service = %self.service, "Circuit breaker is open, rejecting call");
                    Err(BreakerOpen {
                        service: self.service.clone(),
                        retry_after: (!inner.forced_open).then(|| cooldown - elapsed),
                    })
                }
            }
            CircuitState::HalfOpen => {
                if inner.trials_in_flight < self.config.half_open_max_calls {
                    inner.trials_in_flight += 1;
                    Ok(self.permit(&inner, true))
                } else {
                    debug!(service = %self.service, "Half-open trial slots taken, rejecting call");
                    Err(BreakerOpen {
                        service: self.service.clone(),
                        retry_after: None,
                    })
                }
            }
        }
    }

    /// Open the breaker and keep it open until [`reset`](Self::reset).
    pub fn force_open(&self) {
        let mut inner = self.lock();
        self.transition(&mut inner, CircuitState::Open, Instant::now());
        inner.forced_open = true;
    }

    /// Close the breaker and forget all samples (manual intervention).
    pub fn reset(&self) {
        let mut inner = self.lock();
        info!(service = %self.service, "Manually resetting circuit breaker");
        self.transition(&mut inner, CircuitState::Closed, Instant::now());
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let mut inner = self.lock();
        self.prune_samples(&mut inner, Instant::now());
        BreakerSnapshot {
            service: self.service.clone(),
            state: inner.state,
            window_requests: inner.samples.len(),
            window_failures: inner.samples.iter().filter(|(_, failed)| *failed).count(),
            forced_open: inner.forced_open,
        }
    }

    fn permit(self: &Arc<Self>, inner: &BreakerInner, trial: bool) -> BreakerPermit {
        BreakerPermit {
            breaker: Arc::clone(self),
            generation: inner.generation,
            trial,
            settled: false,
        }
    }

    fn settle(&self, generation: u64, outcome: Outcome) {
        let mut inner = self.lock();
        if inner.generation != generation {
            return;
        }
        let now = Instant::now();

        match inner.state {
            CircuitState::Closed => match outcome {
                Outcome::Success => self.record_sample(&mut inner, false, now),
                Outcome::Failure => self.record_sample(&mut inner, true, now),
                Outcome::Abandoned => {}
            },
            CircuitState::HalfOpen => {
                inner.trials_in_flight = inner.trials_in_flight.saturating_sub(1);
                match outcome {
                    Outcome::Success => {
                        inner.trial_successes += 1;
                        if inner.trial_successes >= self.config.success_threshold {
                            self.transition(&mut inner, CircuitState::Closed, now);
                        }
                    }
                    Outcome::Failure | Outcome::Abandoned => {
                        self.transition(&mut inner, CircuitState::Open, now);
                    }
                }
            }
            CircuitState::Open => {}
        }
    }

    fn record_sample(&self, inner: &mut BreakerInner, failed: bool, now: Instant) {
        inner.samples.push_back((now, failed));
        self.prune_samples(inner, now);

        if !failed {
            return;
        }

        let requests = inner.samples.len();
        let failures = inner.samples.iter().filter(|(_, failed)| *failed).count();
        if requests >= self.config.min_requests as usize
            && failures as f64 / requests as f64 >= self.config.failure_ratio
        {
            warn!(
                service = %self.service,
                failures,
                requests,
                "Circuit breaker opening, failure ratio exceeded"
            );
            self.transition(inner, CircuitState::Open, now);
        }
    }

    /// Drop samples that have left the window.
    fn prune_samples(&self, inner: &mut BreakerInner, now: Instant) {
        let window = self.config.window();
        while let Some(&(at, _)) = inner.samples.front() {
            if now.saturating_duration_since(at) >= window {
                inner.samples.pop_front();
            } else {
                break;
            }
        }
    }

    fn transition(&self, inner: &mut BreakerInner, to: CircuitState, now: Instant) {
        let from = inner.state;
        inner.state = to;
        inner.generation += 1;
        inner.samples.clear();
        inner.trials_in_flight = 0;
        inner.trial_successes = 0;
        inner.forced_open = false;
        inner.opened_at = (to == CircuitState::Open).then_some(now);

        match to {
            CircuitState::Open => warn!(service = %self.service, ?from, "Circuit breaker open"),
            CircuitState::HalfOpen => info!(service = %self.service, "Circuit breaker half-open, admitting trial calls"),
            CircuitState::Closed => info!(service = %self.service, ?from, "Circuit breaker closed"),
        }
        metrics::record_breaker_state(&self.service, to);
    }
}

/// Admission to make one call through a breaker.
///
/// Dropping an unsettled trial permit counts as a failed trial; dropping an
/// unsettled closed-state permit records nothing.
#[derive(Debug)]
#[must_use = "settle the permit with success() or failure()"]
pub struct BreakerPermit {
    breaker: Arc<CircuitBreaker>,
    generation: u64,
    trial: bool,
    settled: bool,
}

impl BreakerPermit {
    /// Whether this call is a half-open trial.
    pub fn is_trial(&self) -> bool {
        self.trial
    }

    pub fn success(mut self) {
        self.settled = true;
        self.breaker.settle(self.generation, Outcome::Success);
    }

    pub fn failure(mut self) {
        self.settled = true;
        self.breaker.settle(self.generation, Outcome::Failure);
    }
}

impl Drop for BreakerPermit {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.settle(self.generation, Outcome::Abandoned);
        }
    }
}

/// Breakers for all downstream services, keyed by service id.
#[derive(Debug, Clone)]
pub struct BreakerRegistry {
    breakers: Arc<DashMap<String, Arc<CircuitBreaker>>>,
    config: Arc<BreakerConfig>,
}

impl BreakerRegistry {
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            breakers: Arc::new(DashMap::new()),
            config: Arc::new(config),
        }
    }

    /// Get or create the breaker for a service.
    pub fn breaker(&self, service: &str) -> Arc<CircuitBreaker> {
        if let Some(breaker) = self.breakers.get(service) {
            return Arc::clone(breaker.value());
        }
        let entry = self
            .breakers
            .entry(service.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(service, (*self.config).clone())));
        Arc::clone(entry.value())
    }

    /// State for a service; services never called are closed.
    pub fn state(&self, service: &str) -> CircuitState {
        self.breakers
            .get(service)
            .map(|b| b.state())
            .unwrap_or(CircuitState::Closed)
    }

    pub fn force_open(&self, service: &str) {
        self.breaker(service).force_open();
    }

    pub fn reset(&self, service: &str) {
        let breaker = self.breakers.get(service).map(|b| Arc::clone(b.value()));
        if let Some(breaker) = breaker {
            breaker.reset();
        }
    }

    /// Snapshots of every known breaker, sorted by service id.
    pub fn snapshot(&self) -> Vec<BreakerSnapshot> {
        let breakers: Vec<_> = self.breakers.iter().map(|b| Arc::clone(b.value())).collect();
        let mut snapshots: Vec<_> = breakers.iter().map(|b| b.snapshot()).collect();
        snapshots.sort_by(|a, b| a.service.cmp(&b.service));
        snapshots
    }

    /// Run `body` under the service's breaker; every error counts as a failure.
    pub async fn do_with_fallback<T, E, F, Fut, FB>(
        &self,
        service: &str,
        body: F,
        fallback: FB,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        FB: FnOnce(BreakerOpen) -> E,
    {
        self.do_with_fallback_acceptable(service, body, fallback, |err: Option<&E>| err.is_none())
            .await
    }

    /// Run `body` under the service's breaker.
    ///
    /// `fallback` produces the error when the breaker refuses the call; `body`
    /// is not run in that case. `acceptable` receives the call's error (`None`
    /// on success) and returns true when the outcome should count as healthy.
    pub async fn do_with_fallback_acceptable<T, E, F, Fut, FB, A>(
        &self,
        service: &str,
        body: F,
        fallback: FB,
        acceptable: A,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        FB: FnOnce(BreakerOpen) -> E,
        A: FnOnce(Option<&E>) -> bool,
    {
        let breaker = self.breaker(service);
        let permit = match breaker.try_acquire() {
            Ok(permit) => permit,
            Err(open) => {
                metrics::record_rejected(service);
                return Err(fallback(open));
            }
        };

        let result = body().await;
        if acceptable(result.as_ref().err()) {
            permit.success();
        } else {
            permit.failure();
        }
        result
    }
}
