//! Retry logic.
//!
//! # Responsibilities
//! - Repeat a failed call a bounded number of times
//! - Wait a fixed delay between attempts
//! - Abort the wait as soon as the caller cancels or its deadline passes
//!
//! # Design Decisions
//! - Fixed delay, no backoff: retry counts are small (0-3)
//! - Attempts are strictly sequential
//! - Cancellation is only observed between attempts; a running call
//!   honours its own deadline

use std::fmt::Display;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::RetryConfig;
use crate::observability::metrics;

/// Why a wait was cut short.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum Interrupted {
    #[error("cancelled")]
    Cancelled,
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

/// Caller-side cancellation signal and optional deadline.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an existing token, e.g. one tied to an inbound request.
    pub fn with_token(token: CancellationToken) -> Self {
        Self { token, deadline: None }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Deadline `timeout` from now. A timeout too large to represent leaves
    /// the context without a deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Instant::now().checked_add(timeout);
        self
    }

    /// A context cancelled together with this one, keeping its deadline.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether the context is already done, and why.
    pub fn interruption(&self) -> Option<Interrupted> {
        if self.token.is_cancelled() {
            Some(Interrupted::Cancelled)
        } else if self.deadline.is_some_and(|d| Instant::now() >= d) {
            Some(Interrupted::DeadlineExceeded)
        } else {
            None
        }
    }

    /// Sleep for `delay` unless the context finishes first.
    pub async fn sleep(&self, delay: Duration) -> Result<(), Interrupted> {
        if let Some(interrupted) = self.interruption() {
            return Err(interrupted);
        }

        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(Interrupted::Cancelled),
            _ = deadline_reached(self.deadline) => Err(Interrupted::DeadlineExceeded),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }
}

async fn deadline_reached(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Bounded fixed-delay retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts is `max_retries + 1`.
    pub max_retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    /// Single attempt, no retries.
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(config.max_retries, Duration::from_millis(config.retry_delay_ms))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

/// Drives the waits of a bounded retry loop.
///
/// The caller runs the attempt itself and, after a retryable failure, calls
/// [`wait_for_retry`](Self::wait_for_retry) to learn whether another attempt
/// may run.
#[derive(Debug)]
pub struct Retrier<'a> {
    ctx: &'a CallContext,
    service: &'a str,
    policy: RetryPolicy,
    retries: u32,
}

impl<'a> Retrier<'a> {
    pub fn new(ctx: &'a CallContext, service: &'a str, policy: RetryPolicy) -> Self {
        Self {
            ctx,
            service,
            policy,
            retries: 0,
        }
    }

    /// Retries performed so far.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Record a retryable failure and wait the fixed delay.
    ///
    /// Returns `Ok(false)` once the policy is exhausted, and the interruption
    /// if the context finishes during the wait.
    pub async fn wait_for_retry(&mut self, err: &(dyn Display + Sync)) -> Result<bool, Interrupted> {
        let service = self.service;
        if self.retries >= self.policy.max_retries {
            error!(
                service,
                retries = self.policy.max_retries,
                error = %err,
                "Call still failing after retries"
            );
            return Ok(false);
        }

        warn!(service, attempt = self.retries, error = %err, "Call failed");
        self.ctx.sleep(self.policy.delay).await?;
        self.retries += 1;

        info!(service, attempt = self.retries, "Retrying call");
        metrics::record_retry(service);
        Ok(true)
    }
}
