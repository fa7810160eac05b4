//! Retry logic with exponential backoff for generation requests
//!
//! The gateway sends one request per user turn. Transient failures
//! (network errors, timeouts, throttling) are retried here so a single
//! dropped connection does not cost the user a turn:
//! - Exponential backoff: 1s, 2s, 4s, capped at 8s, plus up to 10% jitter
//! - Throttling honours the service's `retry-after`, capped at `max_delay`
//! - Circuit breaker: 5 consecutive failures block requests for 30s
//! - Per-attempt timeout and a total budget for the whole operation

use crate::error::{InsightsError, InsightsResult};
use crate::logging::{log_debug, log_error, log_warn};

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::time::sleep;

/// Retry policy for generation requests
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Budget for the whole operation, retries included
    pub total_timeout: Duration,
    /// Timeout for a single attempt
    pub request_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(8),
            backoff_multiplier: 2.0,
            total_timeout: Duration::from_secs(180),
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Policy that sends exactly one attempt.
    pub fn no_retry(request_timeout: Duration) -> Self {
        Self {
            max_attempts: 1,
            total_timeout: request_timeout,
            request_timeout,
            ..Self::default()
        }
    }
}

/// Circuit breaker states
#[derive(Debug, Clone, PartialEq)]
pub enum CircuitState {
    Closed,   // Normal operation
    Open,     // Failing, blocking requests
    HalfOpen, // Probing whether the service recovered
}

/// Circuit breaker shared by all requests of one backend
#[derive(Debug)]
pub struct CircuitBreaker {
    pub(crate) state: CircuitState,
    pub(crate) failure_count: u32,
    pub(crate) last_failure_time: Option<Instant>,
    pub(crate) failure_threshold: u32,
    pub(crate) recovery_timeout: Duration,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            last_failure_time: None,
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(30),
        }
    }
}

impl CircuitBreaker {
    /// Check if a request may go through
    pub fn should_allow_request(&mut self) -> bool {
        match self.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => self.check_recovery_timeout(),
        }
    }

    fn check_recovery_timeout(&mut self) -> bool {
        let Some(last_failure) = self.last_failure_time else {
            return false;
        };

        if last_failure.elapsed() >= self.recovery_timeout {
            log_debug!(
                circuit_breaker = "transitioning_to_half_open",
                recovery_timeout_seconds = self.recovery_timeout.as_secs(),
                "Circuit breaker attempting recovery"
            );
            self.state = CircuitState::HalfOpen;
            true
        } else {
            false
        }
    }

    pub fn record_success(&mut self) {
        if self.state == CircuitState::HalfOpen {
            log_debug!(
                circuit_breaker = "recovered",
                "Circuit breaker recovered, returning to closed state"
            );
        }
        self.state = CircuitState::Closed;
        self.failure_count = 0;
        self.last_failure_time = None;
    }

    pub fn record_failure(&mut self) {
        self.failure_count += 1;
        self.last_failure_time = Some(Instant::now());

        if self.failure_count >= self.failure_threshold {
            if self.state != CircuitState::Open {
                log_warn!(
                    circuit_breaker = "opened",
                    failure_count = self.failure_count,
                    failure_threshold = self.failure_threshold,
                    recovery_timeout_seconds = self.recovery_timeout.as_secs(),
                    "Circuit breaker opened due to repeated failures"
                );
            }
            self.state = CircuitState::Open;
        }
    }

    pub fn state(&self) -> CircuitState {
        self.state.clone()
    }
}

/// Runs an operation under a [`RetryPolicy`] and a [`CircuitBreaker`].
///
/// The breaker lock is only held between attempts, never across an
/// `.await`, so concurrent sessions sharing one executor do not queue
/// behind each other's requests.
#[derive(Debug)]
pub struct RetryExecutor {
    pub(crate) policy: RetryPolicy,
    pub(crate) circuit_breaker: Mutex<CircuitBreaker>,
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            circuit_breaker: Mutex::new(CircuitBreaker::default()),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.breaker().state()
    }

    fn breaker(&self) -> MutexGuard<'_, CircuitBreaker> {
        self.circuit_breaker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Execute `operation` until it succeeds, fails permanently, or the
    /// policy is exhausted. The last error is returned on exhaustion.
    pub async fn execute<F, Fut, T>(&self, operation: F) -> InsightsResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = InsightsResult<T>>,
    {
        let start_time = Instant::now();
        let mut attempt = 0;
        let mut last_error = None;

        while attempt < self.policy.max_attempts {
            if !self.breaker().should_allow_request() {
                return Err(InsightsError::request_failed(
                    "Circuit breaker is open - service temporarily unavailable",
                    None,
                ));
            }
            if start_time.elapsed() >= self.policy.total_timeout {
                return Err(InsightsError::timeout(self.policy.total_timeout.as_secs()));
            }

            attempt += 1;
            log_debug!(
                attempt = attempt,
                max_attempts = self.policy.max_attempts,
                circuit_state = ?self.circuit_state(),
                "Executing request with retry logic"
            );

            let outcome = tokio::time::timeout(self.policy.request_timeout, operation()).await;
            let error = match outcome {
                Ok(Ok(value)) => {
                    self.breaker().record_success();
                    log_debug!(
                        attempt = attempt,
                        elapsed_ms = start_time.elapsed().as_millis(),
                        "Request succeeded"
                    );
                    return Ok(value);
                }
                Ok(Err(error)) => error,
                Err(_elapsed) => InsightsError::timeout(self.policy.request_timeout.as_secs()),
            };

            // Only transient failures count toward the breaker
            if error.is_retryable() {
                self.breaker().record_failure();
            }
            let retry = error.is_retryable() && attempt < self.policy.max_attempts;
            let delay = self.delay_for(&error, attempt);
            last_error = Some(error);

            if !retry {
                break;
            }

            log_debug!(
                attempt = attempt,
                delay_ms = delay.as_millis(),
                error = ?last_error.as_ref(),
                "Request failed, retrying after delay"
            );
            sleep(delay).await;
        }

        let final_error = last_error.unwrap_or_else(|| {
            InsightsError::request_failed("Maximum retry attempts exceeded", None)
        });

        log_error!(
            attempts = attempt,
            total_duration_ms = start_time.elapsed().as_millis(),
            circuit_state = ?self.circuit_state(),
            error = %final_error,
            "Request failed after all retry attempts"
        );

        Err(final_error)
    }

    fn delay_for(&self, error: &InsightsError, attempt: u32) -> Duration {
        match error {
            InsightsError::RateLimitExceeded {
                retry_after_seconds,
            } => Duration::from_secs(*retry_after_seconds).min(self.policy.max_delay),
            _ => self.calculate_delay(attempt),
        }
    }

    /// Exponential backoff delay for the given (1-based) attempt
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let delay_seconds =
            self.policy.initial_delay.as_secs_f64() * self.policy.backoff_multiplier.powi(exponent);
        let capped = delay_seconds.min(self.policy.max_delay.as_secs_f64());

        let jitter = fastrand::f64() * 0.1;
        Duration::from_secs_f64(capped * (1.0 + jitter))
    }
}
