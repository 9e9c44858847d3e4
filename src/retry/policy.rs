//! Retry Mechanism Module
//!
//! A `RetryPolicy` is an immutable value attached to each request: how many
//! times a failed attempt may be repeated, how long to wait in between, and a
//! predicate deciding whether a given failure is worth repeating at all.

use rand::Rng;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use crate::error::{HttpClientError, Result};
use crate::utils::cancel::CancelHandle;

/// Predicate deciding whether a failure is retryable.
pub type RetryCondition = Arc<dyn Fn(&HttpClientError) -> bool + Send + Sync>;

/// Retry policy configuration
#[derive(Clone)]
pub struct RetryPolicy {
    /// Number of retries after the first attempt
    pub max_retry_count: u32,
    /// Delay before the first retry
    pub delay: Duration,
    /// Backoff multiplier (1.0 keeps the delay constant)
    pub backoff_multiplier: f64,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Whether to add jitter to delays
    pub use_jitter: bool,
    /// Maximum jitter percentage (0.0 to 1.0)
    pub jitter_factor: f64,
    /// Custom retry condition; `HttpClientError::is_retryable` when unset
    pub retry_condition: Option<RetryCondition>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retry_count", &self.max_retry_count)
            .field("delay", &self.delay)
            .field("backoff_multiplier", &self.backoff_multiplier)
            .field("max_delay", &self.max_delay)
            .field("use_jitter", &self.use_jitter)
            .field("custom_condition", &self.retry_condition.is_some())
            .finish()
    }
}

impl RetryPolicy {
    /// Constant-delay policy.
    pub fn new(max_retry_count: u32, delay: Duration) -> Self {
        Self {
            max_retry_count,
            delay,
            backoff_multiplier: 1.0,
            max_delay: Duration::from_secs(60),
            use_jitter: false,
            jitter_factor: 0.1,
            retry_condition: None,
        }
    }

    /// Never retry.
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Three retries with exponential backoff and jitter.
    pub fn standard() -> Self {
        Self::new(3, Duration::from_millis(500))
            .with_backoff_multiplier(2.0)
            .with_jitter(true)
    }

    /// Set maximum retries
    pub const fn with_max_retry_count(mut self, max_retry_count: u32) -> Self {
        self.max_retry_count = max_retry_count;
        self
    }

    /// Set the base delay
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Set maximum delay
    pub const fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set backoff multiplier
    pub const fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Enable or disable jitter
    pub const fn with_jitter(mut self, use_jitter: bool) -> Self {
        self.use_jitter = use_jitter;
        self
    }

    /// Set jitter factor
    pub fn with_jitter_factor(mut self, factor: f64) -> Self {
        self.jitter_factor = factor.clamp(0.0, 1.0);
        self
    }

    /// Set custom retry condition
    pub fn with_retry_condition<F>(mut self, condition: F) -> Self
    where
        F: Fn(&HttpClientError) -> bool + Send + Sync + 'static,
    {
        self.retry_condition = Some(Arc::new(condition));
        self
    }

    /// Check if an error should be retried
    pub fn should_retry(&self, error: &HttpClientError) -> bool {
        if let Some(condition) = &self.retry_condition {
            condition(error)
        } else {
            error.is_retryable()
        }
    }

    /// Calculate delay for a given attempt
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let base_delay =
            self.delay.as_millis() as f64 * self.backoff_multiplier.powi(attempt as i32);

        let delay = Duration::from_millis(base_delay as u64).min(self.max_delay);

        if self.use_jitter {
            self.add_jitter(delay).min(self.max_delay)
        } else {
            delay
        }
    }

    /// Add jitter to a delay
    fn add_jitter(&self, delay: Duration) -> Duration {
        let mut rng = rand::thread_rng();
        let jitter_range = delay.as_millis() as f64 * self.jitter_factor;
        if jitter_range <= 0.0 {
            return delay;
        }
        let jitter = rng.gen_range(-jitter_range..=jitter_range);

        let new_delay = delay.as_millis() as f64 + jitter;
        Duration::from_millis(new_delay.max(0.0) as u64)
    }
}

/// Failure of a single attempt, tagged with whether the policy may see it.
#[derive(Debug, Clone)]
pub struct AttemptError {
    pub error: HttpClientError,
    /// Propagate without consulting the policy.
    pub terminal: bool,
}

impl AttemptError {
    pub fn terminal(error: HttpClientError) -> Self {
        Self {
            error,
            terminal: true,
        }
    }
}

impl From<HttpClientError> for AttemptError {
    fn from(error: HttpClientError) -> Self {
        let terminal = error.is_construction_error() || error.is_cancelled();
        Self { error, terminal }
    }
}

/// Retry executor that handles the actual retry logic
pub struct RetryExecutor<'a> {
    policy: &'a RetryPolicy,
}

impl<'a> RetryExecutor<'a> {
    /// Create a new retry executor
    pub const fn new(policy: &'a RetryPolicy) -> Self {
        Self { policy }
    }

    /// Run `operation` until it succeeds, fails terminally, or the policy
    /// gives up. The attempt index starts at 0. Cancellation is checked
    /// before every attempt and on both sides of the delay.
    pub async fn execute<F, Fut, T>(&self, cancel: &CancelHandle, mut operation: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = std::result::Result<T, AttemptError>>,
    {
        let mut attempt = 0u32;
        loop {
            cancel.check()?;
            let failure = match operation(attempt).await {
                Ok(result) => return Ok(result),
                Err(failure) => failure,
            };

            let error = failure.error;
            if failure.terminal
                || attempt >= self.policy.max_retry_count
                || !self.policy.should_retry(&error)
            {
                return Err(error);
            }

            let delay = self.policy.calculate_delay(attempt);
            tracing::warn!(
                target: "wirecall::http",
                attempt = attempt + 1,
                max_retries = self.policy.max_retry_count,
                delay_ms = delay.as_millis() as u64,
                err = %error,
                "attempt failed, retrying"
            );

            cancel.check()?;
            cancel
                .run(async {
                    sleep(delay).await;
                    Ok(())
                })
                .await?;
            cancel.check()?;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn server_error() -> HttpClientError {
        HttpClientError::http(500, "Server error")
    }

    #[tokio::test]
    async fn test_retry_success_on_second_attempt() {
        let counter = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let cancel = CancelHandle::new();

        let result = RetryExecutor::new(&policy)
            .execute(&cancel, |_| {
                let count = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if count == 0 {
                        Err(AttemptError::from(server_error()))
                    } else {
                        Ok("success")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "success");
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_exhaustion() {
        let counter = AtomicU32::new(0);
        let policy = RetryPolicy::new(2, Duration::from_millis(1));
        let cancel = CancelHandle::new();

        let result: Result<()> = RetryExecutor::new(&policy)
            .execute(&cancel, |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err(AttemptError::from(server_error())) }
            })
            .await;

        assert!(matches!(result, Err(HttpClientError::HttpError { status: 500, .. })));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn terminal_failures_skip_the_policy() {
        let counter = AtomicU32::new(0);
        let policy = RetryPolicy::new(5, Duration::ZERO).with_retry_condition(|_| true);
        let cancel = CancelHandle::new();

        let result: Result<()> = RetryExecutor::new(&policy)
            .execute(&cancel, |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err(AttemptError::from(HttpClientError::ConflictingBodyTypes)) }
            })
            .await;

        assert!(matches!(result, Err(HttpClientError::ConflictingBodyTypes)));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn predicate_rejection_stops_immediately() {
        let counter = AtomicU32::new(0);
        let policy = RetryPolicy::new(5, Duration::ZERO).with_retry_condition(|e| e.status() == Some(503));
        let cancel = CancelHandle::new();

        let result: Result<()> = RetryExecutor::new(&policy)
            .execute(&cancel, |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err(AttemptError::from(server_error())) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_during_delay_surfaces_cancelled() {
        let counter = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::new(3, Duration::from_secs(30));
        let cancel = CancelHandle::new();

        let task = {
            let counter = counter.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                RetryExecutor::new(&policy)
                    .execute(&cancel, |_| {
                        counter.fetch_add(1, Ordering::SeqCst);
                        async { Err::<(), _>(AttemptError::from(server_error())) }
                    })
                    .await
            })
        };

        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();
        let result = task.await.unwrap();

        assert!(matches!(result, Err(HttpClientError::Cancelled)));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_delay_calculation() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100))
            .with_backoff_multiplier(2.0)
            .with_jitter(false);

        assert_eq!(policy.calculate_delay(0), Duration::from_millis(100));
        assert_eq!(policy.calculate_delay(1), Duration::from_millis(200));
        assert_eq!(policy.calculate_delay(2), Duration::from_millis(400));
    }

    #[test]
    fn constant_policy_keeps_delay_flat() {
        let policy = RetryPolicy::new(3, Duration::from_millis(250));
        assert_eq!(policy.calculate_delay(0), Duration::from_millis(250));
        assert_eq!(policy.calculate_delay(2), Duration::from_millis(250));
    }

    #[test]
    fn jittered_delay_never_exceeds_max_delay() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100))
            .with_backoff_multiplier(4.0)
            .with_max_delay(Duration::from_millis(300))
            .with_jitter(true)
            .with_jitter_factor(0.5);

        for attempt in 0..5 {
            for _ in 0..50 {
                assert!(policy.calculate_delay(attempt) <= Duration::from_millis(300));
            }
        }
    }
}
