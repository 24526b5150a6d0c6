use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::error::{ApiError, ApiResult};

/// Retry budget and per-attempt deadline applied to every outbound call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub attempt_timeout: Duration,
}

impl RetryPolicy {
    /// Delay slept after the failed attempt with index `attempt` (zero based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            attempt_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    Retryable,
    Terminal,
}

/// One network call inside the retry loop. Only used for tracing.
#[derive(Debug)]
struct RequestAttempt {
    operation: &'static str,
    index: u32,
    deadline: Duration,
    outcome: AttemptOutcome,
}

impl RequestAttempt {
    fn record(&self, err: Option<&ApiError>) {
        match (self.outcome, err) {
            (AttemptOutcome::Success, _) => debug!(
                target: "classifier.executor",
                operation = self.operation,
                attempt = self.index,
                "request succeeded"
            ),
            (AttemptOutcome::Retryable, Some(err)) => warn!(
                target: "classifier.executor",
                operation = self.operation,
                attempt = self.index,
                deadline_ms = self.deadline.as_millis() as u64,
                error = %err,
                "request failed, retrying"
            ),
            (_, err) => warn!(
                target: "classifier.executor",
                operation = self.operation,
                attempt = self.index,
                error = ?err,
                "request failed"
            ),
        }
    }
}

/// Policy wrapper around a single outbound call: bounded deadline per attempt
/// and exponential backoff on transient failures.
#[derive(Debug, Clone, Default)]
pub struct RequestExecutor {
    policy: RetryPolicy,
}

impl RequestExecutor {
    pub fn new(mut policy: RetryPolicy) -> Self {
        policy.max_attempts = policy.max_attempts.max(1);
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Runs `call` until it succeeds, fails terminally, or the attempt budget
    /// is spent. A call exceeding the deadline is dropped and counts as a
    /// retryable [`ApiError::Timeout`].
    pub async fn execute<T, F, Fut>(&self, operation: &'static str, mut call: F) -> ApiResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        let deadline = self.policy.attempt_timeout;
        let mut index = 0;
        loop {
            let result = match timeout(deadline, call()).await {
                Ok(result) => result,
                Err(_) => Err(ApiError::Timeout(deadline)),
            };
            let mut attempt = RequestAttempt {
                operation,
                index,
                deadline,
                outcome: AttemptOutcome::Success,
            };
            match result {
                Ok(value) => {
                    attempt.record(None);
                    return Ok(value);
                }
                Err(err) if err.is_retryable() => {
                    attempt.outcome = AttemptOutcome::Retryable;
                    index += 1;
                    if index >= self.policy.max_attempts {
                        attempt.outcome = AttemptOutcome::Terminal;
                        attempt.record(Some(&err));
                        return Err(ApiError::RetriesExhausted {
                            attempts: index,
                            last: Box::new(err),
                        });
                    }
                    attempt.record(Some(&err));
                    sleep(self.policy.backoff(index - 1)).await;
                }
                Err(err) => {
                    attempt.outcome = AttemptOutcome::Terminal;
                    attempt.record(Some(&err));
                    return Err(err);
                }
            }
        }
    }
}
