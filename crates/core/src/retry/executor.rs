//! Bounded retry with linear timeout growth.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use super::policy::{OperationClass, RetryPolicy, RetryPolicyTable};
use crate::metrics;

/// Errors the executor can classify.
pub trait Retryable: std::error::Error + Send + Sync + 'static {
    /// Whether another attempt may succeed.
    fn is_transient(&self) -> bool;

    /// Error to report when an attempt hits its timeout.
    fn timed_out(after: Duration) -> Self;
}

/// Final failure of a retried operation, tagged with the attempt count.
#[derive(Debug, Error)]
#[error("{operation} failed after {attempts} attempt(s): {last_error}")]
pub struct RetryError<E: std::error::Error + 'static> {
    pub operation: OperationClass,
    pub attempts: u32,
    #[source]
    pub last_error: E,
}

impl<E: Retryable> RetryError<E> {
    /// True when the budget was exhausted on transient errors.
    pub fn exhausted(&self) -> bool {
        self.last_error.is_transient()
    }

    pub fn into_inner(self) -> E {
        self.last_error
    }
}

/// Information handed to each attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    /// 1-based attempt number.
    pub number: u32,
    /// Deadline enforced on this attempt.
    pub timeout: Duration,
}

/// Runs operations under the policy of their class.
///
/// Holds only an immutable policy table, so one executor is shared by every
/// saga without locking.
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    policies: Arc<RetryPolicyTable>,
}

impl RetryExecutor {
    pub fn new(policies: RetryPolicyTable) -> Self {
        Self {
            policies: Arc::new(policies),
        }
    }

    pub fn policy(&self, class: OperationClass) -> &RetryPolicy {
        self.policies.get(class)
    }

    pub fn policies(&self) -> &RetryPolicyTable {
        &self.policies
    }

    /// Execute `operation` with the policy configured for `class`.
    pub async fn execute<T, E, F, Fut>(
        &self,
        class: OperationClass,
        operation: F,
    ) -> Result<T, RetryError<E>>
    where
        E: Retryable,
        F: FnMut(Attempt) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        execute_with_policy(class, self.policies.get(class), operation).await
    }
}

/// Execute `operation` under an explicit policy.
///
/// Transient failures and attempt timeouts are retried until the policy's
/// attempt budget is spent. Permanent failures return immediately.
pub async fn execute_with_policy<T, E, F, Fut>(
    class: OperationClass,
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, RetryError<E>>
where
    E: Retryable,
    F: FnMut(Attempt) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = policy.attempts();
    let mut number = 1;

    loop {
        let timeout = policy.timeout_for(number);
        let attempt = Attempt { number, timeout };

        let outcome = match tokio::time::timeout(timeout, operation(attempt)).await {
            Ok(result) => result,
            Err(_) => Err(E::timed_out(timeout)),
        };

        let error = match outcome {
            Ok(value) => {
                metrics::RETRY_ATTEMPTS
                    .with_label_values(&[class.as_str(), "success"])
                    .inc();
                if number > 1 {
                    debug!(operation = %class, attempt = number, "Succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) => e,
        };

        if !error.is_transient() {
            metrics::RETRY_ATTEMPTS
                .with_label_values(&[class.as_str(), "permanent"])
                .inc();
            return Err(RetryError {
                operation: class,
                attempts: number,
                last_error: error,
            });
        }

        if number >= max_attempts {
            metrics::RETRY_ATTEMPTS
                .with_label_values(&[class.as_str(), "exhausted"])
                .inc();
            warn!(
                operation = %class,
                attempts = number,
                error = %error,
                "Retry budget exhausted"
            );
            return Err(RetryError {
                operation: class,
                attempts: number,
                last_error: error,
            });
        }

        metrics::RETRY_ATTEMPTS
            .with_label_values(&[class.as_str(), "transient"])
            .inc();
        warn!(
            operation = %class,
            attempt = number,
            max_attempts,
            timeout_ms = timeout.as_millis() as u64,
            error = %error,
            "Transient failure, retrying"
        );

        let pause = policy.pause();
        if !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
        number += 1;
    }
}
