//! Bounded retry with exponential backoff for directory calls
//!
//! Only errors that [`DirectoryError::is_retryable`] are retried. Everything
//! else is returned on the first attempt.

use backon::{ExponentialBuilder, Retryable};
use iam_janitor_common::defaults::{
    DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_INITIAL_DELAY_MS, DEFAULT_RETRY_MAX_DELAY_MS,
};
use iam_janitor_common::{DirectoryError, DirectoryOperation};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Retry configuration for directory calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, first try included (minimum 1)
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Cap for exponential growth
    pub max_delay: Duration,
    /// Randomize delays to spread out concurrent retries
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: Duration::from_millis(DEFAULT_RETRY_INITIAL_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_RETRY_MAX_DELAY_MS),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    fn backoff(&self) -> ExponentialBuilder {
        let builder = ExponentialBuilder::default()
            .with_min_delay(self.initial_delay)
            .with_max_delay(self.max_delay)
            .with_factor(2.0)
            .with_max_times(self.max_attempts.saturating_sub(1) as usize);
        if self.jitter {
            builder.with_jitter()
        } else {
            builder
        }
    }
}

/// Final failure of a retried call
#[derive(Debug)]
pub struct RetryError {
    pub attempts: u32,
    pub source: DirectoryError,
}

/// Run `call` until it succeeds, fails with a non-retryable error, or the
/// policy's attempts are used up.
///
/// `operation` and `target` are only used for logging.
pub async fn retry_directory_call<T, F, Fut>(
    policy: &RetryPolicy,
    operation: DirectoryOperation,
    target: &str,
    mut call: F,
) -> Result<T, RetryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DirectoryError>>,
{
    let mut attempts = 0u32;

    let result = (|| {
        attempts += 1;
        call()
    })
    .retry(policy.backoff())
    .when(DirectoryError::is_retryable)
    .notify(|err: &DirectoryError, delay: Duration| {
        warn!(
            operation = %operation,
            resource = %target,
            error = %err,
            delay_ms = delay.as_millis(),
            "Transient directory error, retrying"
        );
    })
    .await;

    result.map_err(|source| RetryError { attempts, source })
}
