//! Retry logic with exponential backoff
//!
//! Only idempotent remote calls (DOI resolution, manifest writes) go through
//! here. Claims, catalog mutations and compensations are attempted once.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

use super::error::Retryable;

/// Options for retry behavior
#[derive(Debug, Clone, PartialEq)]
pub struct RetryOptions {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,
    /// Initial delay before first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Backoff multiplier for exponential backoff
    pub backoff_multiplier: f64,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
        }
    }
}

/// Retry manager for executing operations with exponential backoff
///
/// # Examples
///
/// ```no_run
/// use collection_publisher::core::{CatalogError, RetryManager, RetryOptions};
///
/// # async fn run() -> Result<(), CatalogError> {
/// let manager = RetryManager::new(RetryOptions::default());
///
/// let records = manager
///     .retry("resolve dois", || async { Ok::<_, CatalogError>(vec!["10.1111/A"]) })
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct RetryManager {
    options: RetryOptions,
}

impl RetryManager {
    pub fn new(options: RetryOptions) -> Self {
        Self { options }
    }

    /// Execute the given async operation, retrying retryable failures
    pub async fn retry<F, Fut, T, E>(&self, operation_name: &str, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + std::fmt::Display,
    {
        let mut delay = self.options.initial_delay;
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(error) => {
                    if !error.is_retryable() || attempt >= self.options.max_attempts {
                        return Err(error);
                    }

                    debug!(
                        operation = operation_name,
                        attempt,
                        error = %error,
                        "retrying after {:?}",
                        delay
                    );
                    sleep(delay).await;

                    delay = Duration::from_secs_f64(
                        delay.as_secs_f64() * self.options.backoff_multiplier,
                    )
                    .min(self.options.max_delay);
                    attempt += 1;
                }
            }
        }
    }
}
