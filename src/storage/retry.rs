// src/storage/retry.rs

use std::future::Future;
use std::time::Duration;

use super::StorageError;

/// Retry contract for store operations.
///
/// Retryable failures are attempted up to `attempts` times in total, sleeping
/// `backoff`, then double that, between attempts. [`StorageError::NotFound`]
/// and [`StorageError::InvalidName`] are returned immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: u32, backoff: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            backoff,
        }
    }

    /// Single attempt, no waiting.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub async fn run<F, Fut, T>(&self, operation: &str, mut f: F) -> Result<T, StorageError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StorageError>>,
    {
        let attempts = self.attempts.max(1);
        let mut backoff = self.backoff;
        let mut attempt = 1;

        loop {
            match f().await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() || attempt >= attempts => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        operation,
                        attempt,
                        attempts,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "storage operation failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                    attempt += 1;
                }
            }
        }
    }
}
