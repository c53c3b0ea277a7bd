//! Resilience patterns: retry with exponential backoff and adaptive batch shrinking

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::time::sleep;

/// Boxed future returned by retried operations
pub type RetryFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Retry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    /// Backoff before the first retry, in milliseconds
    pub initial_backoff_ms: u64,
    /// Upper bound for a single backoff, in milliseconds
    pub max_backoff_ms: u64,
    /// Backoff multiplier (exponential)
    pub backoff_multiplier: f64,
    /// Batches never shrink below this many items
    pub min_batch_size: usize,
}

impl RetryConfig {
    /// Defaults for remote writes: 3 attempts, 500ms doubling
    pub fn conservative() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 8_000,
            backoff_multiplier: 2.0,
            min_batch_size: 1,
        }
    }

    /// Same policy without waiting, for tests and dry runs
    pub fn immediate() -> Self {
        Self {
            initial_backoff_ms: 0,
            max_backoff_ms: 0,
            ..Self::conservative()
        }
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    /// Backoff to wait after `failed_attempts` failures (1-based)
    pub fn backoff_for(&self, failed_attempts: u32) -> Duration {
        let exponent = failed_attempts.saturating_sub(1) as i32;
        let millis = self.initial_backoff_ms as f64 * self.backoff_multiplier.powi(exponent);
        Duration::from_millis(millis.min(self.max_backoff_ms as f64) as u64)
    }

    /// Validate the policy
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::config_error("retry.max_attempts must be at least 1"));
        }
        if self.backoff_multiplier < 1.0 {
            return Err(Error::config_error("retry.backoff_multiplier must be >= 1.0"));
        }
        if self.min_batch_size == 0 {
            return Err(Error::config_error("retry.min_batch_size must be at least 1"));
        }
        Ok(())
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::conservative()
    }
}

/// Exponential backoff retry executor.
///
/// Only errors for which [`Error::is_retryable`] holds are retried.
pub async fn retry_with_backoff<'a, F, T>(config: &RetryConfig, mut f: F) -> Result<T>
where
    F: FnMut() -> RetryFuture<'a, T>,
{
    let mut attempt = 0;

    loop {
        attempt += 1;
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                if attempt >= config.max_attempts || !e.is_retryable() {
                    return Err(e);
                }
                let backoff = config.backoff_for(attempt);
                log::warn!(
                    "Attempt {}/{} failed: {}. Retrying in {:?}",
                    attempt,
                    config.max_attempts,
                    e,
                    backoff
                );
                sleep(backoff).await;
            }
        }
    }
}

/// An immutable window over items to send in one request.
///
/// Shrinking derives a new, smaller batch from the same items; the original
/// is never modified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Batch<'a, T> {
    items: &'a [T],
}

impl<'a, T> Batch<'a, T> {
    /// Batch of at most `size` items from the front of `items`
    pub fn new(items: &'a [T], size: usize) -> Self {
        Self {
            items: &items[..size.min(items.len())],
        }
    }

    /// Batch with the first half of this batch's items, never below `floor`
    pub fn halved(&self, floor: usize) -> Self {
        let size = (self.items.len() / 2).max(floor).max(1);
        Self::new(self.items, size)
    }

    pub fn items(&self) -> &'a [T] {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Result of sending one batch with retries
#[derive(Debug)]
pub enum SendOutcome<R> {
    /// The request succeeded with `sent` items after `attempts` tries
    Sent { value: R, sent: usize, attempts: u32 },
    /// Every allowed attempt failed; `error` is the last failure
    Exhausted { error: Error, attempts: u32 },
}

impl<R> SendOutcome<R> {
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent { .. })
    }
}

/// Send a batch, halving it after each retryable failure.
///
/// Large batches that fail are assumed to be too large, so each retry sends
/// the first half of the previous attempt. The caller advances past the
/// `sent` items and sends the remainder in a later call.
pub async fn send_with_shrinking_batch<'a, T, R, F>(
    config: &RetryConfig,
    batch: Batch<'_, T>,
    mut send: F,
) -> SendOutcome<R>
where
    T: Clone,
    F: FnMut(Vec<T>) -> RetryFuture<'a, R>,
{
    let mut current = batch;
    let mut attempt = 0;

    loop {
        attempt += 1;
        match send(current.items().to_vec()).await {
            Ok(value) => {
                return SendOutcome::Sent {
                    value,
                    sent: current.len(),
                    attempts: attempt,
                };
            }
            Err(error) => {
                if attempt >= config.max_attempts || !error.is_retryable() {
                    return SendOutcome::Exhausted {
                        error,
                        attempts: attempt,
                    };
                }
                let backoff = config.backoff_for(attempt);
                let next = current.halved(config.min_batch_size);
                log::warn!(
                    "Batch of {} failed (attempt {}/{}): {}. Retrying with {} in {:?}",
                    current.len(),
                    attempt,
                    config.max_attempts,
                    error,
                    next.len(),
                    backoff
                );
                sleep(backoff).await;
                current = next;
            }
        }
    }
}
