//! Retry logic with exponential backoff
//!
//! Overview blocks are the unit of retry during a scan: a block that fails with
//! a transient error is fetched again after a backoff delay, and a block that
//! keeps failing is skipped by the caller once the attempts are exhausted.
//!
//! # Example
//!
//! ```no_run
//! use usenet_indexer::retry::{IsRetryable, with_retry};
//! use usenet_indexer::config::RetryConfig;
//!
//! #[derive(Debug)]
//! enum MyError {
//!     Transient,
//!     Permanent,
//! }
//!
//! impl std::fmt::Display for MyError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "{:?}", self)
//!     }
//! }
//!
//! impl IsRetryable for MyError {
//!     fn is_retryable(&self) -> bool {
//!         matches!(self, MyError::Transient)
//!     }
//! }
//!
//! # async fn example() -> Result<(), MyError> {
//! let config = RetryConfig::default();
//! let result = with_retry(&config, 3, || async {
//!     // Your operation here
//!     Ok::<_, MyError>(())
//! }).await?;
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::Error;
use nntp_rs::NntpError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (timeouts, dropped connections, server busy) should return `true`.
/// Permanent failures (authentication, unknown group, corrupt store) should return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for NntpError {
    fn is_retryable(&self) -> bool {
        match self {
            NntpError::Io(e) => io_is_transient(e),
            NntpError::Timeout | NntpError::ConnectionClosed | NntpError::Tls(_) => true,
            // 4xx is "command failed, try later"; 411 (no such group) never heals
            NntpError::Protocol { code, .. } => (400..500).contains(code) && *code != 411,
            NntpError::TransferNotPossible(_) => true,
            // A lost GROUP selection is restored by the session on reconnect
            NntpError::NoGroupSelected => true,
            _ => false,
        }
    }
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            Error::Nntp(e) => e.is_retryable(),
            Error::Io(e) => io_is_transient(e),
            // A failed block has already been retried by the scanner
            Error::Scan(_) => false,
            // Database errors should not be retried (likely permanent)
            Error::Database(_) | Error::Sqlx(_) => false,
            Error::Config { .. } => false,
            Error::Artifact(_) => false,
            Error::Serialization(_) => false,
            Error::NotFound(_) => false,
            Error::ShuttingDown => false,
            // Unknown errors - be conservative and don't retry
            Error::Other(_) => false,
        }
    }
}

fn io_is_transient(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::TimedOut
            | std::io::ErrorKind::ConnectionRefused
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::NotConnected
            | std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::UnexpectedEof
            | std::io::ErrorKind::Interrupted
    )
}

/// Execute an async operation with exponential backoff retry logic
///
/// # Arguments
///
/// * `config` - Backoff delays, multiplier and jitter
/// * `max_attempts` - Total attempts including the first one (at least 1)
/// * `operation` - Async closure that returns Result<T, E> where E implements IsRetryable
///
/// # Returns
///
/// Returns the successful result or the last error once the attempts are exhausted
/// or a non-retryable error is seen.
pub async fn with_retry<F, Fut, T, E>(
    config: &RetryConfig,
    max_attempts: u32,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;
    let mut delay = config.initial_delay;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::info!(attempts = attempt, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                tracing::warn!(
                    error = %e,
                    attempt = attempt,
                    max_attempts = max_attempts,
                    delay_ms = delay.as_millis(),
                    "Operation failed, retrying"
                );
                attempt += 1;

                let jittered_delay = if config.jitter {
                    add_jitter(delay)
                } else {
                    delay
                };
                tokio::time::sleep(jittered_delay).await;

                let next_delay =
                    Duration::from_secs_f64(delay.as_secs_f64() * config.backoff_multiplier);
                delay = next_delay.min(config.max_delay);
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!(
                        error = %e,
                        attempts = attempt,
                        "Operation failed after all retry attempts exhausted"
                    );
                } else {
                    tracing::error!(error = %e, "Operation failed with non-retryable error");
                }
                return Err(e);
            }
        }
    }
}

/// Add random jitter to a delay to prevent thundering herd
///
/// The actual delay will be between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
}
