//! Bounded retry of optimistic read-modify-write cycles.

use std::fmt::Display;
use std::future::Future;

/// Errors that say whether re-reading and retrying may succeed.
pub trait Retryable {
    /// Returns true for optimistic-lock conflicts.
    fn is_retryable(&self) -> bool;
}

/// How many times a conflicting operation is re-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 3 }
    }
}

impl RetryPolicy {
    /// Policy with the given retry count.
    #[must_use]
    pub const fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    /// Runs `attempt` until it succeeds, fails for good, or retries run out.
    ///
    /// `attempt` receives the zero-based attempt number and must redo its reads.
    pub async fn run<T, E, F, Fut>(&self, operation: &str, mut attempt: F) -> Result<T, E>
    where
        E: Retryable + Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut n = 0;
        loop {
            match attempt(n).await {
                Err(e) if e.is_retryable() && n < self.max_retries => {
                    n += 1;
                    tracing::warn!(operation, attempt = n, error = %e, "conflict, retrying");
                }
                other => return other,
            }
        }
    }
}
