//! Retry policy: backoff computation and the retry loop wrapper around a
//! fallible async operation. Grounded on `astrid-llm::error::LlmError`'s
//! retry-adjacent variants, generalized to the full taxonomy and the
//! backoff formula of spec.md §4.2.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{info, warn};

use hearth_core::HearthError;

/// Tunables for the retry loop. Defaults match spec.md's named constants.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Maximum number of retries after the initial attempt.
    pub max_retries: u32,
    /// Exponential backoff multiplier.
    pub backoff_multiplier: f64,
    /// Ceiling on any single backoff delay.
    pub max_backoff_ms: u64,
    /// Fraction of randomness subtracted from the multiplicative jitter.
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff_multiplier: 2.0,
            max_backoff_ms: 8000,
            jitter_factor: 0.25,
        }
    }
}

/// Compute the backoff delay for a retry with `retries_left` attempts
/// remaining (counting down from `max_retries`), honoring a server-supplied
/// retry hint if present.
///
/// `delay = min(0.5 · multiplier^(retries_left) · jitter · 1000, max_backoff_ms)`
/// where `jitter = 1 − U(0, jitter_factor)`.
///
/// A `retry_after_ms` in `(0, 60_000)` overrides the computed delay
/// entirely, per spec.md §4.2 and §8.
#[must_use]
pub fn compute_backoff(
    config: &RetryConfig,
    retries_left: u32,
    retry_after_ms: Option<u64>,
) -> Duration {
    if let Some(hint) = retry_after_ms {
        if hint > 0 && hint < 60_000 {
            return Duration::from_millis(hint);
        }
    }

    let jitter = 1.0 - rand::thread_rng().gen_range(0.0..config.jitter_factor);
    let raw_ms =
        0.5 * config.backoff_multiplier.powi(retries_left as i32) * jitter * 1000.0;
    let clamped_ms = raw_ms.clamp(0.0, config.max_backoff_ms as f64);
    Duration::from_millis(clamped_ms as u64)
}

/// Run `operation` under the retry policy, retrying transient errors
/// ([`HearthError::is_retryable`]) up to `config.max_retries` times.
/// Aborts immediately (no further retries) if `cancelled` resolves.
///
/// # Errors
///
/// Returns the last error once retries are exhausted, or immediately for
/// any non-retryable error.
pub async fn retry_with_policy<T, F, Fut>(
    config: &RetryConfig,
    mut cancelled: impl FnMut() -> bool,
    mut operation: F,
) -> Result<T, HearthError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, HearthError>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < config.max_retries && !cancelled() => {
                let retries_left = config.max_retries - attempt;
                let delay = compute_backoff(config, retries_left, err.retry_after_ms());
                warn!(
                    attempt = attempt + 1,
                    max_retries = config.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "retrying after transient error"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
                info!(attempt, "retry attempt starting");
            },
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_delay_is_never_negative_or_over_max() {
        let config = RetryConfig::default();
        for retries_left in 0..=config.max_retries {
            let delay = compute_backoff(&config, retries_left, None);
            assert!(delay.as_millis() <= u128::from(config.max_backoff_ms));
        }
    }

    #[test]
    fn retry_after_hint_in_range_overrides_backoff() {
        let config = RetryConfig::default();
        let delay = compute_backoff(&config, 2, Some(2000));
        assert_eq!(delay, Duration::from_millis(2000));
    }

    #[test]
    fn retry_after_hint_out_of_range_is_ignored() {
        let config = RetryConfig::default();
        let delay_zero = compute_backoff(&config, 2, Some(0));
        let delay_too_large = compute_backoff(&config, 2, Some(60_000));
        assert!(delay_zero <= Duration::from_millis(config.max_backoff_ms));
        assert!(delay_too_large <= Duration::from_millis(config.max_backoff_ms));
    }

    #[tokio::test]
    async fn retry_with_policy_retries_transient_errors_then_succeeds() {
        let config = RetryConfig::default();
        let mut calls = 0;
        let result = retry_with_policy(&config, || false, || {
            calls += 1;
            async move {
                if calls < 2 {
                    Err(HearthError::network("connection reset"))
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls, 2);
    }

    #[tokio::test]
    async fn retry_with_policy_does_not_retry_authentication_errors() {
        let config = RetryConfig::default();
        let mut calls = 0;
        let result: Result<(), HearthError> = retry_with_policy(&config, || false, || {
            calls += 1;
            async move {
                Err(HearthError::Authentication {
                    message: "bad key".into(),
                    details: std::collections::HashMap::new(),
                })
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn retry_with_policy_aborts_immediately_on_cancellation() {
        let config = RetryConfig::default();
        let mut calls = 0;
        let result: Result<(), HearthError> = retry_with_policy(&config, || true, || {
            calls += 1;
            async move { Err(HearthError::network("connection reset")) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }
}
