use std::future::Future;
use std::time::Duration;

use tracing::debug;

use freightwatch_provider::ProviderError;

use crate::config::ActivityConfig;

/// Strategy used to compute the delay between retry attempts.
#[derive(Debug, Clone)]
pub enum RetryStrategy {
    /// The same delay between every attempt.
    Constant { delay: Duration },
    /// Exponential backoff: `base * 2^(attempt-1)`, capped.
    Exponential { base: Duration, cap: Duration },
}

impl Default for RetryStrategy {
    fn default() -> Self {
        Self::Exponential {
            base: Duration::from_secs(1),
            cap: Duration::from_secs(30),
        }
    }
}

impl RetryStrategy {
    /// Delay before the next attempt; `attempt` is 1-based (the attempt
    /// that just failed).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self {
            Self::Constant { delay } => *delay,
            Self::Exponential { base, cap } => {
                let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
                (*base).saturating_mul(factor).min(*cap)
            }
        }
    }
}

/// Run one adapter call under the activity timeout and retry budget.
///
/// Retries only transient errors ([`ProviderError::is_retryable`]); a
/// non-retryable error or an exhausted budget propagates so the caller can
/// fall through to the next adapter in the chain.
pub(crate) async fn call_with_retry<T, F, Fut>(
    config: &ActivityConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        let outcome = tokio::time::timeout(config.timeout, operation()).await;
        let error = match outcome {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(error)) => error,
            Err(_) => ProviderError::Timeout(config.timeout),
        };
        if attempt >= config.max_attempts || !error.is_retryable() {
            return Err(error);
        }
        let delay = config.retry.delay_for(attempt);
        debug!(
            operation = operation_name,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "retrying after transient failure"
        );
        tokio::time::sleep(delay).await;
    }
}
