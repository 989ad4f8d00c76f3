// src/gateway/retry.rs — Retry with fallback for upstream AI calls
//
// Every gateway operation runs through one wrapper: try up to `max_attempts`
// times with a fixed delay between transient failures, then return the
// operation's fallback value. Callers never see an error from this boundary.

use std::future::Future;
use std::time::Duration;

use crate::infra::config::GatewayConfig;
use crate::infra::errors::DevicePulseError;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(500),
        }
    }
}

impl From<&GatewayConfig> for RetryPolicy {
    fn from(config: &GatewayConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            delay: Duration::from_millis(config.retry_delay_ms),
        }
    }
}

/// Run `attempt` until it succeeds, retrying transient failures, and return
/// `fallback` once attempts are exhausted or on the first non-retriable
/// failure.
pub async fn with_fallback<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    fallback: T,
    mut attempt: F,
) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DevicePulseError>>,
{
    for n in 1..=policy.max_attempts {
        match attempt().await {
            Ok(value) => return value,
            Err(e) => {
                if !e.is_retriable() || n == policy.max_attempts {
                    tracing::warn!(operation, attempt = n, "Falling back after error: {e}");
                    return fallback;
                }
                tracing::warn!(
                    operation,
                    attempt = n,
                    max_attempts = policy.max_attempts,
                    "Retrying after error: {e}"
                );
                tokio::time::sleep(policy.delay).await;
            }
        }
    }
    fallback
}
