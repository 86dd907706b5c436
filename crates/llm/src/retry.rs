//! Bounded exponential backoff around a single completion.

use crate::client::{LlmClient, LlmRequest, LlmResponse};
use docscout_core::{AppError, AppResult, RetryConfig};
use std::time::Duration;
use tracing::warn;

/// Attempt ceiling and backoff window for a retried call.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
        }
    }
}

impl RetryPolicy {
    /// Wait before the next attempt, given how many attempts already failed.
    pub fn backoff_for(&self, failed_attempts: u32) -> Duration {
        let exponent = failed_attempts.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(2_u32.pow(exponent))
            .min(self.max_backoff)
    }
}

/// Run `client.complete` until it succeeds or the policy is exhausted.
///
/// The last error is returned once every attempt has failed.
pub async fn complete_with_retry(
    client: &dyn LlmClient,
    request: &LlmRequest,
    policy: &RetryPolicy,
) -> AppResult<LlmResponse> {
    let mut attempt = 0;
    let mut last_error = None;

    while attempt < policy.max_attempts {
        match client.complete(request).await {
            Ok(response) => return Ok(response),
            Err(e) => {
                attempt += 1;
                if attempt < policy.max_attempts {
                    let backoff = policy.backoff_for(attempt);
                    warn!(
                        provider = client.provider_name(),
                        "Completion failed (attempt {}/{}), retrying in {}ms: {}",
                        attempt,
                        policy.max_attempts,
                        backoff.as_millis(),
                        e
                    );
                    tokio::time::sleep(backoff).await;
                }
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| AppError::Llm("No completion attempts were made".to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockClient;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(4),
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_for(1), Duration::from_secs(1));
        assert_eq!(policy.backoff_for(2), Duration::from_secs(2));
        assert_eq!(policy.backoff_for(3), Duration::from_secs(4));
        assert_eq!(policy.backoff_for(5), Duration::from_secs(8));
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        let failures = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&failures);
        let client = MockClient::new(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(AppError::Llm("429 Too Many Requests".to_string()))
            } else {
                Ok("done".to_string())
            }
        });

        let response = complete_with_retry(&client, &LlmRequest::new("q", "m"), &fast_policy(3))
            .await
            .unwrap();
        assert_eq!(response.content, "done");
        assert_eq!(client.calls(), 3);
    }

    #[tokio::test]
    async fn test_returns_last_error_after_ceiling() {
        let client = MockClient::new(|_| Err(AppError::Llm("quota exceeded".to_string())));

        let result =
            complete_with_retry(&client, &LlmRequest::new("q", "m"), &fast_policy(3)).await;
        assert!(result.unwrap_err().to_string().contains("quota exceeded"));
        assert_eq!(client.calls(), 3);
    }
}
