//! In-process client for offline runs and tests.

use crate::client::{LlmClient, LlmRequest, LlmResponse};
use docscout_core::AppResult;
use std::sync::atomic::{AtomicUsize, Ordering};

type Responder = Box<dyn Fn(&LlmRequest) -> AppResult<String> + Send + Sync>;

/// Client whose replies are computed by a closure.
///
/// `MockClient::echo()` answers with whatever follows the last `Question:`
/// marker in the prompt, which makes the pipeline usable without a model.
pub struct MockClient {
    responder: Responder,
    calls: AtomicUsize,
}

impl MockClient {
    /// Build a client from a reply function.
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&LlmRequest) -> AppResult<String> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            calls: AtomicUsize::new(0),
        }
    }

    /// Echo the question back.
    pub fn echo() -> Self {
        Self::new(|request| Ok(last_question(&request.prompt).to_string()))
    }

    /// Number of completions requested so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn last_question(prompt: &str) -> &str {
    prompt
        .rsplit_once("Question:")
        .map(|(_, rest)| rest)
        .unwrap_or(prompt)
        .trim()
}

#[async_trait::async_trait]
impl LlmClient for MockClient {
    fn provider_name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let content = (self.responder)(request)?;
        Ok(LlmResponse::new(content, request.model.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docscout_core::AppError;

    #[tokio::test]
    async fn test_echo_returns_last_question() {
        let client = MockClient::echo();
        let request = LlmRequest::new("History: ...\n\nQuestion: where is the roster?", "m");
        let response = client.complete(&request).await.unwrap();
        assert_eq!(response.content, "where is the roster?");
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn test_responder_errors_propagate() {
        let client = MockClient::new(|_| Err(AppError::Llm("rate limited".to_string())));
        let result = client.complete(&LlmRequest::new("x", "m")).await;
        assert!(matches!(result, Err(AppError::Llm(_))));
        assert_eq!(client.calls(), 1);
    }
}
