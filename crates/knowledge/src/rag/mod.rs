//! Retrieval-augmented answering: routing, rewriting, tiered retrieval,
//! synthesis and response normalization.

pub mod mode;
pub mod normalize;
pub mod retrieval;
pub mod rewrite;
pub mod synthesize;

pub use mode::{classify, Classification};
pub use normalize::normalize;
pub use retrieval::{rerank, RetrievalTier, Retriever};
pub use rewrite::rewrite_query;
pub use synthesize::synthesize;

use crate::types::{ConversationTurn, Role};
use docscout_core::AppResult;
use docscout_llm::{complete_with_retry, LlmClient, LlmRequest, RetryPolicy};
use docscout_prompt::PromptLibrary;
use std::collections::HashMap;
use std::sync::Arc;

/// Language-model client plus the prompts and retry policy the pipeline uses.
#[derive(Clone)]
pub struct LanguageModel {
    client: Arc<dyn LlmClient>,
    model: String,
    prompts: Arc<PromptLibrary>,
    retry: RetryPolicy,
}

impl std::fmt::Debug for LanguageModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LanguageModel")
            .field("provider", &self.client.provider_name())
            .field("model", &self.model)
            .field("retry", &self.retry)
            .finish()
    }
}

impl LanguageModel {
    pub fn new(
        client: Arc<dyn LlmClient>,
        model: impl Into<String>,
        prompts: PromptLibrary,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            client,
            model: model.into(),
            prompts: Arc::new(prompts),
            retry,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request(&self, prompt_id: &str, variables: HashMap<String, String>) -> AppResult<LlmRequest> {
        let built = self.prompts.render(prompt_id, variables)?;
        let mut request = LlmRequest::new(built.user, self.model.clone());
        if let Some(system) = built.system {
            request = request.with_system(system);
        }
        Ok(request)
    }

    /// One attempt; callers decide how to recover.
    pub async fn complete(
        &self,
        prompt_id: &str,
        variables: HashMap<String, String>,
    ) -> AppResult<String> {
        let request = self.request(prompt_id, variables)?;
        let response = self.client.complete(&request).await?;
        Ok(response.content)
    }

    /// Bounded retries with exponential backoff; the last error is returned.
    pub async fn complete_with_retry(
        &self,
        prompt_id: &str,
        variables: HashMap<String, String>,
    ) -> AppResult<String> {
        let request = self.request(prompt_id, variables)?;
        let response = complete_with_retry(self.client.as_ref(), &request, &self.retry).await?;
        Ok(response.content)
    }
}

/// `role: text` lines, or `(none)` for an empty history.
pub fn render_history(history: &[ConversationTurn]) -> String {
    if history.is_empty() {
        return "(none)".to_string();
    }

    history
        .iter()
        .map(|turn| {
            let role = match turn.role {
                Role::User => "user",
                Role::Assistant => "assistant",
            };
            format!("{}: {}", role, turn.content.as_text())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Mode, StructuredAnswer};

    #[test]
    fn test_render_history() {
        assert_eq!(render_history(&[]), "(none)");

        let mut answer = StructuredAnswer::no_documents(Mode::Inquiry);
        answer.answer_text = "See the handbook.".to_string();
        let history = vec![
            ConversationTurn::user("Where is the handbook?"),
            ConversationTurn::assistant(answer),
        ];
        assert_eq!(
            render_history(&history),
            "user: Where is the handbook?\nassistant: See the handbook."
        );
    }
}
