//! Mode-specific answer generation over retrieved chunks.

use super::{render_history, LanguageModel};
use crate::types::{Chunk, ConversationTurn, Mode, INQUIRY_NO_MATCH_ANSWER, NO_DOC_MATCH_ANSWER};
use docscout_prompt::{ANSWER_DOCUMENT_SEARCH, ANSWER_INQUIRY};
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::{error, instrument};

/// Prefix of the answer shown when every attempt failed.
pub const GENERATION_FAILED: &str = "Answer generation failed. Please try again later.";

/// Prompt id and no-match sentinel for a mode.
fn template_for(mode: Mode) -> (&'static str, &'static str) {
    match mode {
        Mode::DocumentSearch => (ANSWER_DOCUMENT_SEARCH, NO_DOC_MATCH_ANSWER),
        Mode::Inquiry => (ANSWER_INQUIRY, INQUIRY_NO_MATCH_ANSWER),
    }
}

/// Chunks as numbered sections with their provenance.
pub fn format_context(chunks: &[Chunk]) -> String {
    if chunks.is_empty() {
        return "(no documents)".to_string();
    }

    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| {
            let page = chunk
                .metadata
                .page
                .map(|p| format!(", page {}", p + 1))
                .unwrap_or_default();
            format!(
                "[Document {}] (source: {}{})\n{}",
                i + 1,
                chunk.metadata.source,
                page,
                chunk.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

/// Ask the model for an answer and wrap it with the chunks it saw.
///
/// Never fails: exhausted retries become an explanatory answer text.
/// The result has the shape `{"answer": ..., "context": [{"page_content", "metadata"}]}`.
#[instrument(skip_all, fields(mode = %mode, chunks = chunks.len()))]
pub async fn synthesize(
    lm: &LanguageModel,
    input: &str,
    history: &[ConversationTurn],
    chunks: &[Chunk],
    mode: Mode,
) -> Value {
    let (prompt_id, no_match) = template_for(mode);

    let mut variables = HashMap::new();
    variables.insert("history".to_string(), render_history(history));
    variables.insert("context".to_string(), format_context(chunks));
    variables.insert("question".to_string(), input.to_string());
    variables.insert("no_match".to_string(), no_match.to_string());

    let answer = match lm.complete_with_retry(prompt_id, variables).await {
        Ok(text) => text.trim().to_string(),
        Err(e) => {
            error!("Answer generation failed after retries: {}", e);
            format!("{} Details: {}", GENERATION_FAILED, e)
        }
    };

    let context: Vec<Value> = chunks
        .iter()
        .map(|chunk| {
            json!({
                "page_content": chunk.content,
                "metadata": chunk.metadata,
            })
        })
        .collect();

    json!({ "answer": answer, "context": context })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UnitMetadata;
    use docscout_core::AppError;
    use docscout_llm::{MockClient, RetryPolicy};
    use docscout_prompt::PromptLibrary;
    use std::sync::Arc;
    use std::time::Duration;

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(2),
        }
    }

    fn lm(client: Arc<MockClient>) -> LanguageModel {
        LanguageModel::new(client, "m", PromptLibrary::builtin().unwrap(), fast_retry())
    }

    fn chunks() -> Vec<Chunk> {
        vec![
            Chunk::new("Page three text", UnitMetadata::new("/data/r.pdf").with_page(2), 0),
            Chunk::new("Plain text", UnitMetadata::new("/data/n.txt"), 0),
        ]
    }

    #[test]
    fn test_format_context() {
        let context = format_context(&chunks());
        assert!(context.starts_with("[Document 1] (source: /data/r.pdf, page 3)\nPage three text"));
        assert!(context.contains("---\n\n[Document 2] (source: /data/n.txt)\nPlain text"));
    }

    #[tokio::test]
    async fn test_mode_selects_template() {
        let client = Arc::new(MockClient::new(|request| {
            let system = request.system.clone().unwrap_or_default();
            Ok(if system.contains("headings") {
                "inquiry".to_string()
            } else {
                "search".to_string()
            })
        }));
        let lm = lm(client);

        let search = synthesize(&lm, "q", &[], &chunks(), Mode::DocumentSearch).await;
        let inquiry = synthesize(&lm, "q", &[], &chunks(), Mode::Inquiry).await;
        assert_eq!(search["answer"], "search");
        assert_eq!(inquiry["answer"], "inquiry");
    }

    #[tokio::test]
    async fn test_response_shape_carries_chunk_metadata() {
        let client = Arc::new(MockClient::new(|request| {
            assert!(request.prompt.contains("[Document 2]"));
            assert!(request.prompt.ends_with("Question: Where is it?"));
            Ok("  It is in r.pdf.\n".to_string())
        }));
        let raw = synthesize(&lm(client), "Where is it?", &[], &chunks(), Mode::DocumentSearch).await;

        assert_eq!(raw["answer"], "It is in r.pdf.");
        assert_eq!(raw["context"][0]["page_content"], "Page three text");
        assert_eq!(raw["context"][0]["metadata"]["source"], "/data/r.pdf");
        assert_eq!(raw["context"][0]["metadata"]["page"], 2);
        assert_eq!(raw["context"][1]["metadata"]["is_merged"], false);
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let attempts = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let seen = Arc::clone(&attempts);
        let client = Arc::new(MockClient::new(move |_| {
            if seen.fetch_add(1, std::sync::atomic::Ordering::SeqCst) == 0 {
                Err(AppError::Llm("429 Too Many Requests".to_string()))
            } else {
                Ok("Recovered.".to_string())
            }
        }));
        let raw = synthesize(&lm(client.clone()), "q", &[], &chunks(), Mode::Inquiry).await;
        assert_eq!(raw["answer"], "Recovered.");
        assert_eq!(client.calls(), 2);
    }

    #[tokio::test]
    async fn test_exhausted_retries_become_answer_text() {
        let client = Arc::new(MockClient::new(|_| Err(AppError::Llm("quota exceeded".to_string()))));
        let raw = synthesize(&lm(client.clone()), "q", &[], &chunks(), Mode::Inquiry).await;

        let answer = raw["answer"].as_str().unwrap();
        assert!(answer.starts_with(GENERATION_FAILED));
        assert!(answer.contains("quota exceeded"));
        assert_eq!(client.calls(), 3);
    }
}
