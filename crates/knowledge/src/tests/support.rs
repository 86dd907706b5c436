//! Shared fixtures: a scripted model, a vocabulary embedder and a small corpus.

use crate::embeddings::EmbeddingProvider;
use crate::index::lexical::tokenize;
use crate::pipeline::Services;
use crate::rag::LanguageModel;
use docscout_core::{AppConfig, AppError, AppResult, RetryConfig};
use docscout_llm::{LlmRequest, MockClient, RetryPolicy};
use docscout_prompt::PromptLibrary;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub(crate) const STAFF_CSV: &str = "name,department,role\n\
Alice,HR,Manager\n\
Bob,Sales,Clerk\n\
Carol,HR,Analyst\n";

pub(crate) const POLICY_TXT: &str = "Employees receive twenty vacation days per year. \
Requests need approval two weeks ahead.";

/// Which pipeline prompt a request was rendered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Call {
    Rewrite,
    Hyde,
    Answer,
}

pub(crate) fn kind(request: &LlmRequest) -> Call {
    let system = request.system.as_deref().unwrap_or_default();
    if system.contains("rewrite the question") {
        Call::Rewrite
    } else if system.contains("Write a passage") {
        Call::Hyde
    } else {
        Call::Answer
    }
}

pub(crate) fn question(request: &LlmRequest) -> String {
    request
        .prompt
        .rsplit_once("Question:")
        .map(|(_, q)| q.trim().to_string())
        .unwrap_or_default()
}

/// Rewrites echo the question, HyDE returns `hyde`, answers return `answer`.
pub(crate) fn scripted(hyde: &'static str, answer: &'static str) -> Arc<MockClient> {
    Arc::new(MockClient::new(move |request| {
        Ok(match kind(request) {
            Call::Rewrite => question(request),
            Call::Hyde => hyde.to_string(),
            Call::Answer => answer.to_string(),
        })
    }))
}

/// Counts embedding calls; one dimension per vocabulary word.
///
/// Texts without vocabulary words embed to the zero vector, which scores zero
/// against everything.
#[derive(Debug)]
pub(crate) struct VocabularyEmbedder {
    vocabulary: Vec<&'static str>,
    pub(crate) calls: AtomicUsize,
}

impl VocabularyEmbedder {
    pub(crate) fn new() -> Self {
        Self {
            vocabulary: vec![
                "staff", "roster", "employees", "vacation", "days", "dress", "code",
                "handbook", "approval",
            ],
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for VocabularyEmbedder {
    fn provider_name(&self) -> &str {
        "vocabulary"
    }

    fn model_name(&self) -> &str {
        "test"
    }

    fn dimensions(&self) -> usize {
        self.vocabulary.len()
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        self.calls.fetch_add(texts.len(), Ordering::SeqCst);
        Ok(texts
            .iter()
            .map(|text| {
                let tokens = tokenize(text);
                self.vocabulary
                    .iter()
                    .map(|word| tokens.iter().filter(|t| t.as_str() == *word).count() as f32)
                    .collect()
            })
            .collect())
    }
}

/// Always fails, like an embedding service over quota.
#[derive(Debug)]
pub(crate) struct UnavailableEmbedder;

#[async_trait::async_trait]
impl EmbeddingProvider for UnavailableEmbedder {
    fn provider_name(&self) -> &str {
        "unavailable"
    }

    fn model_name(&self) -> &str {
        "none"
    }

    fn dimensions(&self) -> usize {
        4
    }

    async fn embed_batch(&self, _texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Err(AppError::Embedding("429 quota exceeded".to_string()))
    }
}

pub(crate) fn services(
    workspace: &Path,
    client: Arc<MockClient>,
    embedder: Arc<dyn EmbeddingProvider>,
) -> Services {
    let config = AppConfig {
        workspace: workspace.to_path_buf(),
        provider: "mock".to_string(),
        retry: RetryConfig {
            max_attempts: 3,
            initial_backoff_ms: 1,
            max_backoff_ms: 2,
        },
        ..AppConfig::default()
    };

    let lm = LanguageModel::new(
        client,
        "test-model",
        PromptLibrary::builtin().expect("built-in prompts parse"),
        RetryPolicy::from(&config.retry),
    );

    Services::new(config, lm, embedder)
}

/// `data/staff.csv` and `data/policy.txt` under `workspace`; returns the data root.
pub(crate) fn write_corpus(workspace: &Path) -> std::path::PathBuf {
    let root = workspace.join("data");
    std::fs::create_dir_all(&root).expect("create data dir");
    std::fs::write(root.join("staff.csv"), STAFF_CSV).expect("write csv");
    std::fs::write(root.join("policy.txt"), POLICY_TXT).expect("write policy");
    root
}
