//! Public entry points: index construction, per-turn answering and undo.

use crate::chunker::{Chunker, ChunkerConfig};
use crate::embeddings::{create_provider, EmbeddingProvider};
use crate::index::{store, IndexBuilder, IndexHandle, IndexOrigin, KnowledgeIndex};
use crate::loader;
use crate::rag::{
    mode, normalize::ResponseNormalizer, rerank, rewrite_query, synthesize, LanguageModel,
    Retriever,
};
use crate::types::{Chunk, ConversationTurn, Mode, Role, StructuredAnswer};
use docscout_core::{AppConfig, AppError, AppResult, RetrievalConfig};
use docscout_llm::{create_client, RetryPolicy};
use docscout_prompt::PromptLibrary;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Long-lived clients built once per process and shared by every session.
#[derive(Debug, Clone)]
pub struct Services {
    config: AppConfig,
    lm: LanguageModel,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl Services {
    pub fn new(config: AppConfig, lm: LanguageModel, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            config,
            lm,
            embedder,
        }
    }

    /// Build the model client, prompt library and embedding provider from `config`.
    pub fn from_config(config: AppConfig) -> AppResult<Self> {
        let client = create_client(
            &config.provider,
            config.endpoint.as_deref(),
            config.api_key.as_deref(),
        )
        .map_err(AppError::Config)?;

        let prompts = PromptLibrary::load(&config.workspace)?;
        let lm = LanguageModel::new(
            client,
            config.model.clone(),
            prompts,
            RetryPolicy::from(&config.retry),
        );
        let embedder = create_provider(&config.embedding, config.api_key.as_deref())?;

        Ok(Self::new(config, lm, embedder))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn language_model(&self) -> &LanguageModel {
        &self.lm
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    fn index_builder(&self) -> IndexBuilder {
        IndexBuilder::new(Arc::clone(&self.embedder), self.config.persist_dir())
            .with_batch_size(self.config.embedding.batch_size)
    }
}

/// Load documents under `root` (plus `urls`) and split them into chunks.
pub async fn load_chunks(
    retrieval: &RetrievalConfig,
    root: &Path,
    urls: &[String],
) -> AppResult<Vec<Chunk>> {
    let chunker = Chunker::new(ChunkerConfig::from(retrieval))?;

    let (mut units, report) = loader::load_directory(root);
    debug!("Load report: {:?}", report);
    units.extend(loader::load_web_pages(urls).await);

    Ok(chunker.split_units(&units))
}

/// Build the shared index, or load it when a persisted artifact exists.
///
/// Bad files, an unreachable embedding service and an unreadable artifact all
/// degrade the index instead of failing. Invalid chunking settings and a failure
/// to create the in-memory keyword index are errors.
#[instrument(skip_all, fields(root = %root.display(), urls = urls.len()))]
pub async fn build_index(services: &Services, root: &Path, urls: &[String]) -> AppResult<IndexHandle> {
    let builder = services.index_builder();

    if builder.has_artifact() {
        match builder.load() {
            Ok(index) => return Ok(Arc::new(index)),
            Err(e) => {
                let message = format!(
                    "Could not load persisted index from {:?}, using keyword search only: {}",
                    builder.persist_dir(),
                    e
                );
                warn!("{}", message);
                let chunks = load_chunks(&services.config.retrieval, root, urls).await?;
                return Ok(Arc::new(KnowledgeIndex::lexical_only(
                    chunks,
                    IndexOrigin::Built,
                    vec![message],
                )?));
            }
        }
    }

    let chunks = load_chunks(&services.config.retrieval, root, urls).await?;
    Ok(Arc::new(builder.build(chunks).await?))
}

/// Delete the persisted semantic index so the next build recomputes it.
pub fn clear_index(config: &AppConfig) -> AppResult<()> {
    let dir = config.persist_dir();
    info!("Clearing persisted index at {:?}", dir);
    store::clear(&dir)
}

/// Conversation state owned by exactly one user session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub history: Vec<ConversationTurn>,
    pub mode: Mode,
}

impl Session {
    pub fn new(mode: Mode) -> Self {
        Self {
            history: Vec::new(),
            mode,
        }
    }

    /// Drop the last exchange; the flag is false when there was nothing to undo.
    pub fn undo(self) -> (Self, bool) {
        let (history, undone) = undo_last_turn(self.history);
        (
            Self {
                history,
                mode: self.mode,
            },
            undone,
        )
    }
}

/// Remove the trailing user + assistant pair, if and only if it is there.
pub fn undo_last_turn(mut history: Vec<ConversationTurn>) -> (Vec<ConversationTurn>, bool) {
    let n = history.len();
    let trailing_pair = n >= 2
        && history[n - 2].role == Role::User
        && history[n - 1].role == Role::Assistant;

    if trailing_pair {
        history.truncate(n - 2);
    }
    (history, trailing_pair)
}

/// The per-turn answer pipeline over one shared index.
#[derive(Debug, Clone)]
pub struct Pipeline {
    services: Services,
    index: Option<IndexHandle>,
    normalizer: ResponseNormalizer,
}

impl Pipeline {
    /// `index` may be absent; answering then fails with `IndexNotInitialized`.
    pub fn new(services: Services, index: Option<IndexHandle>) -> Self {
        let root_name = services
            .config
            .retrieval
            .data_dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "data".to_string());

        Self {
            services,
            index,
            normalizer: ResponseNormalizer::new(root_name),
        }
    }

    pub fn index(&self) -> Option<&IndexHandle> {
        self.index.as_ref()
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Answer one input given prior turns.
    ///
    /// `mode_hint` is the session's current mode; routing rules may override it.
    #[instrument(skip(self, history), fields(turns = history.len()))]
    pub async fn answer(
        &self,
        input: &str,
        history: &[ConversationTurn],
        mode_hint: Option<Mode>,
    ) -> AppResult<StructuredAnswer> {
        let index = self.index.as_ref().ok_or_else(|| {
            AppError::IndexNotInitialized(
                "answer() was called before the document index was built".to_string(),
            )
        })?;

        let routed = mode::route(input, mode_hint.unwrap_or_default());
        let mode = routed.mode;
        debug!("Routed to {} (direct_table: {})", mode, routed.direct_table);

        let lm = &self.services.lm;
        let retrieval = &self.services.config.retrieval;

        let query = rewrite_query(lm, input, history).await;
        let chunks = Retriever::for_index(index, retrieval, lm)
            .retrieve(&query)
            .await;
        let chunks = rerank(chunks, &[input, query.as_str()], &retrieval.folder_keywords);

        let answer = if chunks.is_empty() {
            info!("No documents matched; returning canonical no-match answer");
            StructuredAnswer::no_documents(mode)
        } else {
            let raw = synthesize(lm, input, history, &chunks, mode).await;
            debug!("Raw response: {}", raw);
            self.normalizer.normalize(&raw, mode)
        };

        match serde_json::to_string(&answer) {
            Ok(serialized) => info!(answer = %serialized, "Turn answered"),
            Err(e) => warn!("Failed to serialize answer for logging: {}", e),
        }

        Ok(answer)
    }

    /// Answer `input` and return the session with both turns appended.
    pub async fn turn(&self, session: Session, input: &str) -> AppResult<(Session, StructuredAnswer)> {
        let answer = self.answer(input, &session.history, Some(session.mode)).await?;

        let mut history = session.history;
        history.push(ConversationTurn::user(input));
        history.push(ConversationTurn::assistant(answer.clone()));

        Ok((
            Session {
                history,
                mode: answer.mode,
            },
            answer,
        ))
    }
}
