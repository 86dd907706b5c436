//! Semantic and lexical indexes over one chunk set.
//!
//! The semantic side is optional: it is loaded from the artifact directory when
//! one exists, otherwise embedded and persisted. Any embedding or load failure
//! leaves a lexical-only index and a warning in the stats.

pub mod lexical;
pub mod semantic;
pub mod store;

pub use lexical::LexicalIndex;
pub use semantic::SemanticIndex;

use crate::embeddings::EmbeddingProvider;
use crate::types::Chunk;
use docscout_core::{AppError, AppResult};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use store::ArtifactInfo;
use tracing::{info, warn};

/// Shared, read-only handle used by every session.
pub type IndexHandle = Arc<KnowledgeIndex>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexOrigin {
    /// Embedded from freshly loaded documents
    Built,
    /// Read from the persisted artifact
    Loaded,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexStats {
    pub chunks: usize,
    pub sources: usize,
    pub semantic_available: bool,
    pub origin: IndexOrigin,
    pub warnings: Vec<String>,
}

#[derive(Debug)]
pub struct KnowledgeIndex {
    semantic: Option<SemanticIndex>,
    lexical: LexicalIndex,
    stats: IndexStats,
}

impl KnowledgeIndex {
    fn assemble(
        semantic: Option<SemanticIndex>,
        chunks: Vec<Chunk>,
        origin: IndexOrigin,
        warnings: Vec<String>,
    ) -> AppResult<Self> {
        let chunks = if chunks.is_empty() {
            vec![Chunk::placeholder()]
        } else {
            chunks
        };

        let sources: BTreeSet<&str> = chunks
            .iter()
            .filter(|c| !c.is_placeholder())
            .map(|c| c.metadata.source.as_str())
            .collect();

        let stats = IndexStats {
            chunks: chunks.iter().filter(|c| !c.is_placeholder()).count(),
            sources: sources.len(),
            semantic_available: semantic.is_some(),
            origin,
            warnings,
        };

        Ok(Self {
            semantic,
            lexical: LexicalIndex::build(chunks)?,
            stats,
        })
    }

    /// Keyword-only index, used when the semantic side is unavailable.
    pub fn lexical_only(
        chunks: Vec<Chunk>,
        origin: IndexOrigin,
        warnings: Vec<String>,
    ) -> AppResult<Self> {
        Self::assemble(None, chunks, origin, warnings)
    }

    pub fn semantic(&self) -> Option<&SemanticIndex> {
        self.semantic.as_ref()
    }

    pub fn lexical(&self) -> &LexicalIndex {
        &self.lexical
    }

    pub fn stats(&self) -> &IndexStats {
        &self.stats
    }
}

/// Builds or loads a [`KnowledgeIndex`] against one artifact directory.
#[derive(Debug, Clone)]
pub struct IndexBuilder {
    embedder: Arc<dyn EmbeddingProvider>,
    persist_dir: PathBuf,
    batch_size: usize,
}

impl IndexBuilder {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, persist_dir: impl Into<PathBuf>) -> Self {
        Self {
            embedder,
            persist_dir: persist_dir.into(),
            batch_size: 64,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn persist_dir(&self) -> &Path {
        &self.persist_dir
    }

    /// Whether a persisted artifact should be loaded instead of rebuilt.
    pub fn has_artifact(&self) -> bool {
        store::artifact_exists(&self.persist_dir)
    }

    fn expected_info(&self) -> ArtifactInfo {
        ArtifactInfo {
            provider: self.embedder.provider_name().to_string(),
            model: self.embedder.model_name().to_string(),
            dimensions: self.embedder.dimensions(),
        }
    }

    /// Load the persisted artifact; both indexes share its chunks.
    pub fn load(&self) -> AppResult<KnowledgeIndex> {
        let (info, entries) = store::load(&self.persist_dir)?;

        let expected = self.expected_info();
        if info != expected {
            return Err(AppError::Index(format!(
                "Index was built with {}/{} ({} dims) but {}/{} ({} dims) is configured; \
                 run `docscout index --rebuild`",
                info.provider,
                info.model,
                info.dimensions,
                expected.provider,
                expected.model,
                expected.dimensions
            )));
        }

        let chunks: Vec<Chunk> = entries.iter().map(|(chunk, _)| chunk.clone()).collect();
        let semantic = SemanticIndex::new(entries, Arc::clone(&self.embedder));

        info!(
            "Loaded semantic index with {} chunks from {:?}",
            semantic.len(),
            self.persist_dir
        );

        KnowledgeIndex::assemble(Some(semantic), chunks, IndexOrigin::Loaded, Vec::new())
    }

    /// Embed and persist `chunks`, degrading to lexical-only on failure.
    ///
    /// Only a failure to create the in-memory keyword index is an error.
    pub async fn build(&self, chunks: Vec<Chunk>) -> AppResult<KnowledgeIndex> {
        if chunks.is_empty() {
            let message = "No documents loaded; index contains only an empty placeholder".to_string();
            warn!("{}", message);
            return KnowledgeIndex::lexical_only(chunks, IndexOrigin::Built, vec![message]);
        }

        let semantic =
            match SemanticIndex::embed(&chunks, Arc::clone(&self.embedder), self.batch_size).await {
                Ok(semantic) => semantic,
                Err(e) => {
                    let message = format!(
                        "Embedding service unavailable, using keyword search only: {}",
                        e
                    );
                    warn!("{}", message);
                    self.discard_artifact();
                    return KnowledgeIndex::lexical_only(chunks, IndexOrigin::Built, vec![message]);
                }
            };

        let mut warnings = Vec::new();
        if let Err(e) = store::save(&self.persist_dir, &self.expected_info(), semantic.entries()) {
            let message = format!("Failed to persist semantic index: {}", e);
            warn!("{}", message);
            self.discard_artifact();
            warnings.push(message);
        } else {
            info!(
                "Built semantic index with {} chunks in {:?}",
                semantic.len(),
                self.persist_dir
            );
        }

        KnowledgeIndex::assemble(Some(semantic), chunks, IndexOrigin::Built, warnings)
    }

    fn discard_artifact(&self) {
        if let Err(e) = store::clear(&self.persist_dir) {
            warn!("Failed to remove partial index at {:?}: {}", self.persist_dir, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::MockProvider;
    use crate::types::UnitMetadata;
    use tempfile::TempDir;

    #[derive(Debug)]
    struct DownProvider;

    #[async_trait::async_trait]
    impl EmbeddingProvider for DownProvider {
        fn provider_name(&self) -> &str {
            "down"
        }
        fn model_name(&self) -> &str {
            "down"
        }
        fn dimensions(&self) -> usize {
            8
        }
        async fn embed_batch(&self, _texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
            Err(AppError::Embedding("quota exceeded".to_string()))
        }
    }

    fn chunks() -> Vec<Chunk> {
        vec![
            Chunk::new("Travel needs receipts.", UnitMetadata::new("/data/travel.txt"), 0),
            Chunk::new("- name: Alice", UnitMetadata::new("/data/staff.csv").merged(), 0),
        ]
    }

    #[tokio::test]
    async fn test_build_persists_then_loads_same_identities() {
        let temp = TempDir::new().unwrap();
        let builder = IndexBuilder::new(Arc::new(MockProvider::new(64)), temp.path().join("idx"));

        assert!(!builder.has_artifact());
        let built = builder.build(chunks()).await.unwrap();
        assert!(built.stats().semantic_available);
        assert_eq!(built.stats().chunks, 2);
        assert_eq!(built.stats().sources, 2);
        assert!(builder.has_artifact());

        let loaded = builder.load().unwrap();
        assert_eq!(loaded.stats().origin, IndexOrigin::Loaded);
        let built_ids: Vec<_> = built.lexical().chunks().iter().map(|c| &c.id).collect();
        let loaded_ids: Vec<_> = loaded.lexical().chunks().iter().map(|c| &c.id).collect();
        assert_eq!(built_ids, loaded_ids);
        let semantic_ids: Vec<_> = loaded
            .semantic()
            .unwrap()
            .entries()
            .iter()
            .map(|(c, _)| &c.id)
            .collect();
        assert_eq!(semantic_ids, loaded_ids);
    }

    #[tokio::test]
    async fn test_embedding_failure_degrades_to_lexical() {
        let temp = TempDir::new().unwrap();
        let builder = IndexBuilder::new(Arc::new(DownProvider), temp.path().join("idx"));

        let index = builder.build(chunks()).await.unwrap();
        assert!(index.semantic().is_none());
        assert_eq!(index.stats().warnings.len(), 1);
        assert!(index.stats().warnings[0].contains("quota exceeded"));
        assert!(!builder.has_artifact());
        assert_eq!(index.lexical().search("receipts", 5).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_zero_chunks_uses_placeholder() {
        let temp = TempDir::new().unwrap();
        let builder = IndexBuilder::new(Arc::new(MockProvider::new(64)), temp.path().join("idx"));

        let index = builder.build(Vec::new()).await.unwrap();
        assert!(index.semantic().is_none());
        assert_eq!(index.lexical().len(), 1);
        assert_eq!(index.stats().chunks, 0);
        assert!(!builder.has_artifact());
    }

    #[tokio::test]
    async fn test_load_rejects_other_embedding_model() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("idx");
        IndexBuilder::new(Arc::new(MockProvider::new(64)), &dir)
            .build(chunks())
            .await
            .unwrap();

        let err = IndexBuilder::new(Arc::new(MockProvider::new(32)), &dir)
            .load()
            .unwrap_err();
        assert!(err.to_string().contains("--rebuild"));
    }
}
