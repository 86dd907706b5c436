//! In-memory vector index searched by cosine similarity.

use crate::embeddings::EmbeddingProvider;
use crate::types::Chunk;
use docscout_core::AppResult;
use std::sync::Arc;

/// Chunks paired with their embeddings, plus the provider that made them.
#[derive(Debug, Clone)]
pub struct SemanticIndex {
    entries: Vec<(Chunk, Vec<f32>)>,
    provider: Arc<dyn EmbeddingProvider>,
}

impl SemanticIndex {
    pub fn new(entries: Vec<(Chunk, Vec<f32>)>, provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { entries, provider }
    }

    /// Embed every chunk; any embedding failure fails the whole build.
    pub async fn embed(
        chunks: &[Chunk],
        provider: Arc<dyn EmbeddingProvider>,
        batch_size: usize,
    ) -> AppResult<Self> {
        let mut entries = Vec::with_capacity(chunks.len());

        for batch in chunks.chunks(batch_size.max(1)) {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let embeddings = provider.embed_batch(&texts).await?;
            if embeddings.len() != batch.len() {
                return Err(docscout_core::AppError::Embedding(format!(
                    "Expected {} embeddings, got {}",
                    batch.len(),
                    embeddings.len()
                )));
            }
            entries.extend(batch.iter().cloned().zip(embeddings));
            tracing::debug!("Embedded {}/{} chunks", entries.len(), chunks.len());
        }

        Ok(Self::new(entries, provider))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[(Chunk, Vec<f32>)] {
        &self.entries
    }

    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    /// Embed `query` and return the `k` nearest chunks scoring at least `min_score`.
    pub async fn search(&self, query: &str, k: usize, min_score: f32) -> AppResult<Vec<(Chunk, f32)>> {
        let query_embedding = self.provider.embed(query).await?;
        Ok(self.search_embedding(&query_embedding, k, min_score))
    }

    pub fn search_embedding(&self, query: &[f32], k: usize, min_score: f32) -> Vec<(Chunk, f32)> {
        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, (_, embedding))| (i, cosine_similarity(query, embedding)))
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        if let Some((_, top)) = scored.first() {
            tracing::debug!("Top semantic score {:.3} (cutoff {:.3})", top, min_score);
        }

        scored
            .into_iter()
            .filter(|(_, score)| *score >= min_score)
            .map(|(i, score)| (self.entries[i].0.clone(), score))
            .collect()
    }
}

/// Cosine similarity; zero when either vector is zero or lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
