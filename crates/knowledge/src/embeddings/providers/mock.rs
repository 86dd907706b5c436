//! Deterministic hashed bag-of-words embeddings for tests and offline use.

use crate::embeddings::provider::EmbeddingProvider;
use crate::index::lexical::tokenize;
use docscout_core::AppResult;
use std::collections::HashMap;

/// Mock provider.
///
/// Each term adds weight to one dimension for the whole word and smaller
/// weights to one dimension per character trigram, so texts that share words
/// or word fragments land close together. Vectors are unit length; text with
/// no terms maps to the zero vector.
#[derive(Debug)]
pub struct MockProvider {
    dimensions: usize,
}

impl MockProvider {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn bucket(&self, value: &str, seed: u64) -> usize {
        let hash = value
            .bytes()
            .fold(seed, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
        (hash % self.dimensions as u64) as usize
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];

        let mut term_freq: HashMap<String, u32> = HashMap::new();
        for term in tokenize(text) {
            *term_freq.entry(term).or_insert(0) += 1;
        }

        for (term, freq) in &term_freq {
            let weight = (*freq as f32).sqrt();
            embedding[self.bucket(term, 17)] += weight;

            let chars: Vec<char> = term.chars().collect();
            for window in chars.windows(3) {
                let trigram: String = window.iter().collect();
                embedding[self.bucket(&trigram, 7919)] += 0.5 * weight;
            }
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut embedding {
                *v /= norm;
            }
        }

        embedding
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for MockProvider {
    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "hashed-terms-v1"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::semantic::cosine_similarity;

    #[tokio::test]
    async fn test_unit_length_and_deterministic() {
        let provider = MockProvider::new(384);
        let a = provider.embed("expense reimbursement policy").await.unwrap();
        let b = provider.embed("expense reimbursement policy").await.unwrap();

        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_shared_terms_score_higher() {
        let provider = MockProvider::new(384);
        let query = provider.embed("staff roster").await.unwrap();
        let related = provider
            .embed("The staff roster lists every employee and department.")
            .await
            .unwrap();
        let unrelated = provider
            .embed("Vacation days accrue monthly after probation ends.")
            .await
            .unwrap();

        assert!(cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated));
    }

    #[tokio::test]
    async fn test_stopwords_only_is_zero_vector() {
        let provider = MockProvider::new(64);
        let embedding = provider.embed("is the").await.unwrap();
        assert!(embedding.iter().all(|&x| x == 0.0));
    }

    #[tokio::test]
    async fn test_batch_preserves_order() {
        let provider = MockProvider::new(64);
        let texts = vec!["alpha report".to_string(), "beta memo".to_string()];
        let batch = provider.embed_batch(&texts).await.unwrap();
        assert_eq!(batch[1], provider.embed("beta memo").await.unwrap());
    }
}
