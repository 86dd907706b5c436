//! Tiered retrieval with graceful degradation, then hint-based re-ranking.
//!
//! Tiers run in order and the first non-empty result wins. A tier that errors
//! counts as empty.

use super::LanguageModel;
use crate::index::{KnowledgeIndex, LexicalIndex, SemanticIndex};
use crate::types::Chunk;
use async_trait::async_trait;
use docscout_core::{AppResult, RetrievalConfig};
use docscout_prompt::RETRIEVAL_HYDE;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// One retrieval strategy.
#[async_trait]
pub trait RetrievalTier: Send + Sync {
    fn name(&self) -> &'static str;

    async fn retrieve(&self, query: &str) -> AppResult<Vec<Chunk>>;
}

/// Nearest-neighbour search over the semantic index.
pub struct SemanticTier<'a> {
    name: &'static str,
    index: &'a SemanticIndex,
    k: usize,
    min_score: f32,
}

#[async_trait]
impl RetrievalTier for SemanticTier<'_> {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn retrieve(&self, query: &str) -> AppResult<Vec<Chunk>> {
        let hits = self.index.search(query, self.k, self.min_score).await?;
        Ok(hits.into_iter().map(|(chunk, _)| chunk).collect())
    }
}

/// Semantic search driven by a generated passage instead of the question.
pub struct HydeTier<'a> {
    index: &'a SemanticIndex,
    lm: &'a LanguageModel,
    k: usize,
    min_score: f32,
}

impl HydeTier<'_> {
    async fn passage(&self, query: &str) -> String {
        let mut variables = HashMap::new();
        variables.insert("question".to_string(), query.to_string());

        match self.lm.complete(RETRIEVAL_HYDE, variables).await {
            Ok(passage) if !passage.trim().is_empty() => passage,
            Ok(_) => query.to_string(),
            Err(e) => {
                warn!("Hypothetical passage generation failed: {}", e);
                query.to_string()
            }
        }
    }
}

#[async_trait]
impl RetrievalTier for HydeTier<'_> {
    fn name(&self) -> &'static str {
        "hyde"
    }

    async fn retrieve(&self, query: &str) -> AppResult<Vec<Chunk>> {
        let passage = self.passage(query).await;
        debug!("Searching with hypothetical passage: {:?}", passage);
        let hits = self.index.search(&passage, self.k, self.min_score).await?;
        Ok(hits.into_iter().map(|(chunk, _)| chunk).collect())
    }
}

/// BM25 keyword search.
pub struct LexicalTier<'a> {
    index: &'a LexicalIndex,
    k: usize,
}

#[async_trait]
impl RetrievalTier for LexicalTier<'_> {
    fn name(&self) -> &'static str {
        "lexical"
    }

    async fn retrieve(&self, query: &str) -> AppResult<Vec<Chunk>> {
        Ok(self
            .index
            .search(query, self.k)?
            .into_iter()
            .map(|(chunk, _)| chunk)
            .collect())
    }
}

/// Ordered list of tiers.
pub struct Retriever<'a> {
    tiers: Vec<Box<dyn RetrievalTier + 'a>>,
}

impl<'a> Retriever<'a> {
    pub fn new(tiers: Vec<Box<dyn RetrievalTier + 'a>>) -> Self {
        Self { tiers }
    }

    /// Semantic, widened semantic, HyDE, then lexical.
    ///
    /// The three semantic tiers are left out when the index has no semantic side.
    pub fn for_index(
        index: &'a KnowledgeIndex,
        config: &RetrievalConfig,
        lm: &'a LanguageModel,
    ) -> Self {
        let mut tiers: Vec<Box<dyn RetrievalTier + 'a>> = Vec::new();

        // `min_relevance` is a tunable floor on cosine similarity, not a fixed
        // rule of the cascade; 0.0 lets every nearest neighbour through.
        if let Some(semantic) = index.semantic() {
            tiers.push(Box::new(SemanticTier {
                name: "semantic",
                index: semantic,
                k: config.top_k,
                min_score: config.min_relevance,
            }));
            tiers.push(Box::new(SemanticTier {
                name: "widened",
                index: semantic,
                k: config.widened_k(),
                min_score: config.min_relevance / 2.0,
            }));
            tiers.push(Box::new(HydeTier {
                index: semantic,
                lm,
                k: config.top_k,
                min_score: config.min_relevance,
            }));
        }

        tiers.push(Box::new(LexicalTier {
            index: index.lexical(),
            k: config.effective_lexical_top_k(),
        }));

        Self::new(tiers)
    }

    pub fn tier_names(&self) -> Vec<&'static str> {
        self.tiers.iter().map(|t| t.name()).collect()
    }

    /// First non-empty tier result, or empty when every tier misses or fails.
    pub async fn retrieve(&self, query: &str) -> Vec<Chunk> {
        for tier in &self.tiers {
            match tier.retrieve(query).await {
                Ok(chunks) if !chunks.is_empty() => {
                    info!("Retrieved {} chunks from {} tier", chunks.len(), tier.name());
                    return chunks;
                }
                Ok(_) => debug!("{} tier returned nothing", tier.name()),
                Err(e) => warn!("{} tier failed: {}", tier.name(), e),
            }
        }

        info!("No tier returned any chunks");
        Vec::new()
    }
}

const FILE_EXTENSIONS: &[&str] = &[".pdf", ".docx", ".txt", ".csv", ".md"];

/// File names such as `handbook.pdf` mentioned in `text`, lowercased.
fn file_hints(text: &str) -> Vec<String> {
    text.split(|c: char| c.is_whitespace() || "\"'`()[]{}<>,;:!?「」".contains(c))
        .map(|token| token.trim_end_matches('.').to_lowercase())
        .filter(|token| FILE_EXTENSIONS.iter().any(|ext| token.ends_with(ext)))
        .map(|token| match token.rsplit_once(['/', '\\']) {
            Some((_, name)) => name.to_string(),
            None => token,
        })
        .filter(|name| !FILE_EXTENSIONS.contains(&name.as_str()))
        .collect()
}

fn file_name(source: &str) -> String {
    source
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(source)
        .to_lowercase()
}

/// ` word word ` form for whole-word containment checks.
fn padded_words(text: &str) -> String {
    let words: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect();
    format!(" {} ", words.join(" "))
}

/// Whether a directory of `source` is named by `keyword`.
fn in_folder(source: &str, keyword: &str) -> bool {
    let mut segments: Vec<&str> = source.split(['/', '\\']).collect();
    segments.pop();
    let needle = format!(" {} ", keyword);
    segments
        .iter()
        .any(|segment| padded_words(segment).contains(&needle))
}

/// Move chunks from files or folders named in `hints` to the front.
///
/// Order is: named file, then named folder keyword, then the rest, each group
/// sorted by source. Without any hint the input order is kept.
pub fn rerank(chunks: Vec<Chunk>, hints: &[&str], folder_keywords: &[String]) -> Vec<Chunk> {
    let files: Vec<String> = hints.iter().flat_map(|h| file_hints(h)).collect();
    let hint_words = padded_words(&hints.join(" "));
    let folders: Vec<String> = folder_keywords
        .iter()
        .map(|k| padded_words(k).trim().to_string())
        .filter(|k| !k.is_empty() && hint_words.contains(&format!(" {} ", k)))
        .collect();

    if files.is_empty() && folders.is_empty() {
        return chunks;
    }

    debug!("Re-ranking with file hints {:?} and folders {:?}", files, folders);

    let rank = |chunk: &Chunk| -> u8 {
        let source = &chunk.metadata.source;
        if files.contains(&file_name(source)) {
            0
        } else if folders.iter().any(|f| in_folder(source, f)) {
            1
        } else {
            2
        }
    };

    let mut ranked: Vec<(u8, Chunk)> = chunks.into_iter().map(|c| (rank(&c), c)).collect();
    ranked.sort_by(|a, b| {
        a.0.cmp(&b.0)
            .then_with(|| a.1.metadata.source.cmp(&b.1.metadata.source))
    });
    ranked.into_iter().map(|(_, chunk)| chunk).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::MockProvider;
    use crate::index::IndexBuilder;
    use crate::types::UnitMetadata;
    use docscout_core::AppError;
    use docscout_llm::{MockClient, RetryPolicy};
    use docscout_prompt::PromptLibrary;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn chunk(source: &str, text: &str) -> Chunk {
        Chunk::new(text, UnitMetadata::new(source), 0)
    }

    fn sources(chunks: &[Chunk]) -> Vec<&str> {
        chunks.iter().map(|c| c.metadata.source.as_str()).collect()
    }

    struct Scripted {
        name: &'static str,
        result: Result<Vec<Chunk>, String>,
        calls: Arc<AtomicUsize>,
    }

    fn scripted(
        name: &'static str,
        result: Result<Vec<Chunk>, String>,
    ) -> (Box<dyn RetrievalTier>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let tier = Scripted {
            name,
            result,
            calls: Arc::clone(&calls),
        };
        (Box::new(tier), calls)
    }

    #[async_trait]
    impl RetrievalTier for Scripted {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn retrieve(&self, _query: &str) -> AppResult<Vec<Chunk>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone().map_err(AppError::Embedding)
        }
    }

    #[tokio::test]
    async fn test_first_non_empty_tier_wins() {
        let (first, _) = scripted("first", Ok(Vec::new()));
        let (second, second_calls) = scripted("second", Err("down".to_string()));
        let (third, _) = scripted("third", Ok(vec![chunk("/data/a.txt", "a")]));
        let (fourth, fourth_calls) = scripted("fourth", Ok(vec![chunk("/data/b.txt", "b")]));

        let retriever = Retriever::new(vec![first, second, third, fourth]);
        let chunks = retriever.retrieve("q").await;

        assert_eq!(sources(&chunks), vec!["/data/a.txt"]);
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fourth_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_all_tiers_failing_is_empty() {
        let (only, _) = scripted("only", Err("boom".to_string()));
        let retriever = Retriever::new(vec![only]);
        assert!(retriever.retrieve("q").await.is_empty());
    }

    #[tokio::test]
    async fn test_for_index_tier_order() {
        let temp = TempDir::new().unwrap();
        let lm = LanguageModel::new(
            Arc::new(MockClient::echo()),
            "m",
            PromptLibrary::builtin().unwrap(),
            RetryPolicy::default(),
        );
        let config = RetrievalConfig::default();

        let full = IndexBuilder::new(Arc::new(MockProvider::new(32)), temp.path().join("a"))
            .build(vec![chunk("/data/a.txt", "alpha")])
            .await
            .unwrap();
        assert_eq!(
            Retriever::for_index(&full, &config, &lm).tier_names(),
            vec!["semantic", "widened", "hyde", "lexical"]
        );

        let lexical = KnowledgeIndex::lexical_only(
            vec![chunk("/data/a.txt", "alpha")],
            crate::index::IndexOrigin::Built,
            Vec::new(),
        )
        .unwrap();
        assert_eq!(
            Retriever::for_index(&lexical, &config, &lm).tier_names(),
            vec!["lexical"]
        );
    }

    #[tokio::test]
    async fn test_zero_relevance_floor_keeps_every_neighbour() {
        let temp = TempDir::new().unwrap();
        let index = IndexBuilder::new(Arc::new(MockProvider::new(256)), temp.path().join("i"))
            .build(vec![
                chunk("/data/expenses.txt", "Reimbursement claims require itemised receipts."),
                chunk("/data/leave.txt", "Vacation accrues monthly."),
            ])
            .await
            .unwrap();
        let lm = LanguageModel::new(
            Arc::new(MockClient::echo()),
            "m",
            PromptLibrary::builtin().unwrap(),
            RetryPolicy::default(),
        );

        let default_config = RetrievalConfig::default();
        let chunks = Retriever::for_index(&index, &default_config, &lm)
            .retrieve("vacation")
            .await;
        assert_eq!(sources(&chunks), vec!["/data/leave.txt"]);

        let open_config = RetrievalConfig {
            min_relevance: 0.0,
            ..RetrievalConfig::default()
        };
        let chunks = Retriever::for_index(&index, &open_config, &lm)
            .retrieve("vacation")
            .await;
        let mut found = sources(&chunks);
        found.sort();
        assert_eq!(found, vec!["/data/expenses.txt", "/data/leave.txt"]);
    }

    #[tokio::test]
    async fn test_hyde_passage_reaches_documents_the_question_misses() {
        let temp = TempDir::new().unwrap();
        let index = IndexBuilder::new(Arc::new(MockProvider::new(256)), temp.path().join("i"))
            .build(vec![
                chunk("/data/expenses.txt", "Reimbursement claims require itemised receipts."),
                chunk("/data/leave.txt", "Vacation accrues monthly."),
            ])
            .await
            .unwrap();
        let lm = LanguageModel::new(
            Arc::new(MockClient::new(|_| {
                Ok("Reimbursement claims must include itemised receipts.".to_string())
            })),
            "m",
            PromptLibrary::builtin().unwrap(),
            RetryPolicy::default(),
        );

        let tier = HydeTier {
            index: index.semantic().unwrap(),
            lm: &lm,
            k: 1,
            min_score: 0.3,
        };
        let chunks = tier.retrieve("How do I get paid back for a taxi?").await.unwrap();
        assert_eq!(sources(&chunks), vec!["/data/expenses.txt"]);
    }

    #[test]
    fn test_named_file_ranks_first() {
        let chunks = vec![
            chunk("/srv/data/other.docx", "high similarity"),
            chunk("/srv/data/manuals/handbook.pdf", "lower similarity"),
        ];
        let ranked = rerank(chunks, &["Where is the dress code in handbook.pdf?"], &[]);
        assert_eq!(
            sources(&ranked),
            vec!["/srv/data/manuals/handbook.pdf", "/srv/data/other.docx"]
        );
    }

    #[test]
    fn test_folder_keyword_then_alphabetical() {
        let chunks = vec![
            chunk("/data/zeta.txt", "z"),
            chunk("/data/hr/b.txt", "b"),
            chunk("/data/alpha.txt", "a"),
            chunk("/data/hr/a.txt", "a"),
        ];
        let keywords = vec!["hr".to_string(), "sales".to_string()];
        let ranked = rerank(chunks, &["hr onboarding"], &keywords);
        assert_eq!(
            sources(&ranked),
            vec!["/data/hr/a.txt", "/data/hr/b.txt", "/data/alpha.txt", "/data/zeta.txt"]
        );
    }

    #[test]
    fn test_no_hints_keeps_order() {
        let chunks = vec![chunk("/data/b.txt", "b"), chunk("/data/a.txt", "a")];
        let ranked = rerank(chunks, &["vacation rules"], &["sales".to_string()]);
        assert_eq!(sources(&ranked), vec!["/data/b.txt", "/data/a.txt"]);
    }

    #[test]
    fn test_folder_match_is_whole_word() {
        assert!(in_folder("/data/hr/a.txt", "hr"));
        assert!(in_folder("/data/General_Affairs/a.txt", "general affairs"));
        assert!(!in_folder("/data/three/a.txt", "hr"));
        assert!(!in_folder("/data/hr.txt", "hr"));
    }

    #[test]
    fn test_file_hints_parsing() {
        assert_eq!(file_hints("open 'Q3/Report.PDF'."), vec!["report.pdf"]);
        assert!(file_hints("what is a .pdf").is_empty());
    }
}
