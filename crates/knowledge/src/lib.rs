//! Document knowledge base and retrieval-augmented answering.
//!
//! - Loading PDF, Word, CSV, text and web pages into provenance-tagged units
//! - Chunking, semantic (embedding) and lexical (BM25) indexes
//! - Tiered retrieval, query rewriting, mode routing, synthesis and
//!   citation normalization behind [`Pipeline`]

pub mod chunker;
pub mod embeddings;
pub mod index;
pub mod loader;
pub mod parser;
pub mod pipeline;
pub mod rag;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use embeddings::{create_provider, EmbeddingProvider};
pub use index::{IndexHandle, IndexOrigin, IndexStats, KnowledgeIndex};
pub use pipeline::{build_index, clear_index, undo_last_turn, Pipeline, Services, Session};
pub use rag::{classify, normalize, Classification, LanguageModel};
pub use types::{
    Chunk, Citation, ConversationTurn, DocumentUnit, Mode, Role, StructuredAnswer, TurnContent,
    UnitMetadata, NO_DOC_MATCH_ANSWER, NO_DOC_MATCH_MESSAGE,
};
