//! Embedding providers used to build and query the semantic index.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};
