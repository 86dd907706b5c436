//! Splitting document units into retrieval-sized chunks.
//!
//! Merged tables are kept whole. Everything else goes through `text-splitter`,
//! which prefers paragraph, then line, then sentence boundaries and never
//! exceeds the configured character capacity.

use crate::types::{Chunk, DocumentUnit};
use docscout_core::{AppError, AppResult, RetrievalConfig};
use text_splitter::{ChunkConfig as SplitterConfig, TextSplitter};

/// Sizes in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkerConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub web_chunk_size: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self::from(&RetrievalConfig::default())
    }
}

impl From<&RetrievalConfig> for ChunkerConfig {
    fn from(config: &RetrievalConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
            web_chunk_size: config.web_chunk_size,
        }
    }
}

impl ChunkerConfig {
    /// Largest chunk this configuration can emit for a non-merged unit.
    pub fn max_chunk_size(&self) -> usize {
        self.chunk_size.max(self.web_chunk_size)
    }
}

pub struct Chunker {
    config: ChunkerConfig,
    file_splitter: TextSplitter<text_splitter::Characters>,
    web_splitter: TextSplitter<text_splitter::Characters>,
}

impl Chunker {
    pub fn new(config: ChunkerConfig) -> AppResult<Self> {
        let file_splitter = TextSplitter::new(splitter_config(
            config.chunk_size,
            config.chunk_overlap,
        )?);
        let web_splitter = TextSplitter::new(splitter_config(
            config.web_chunk_size,
            config.chunk_overlap,
        )?);

        Ok(Self {
            config,
            file_splitter,
            web_splitter,
        })
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Split every unit, preserving order and metadata.
    pub fn split_units(&self, units: &[DocumentUnit]) -> Vec<Chunk> {
        let chunks: Vec<Chunk> = units.iter().flat_map(|unit| self.split_unit(unit)).collect();

        tracing::debug!(
            "Chunker produced {} chunks from {} units",
            chunks.len(),
            units.len()
        );

        chunks
    }

    /// Split one unit; a merged unit becomes exactly one chunk.
    pub fn split_unit(&self, unit: &DocumentUnit) -> Vec<Chunk> {
        if unit.metadata.is_merged {
            return vec![Chunk::new(unit.content.clone(), unit.metadata.clone(), 0)];
        }

        let splitter = if unit.metadata.is_web() {
            &self.web_splitter
        } else {
            &self.file_splitter
        };

        splitter
            .chunks(&unit.content)
            .filter(|piece| !piece.trim().is_empty())
            .enumerate()
            .map(|(sequence, piece)| Chunk::new(piece, unit.metadata.clone(), sequence as u32))
            .collect()
    }
}

fn splitter_config(
    size: usize,
    overlap: usize,
) -> AppResult<SplitterConfig<text_splitter::Characters>> {
    SplitterConfig::new(size)
        .with_overlap(overlap.min(size.saturating_sub(1)))
        .map_err(|e| AppError::Config(format!("Invalid chunk settings: {}", e)))
}
