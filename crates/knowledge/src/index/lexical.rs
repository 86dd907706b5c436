//! Keyword index: an in-memory SQLite FTS5 table ranked with `bm25()`.
//!
//! Chunk text is run through [`tokenize`] and stored as space-separated terms,
//! so the `unicode61` tokenizer indexes exactly those terms. Rowids are chunk
//! positions, which keeps hits tied to the same chunk identities the semantic
//! index uses.

use crate::types::Chunk;
use docscout_core::{AppError, AppResult};
use rusqlite::{params, Connection};
use std::sync::Mutex;
use tracing::debug;
use unicode_segmentation::UnicodeSegmentation;

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "can", "do", "does", "for", "from", "how",
    "i", "in", "is", "it", "its", "me", "my", "of", "on", "or", "our", "please", "that", "the",
    "their", "this", "to", "was", "we", "were", "what", "where", "which", "who", "with", "you",
    "your",
];

/// Hiragana, Katakana, CJK ideographs and half-width Katakana.
fn is_cjk(c: char) -> bool {
    matches!(
        c as u32,
        0x3040..=0x30FF | 0x3400..=0x4DBF | 0x4E00..=0x9FFF | 0xF900..=0xFAFF | 0xFF66..=0xFF9F
    )
}

/// Overlapping character bigrams; a single character stands alone.
fn push_bigrams(run: &str, tokens: &mut Vec<String>) {
    let chars: Vec<char> = run.chars().collect();
    match chars.len() {
        0 => {}
        1 => tokens.push(run.to_string()),
        _ => tokens.extend(chars.windows(2).map(|pair| pair.iter().collect::<String>())),
    }
}

/// Lowercased Unicode word tokens with common English function words removed.
///
/// CJK runs have no word separators, so they become character bigrams.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        let split = rest.find(is_cjk).unwrap_or(rest.len());
        let (plain, tail) = rest.split_at(split);
        tokens.extend(
            plain
                .unicode_words()
                .map(str::to_lowercase)
                .filter(|w| !STOP_WORDS.contains(&w.as_str())),
        );

        let end = tail.find(|c: char| !is_cjk(c)).unwrap_or(tail.len());
        let (run, after) = tail.split_at(end);
        push_bigrams(run, &mut tokens);
        rest = after;
    }

    tokens
}

/// FTS5 query matching any of the query's distinct terms.
fn match_expression(query: &str) -> Option<String> {
    let mut terms: Vec<String> = Vec::new();
    for term in tokenize(query) {
        if !terms.contains(&term) {
            terms.push(term);
        }
    }

    if terms.is_empty() {
        return None;
    }

    Some(
        terms
            .iter()
            .map(|t| format!("\"{}\"", t.replace('"', "\"\"")))
            .collect::<Vec<_>>()
            .join(" OR "),
    )
}

pub struct LexicalIndex {
    chunks: Vec<Chunk>,
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for LexicalIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LexicalIndex")
            .field("chunks", &self.chunks.len())
            .finish()
    }
}

impl LexicalIndex {
    pub fn build(chunks: Vec<Chunk>) -> AppResult<Self> {
        let mut conn = Connection::open_in_memory()
            .map_err(|e| AppError::Index(format!("Failed to open keyword index: {}", e)))?;

        conn.execute_batch("CREATE VIRTUAL TABLE chunks_fts USING fts5(terms, tokenize = 'unicode61');")
            .map_err(|e| AppError::Index(format!("Failed to create keyword index: {}", e)))?;

        let tx = conn.transaction()?;
        {
            let mut insert = tx.prepare("INSERT INTO chunks_fts(rowid, terms) VALUES (?1, ?2)")?;
            for (position, chunk) in chunks.iter().enumerate() {
                insert.execute(params![position as i64, tokenize(&chunk.content).join(" ")])?;
            }
        }
        tx.commit()?;

        Ok(Self {
            chunks,
            conn: Mutex::new(conn),
        })
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Top `k` chunks sharing at least one query term, best first.
    ///
    /// Scores are negated `bm25()` values, so higher is better. Equal scores keep
    /// index order.
    pub fn search(&self, query: &str, k: usize) -> AppResult<Vec<(Chunk, f32)>> {
        let Some(expression) = match_expression(query) else {
            return Ok(Vec::new());
        };
        if k == 0 {
            return Ok(Vec::new());
        }

        let conn = self
            .conn
            .lock()
            .map_err(|_| AppError::Index("Keyword index lock poisoned".to_string()))?;

        let mut stmt = conn.prepare_cached(
            "SELECT rowid, bm25(chunks_fts) AS score
             FROM chunks_fts
             WHERE chunks_fts MATCH ?1
             ORDER BY score, rowid
             LIMIT ?2",
        )?;

        let rows = stmt.query_map(params![expression, k as i64], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, f64>(1)?))
        })?;

        let mut hits = Vec::new();
        for row in rows {
            let (rowid, score) = row?;
            if let Some(chunk) = usize::try_from(rowid).ok().and_then(|i| self.chunks.get(i)) {
                hits.push((chunk.clone(), (-score) as f32));
            }
        }

        debug!("Lexical search matched {} chunks", hits.len());
        Ok(hits)
    }
}
