//! SQLite artifact for the semantic index.
//!
//! The artifact directory holds a single `index.sqlite`. A non-empty
//! directory is the signal to load rather than rebuild.

use crate::types::{Chunk, UnitMetadata};
use docscout_core::{AppError, AppResult};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};

pub const ARTIFACT_FILE: &str = "index.sqlite";

/// Which embedding setup produced an artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactInfo {
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
}

pub fn artifact_path(dir: &Path) -> PathBuf {
    dir.join(ARTIFACT_FILE)
}

/// True when `dir` exists and has at least one entry.
pub fn artifact_exists(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

/// Remove everything under `dir`, keeping the directory itself.
pub fn clear(dir: &Path) -> AppResult<()> {
    if !dir.exists() {
        return Ok(());
    }
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            std::fs::remove_dir_all(&path)?;
        } else {
            std::fs::remove_file(&path)?;
        }
    }
    tracing::debug!("Cleared index directory {:?}", dir);
    Ok(())
}

fn open(db_path: &Path) -> AppResult<Connection> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| AppError::Index(format!("Failed to create index directory: {}", e)))?;
    }

    let conn = Connection::open(db_path)
        .map_err(|e| AppError::Index(format!("Failed to open SQLite index: {}", e)))?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS index_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS chunks (
            id TEXT PRIMARY KEY,
            position INTEGER NOT NULL,
            source TEXT NOT NULL,
            page INTEGER,
            is_merged INTEGER NOT NULL,
            sequence INTEGER NOT NULL,
            content TEXT NOT NULL,
            embedding BLOB NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_chunks_position ON chunks(position);
        "#,
    )
    .map_err(|e| AppError::Index(format!("Failed to create tables: {}", e)))?;

    Ok(conn)
}

/// Write every entry in one transaction.
pub fn save(dir: &Path, info: &ArtifactInfo, entries: &[(Chunk, Vec<f32>)]) -> AppResult<()> {
    let mut conn = open(&artifact_path(dir))?;
    let tx = conn.transaction()?;

    tx.execute("DELETE FROM chunks", [])?;
    tx.execute("DELETE FROM index_meta", [])?;

    for (key, value) in [
        ("provider", info.provider.clone()),
        ("model", info.model.clone()),
        ("dimensions", info.dimensions.to_string()),
    ] {
        tx.execute(
            "INSERT INTO index_meta (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
    }

    {
        let mut stmt = tx.prepare(
            "INSERT OR REPLACE INTO chunks
             (id, position, source, page, is_merged, sequence, content, embedding)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;
        for (position, (chunk, embedding)) in entries.iter().enumerate() {
            stmt.execute(params![
                chunk.id,
                position as i64,
                chunk.metadata.source,
                chunk.metadata.page.map(|p| p as i64),
                chunk.metadata.is_merged,
                chunk.sequence as i64,
                chunk.content,
                embedding_to_bytes(embedding),
            ])?;
        }
    }

    tx.commit()?;

    tracing::debug!("Persisted {} embedded chunks to {:?}", entries.len(), dir);
    Ok(())
}

/// Read an artifact back in insertion order.
pub fn load(dir: &Path) -> AppResult<(ArtifactInfo, Vec<(Chunk, Vec<f32>)>)> {
    let db_path = artifact_path(dir);
    if !db_path.exists() {
        return Err(AppError::Index(format!(
            "No {} found in {:?}",
            ARTIFACT_FILE, dir
        )));
    }

    let conn = open(&db_path)?;
    let info = read_info(&conn)?;

    let mut stmt = conn.prepare(
        "SELECT id, source, page, is_merged, sequence, content, embedding
         FROM chunks ORDER BY position",
    )?;

    let rows = stmt.query_map([], |row| {
        let page: Option<i64> = row.get(2)?;
        let metadata = UnitMetadata {
            source: row.get(1)?,
            page: page.map(|p| p as u32),
            is_merged: row.get(3)?,
        };
        let chunk = Chunk {
            id: row.get(0)?,
            content: row.get(5)?,
            metadata,
            sequence: row.get::<_, i64>(4)? as u32,
        };
        let bytes: Vec<u8> = row.get(6)?;
        Ok((chunk, bytes))
    })?;

    let mut entries = Vec::new();
    for row in rows {
        let (chunk, bytes) = row?;
        let embedding = bytes_to_embedding(&bytes)?;
        if embedding.len() != info.dimensions {
            return Err(AppError::Index(format!(
                "Chunk {} has {} dimensions, artifact declares {}",
                chunk.id,
                embedding.len(),
                info.dimensions
            )));
        }
        entries.push((chunk, embedding));
    }

    tracing::debug!("Loaded {} embedded chunks from {:?}", entries.len(), dir);
    Ok((info, entries))
}

fn read_info(conn: &Connection) -> AppResult<ArtifactInfo> {
    let get = |key: &str| -> AppResult<String> {
        conn.query_row(
            "SELECT value FROM index_meta WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .map_err(|e| AppError::Index(format!("Index metadata '{}' missing: {}", key, e)))
    };

    let dimensions = get("dimensions")?
        .parse()
        .map_err(|e| AppError::Index(format!("Invalid dimensions in index metadata: {}", e)))?;

    Ok(ArtifactInfo {
        provider: get("provider")?,
        model: get("model")?,
        dimensions,
    })
}

fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Index(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}
