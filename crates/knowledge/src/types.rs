//! Domain types shared by the loader, indexes and answer pipeline.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Reply the document-search prompt asks the model to give when nothing fits.
pub const NO_DOC_MATCH_ANSWER: &str = "No matching documents found.";

/// Reply the inquiry prompt asks the model to give when nothing fits.
pub const INQUIRY_NO_MATCH_ANSWER: &str = "I could not find the information needed to answer.";

/// Canonical user-facing text when no document supports an answer.
pub const NO_DOC_MATCH_MESSAGE: &str =
    "No internal documents related to your input were found. Please try rephrasing your question.";

/// Provenance carried by every unit and chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitMetadata {
    /// Absolute `/`-separated path, or URL
    pub source: String,

    /// 0-based page for paged formats
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,

    /// True for a whole table merged into one unit
    #[serde(default)]
    pub is_merged: bool,
}

impl UnitMetadata {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            page: None,
            is_merged: false,
        }
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn merged(mut self) -> Self {
        self.is_merged = true;
        self
    }

    /// Whether the source was fetched over HTTP(S).
    pub fn is_web(&self) -> bool {
        is_url(&self.source)
    }
}

/// Normalized text with provenance, as produced by the loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentUnit {
    pub content: String,
    pub metadata: UnitMetadata,
}

impl DocumentUnit {
    pub fn new(content: impl Into<String>, metadata: UnitMetadata) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }
}

/// A retrieval-sized fragment of a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Stable identity shared by the semantic and lexical indexes
    pub id: String,

    pub content: String,

    pub metadata: UnitMetadata,

    /// Position within the parent unit, in split order
    pub sequence: u32,
}

impl Chunk {
    pub fn new(content: impl Into<String>, metadata: UnitMetadata, sequence: u32) -> Self {
        let content = content.into();
        let id = chunk_id(&metadata, sequence, &content);
        Self {
            id,
            content,
            metadata,
            sequence,
        }
    }

    /// The chunk indexed when no documents were loaded.
    pub fn placeholder() -> Self {
        Self::new("", UnitMetadata::new("(empty)"), 0)
    }

    pub fn is_placeholder(&self) -> bool {
        self.content.is_empty()
    }
}

/// Hash of provenance plus content, hex encoded.
fn chunk_id(metadata: &UnitMetadata, sequence: u32, content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(metadata.source.as_bytes());
    hasher.update(b"\0");
    hasher.update(metadata.page.map(|p| p.to_string()).unwrap_or_default());
    hasher.update(b"\0");
    hasher.update(sequence.to_le_bytes());
    hasher.update(content.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..32].to_string()
}

/// Response style contract for one turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Locate which document holds the information
    #[default]
    DocumentSearch,
    /// Explain or summarize from the documents
    Inquiry,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::DocumentSearch => "document_search",
            Mode::Inquiry => "inquiry",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "document_search" | "search" | "documents" => Ok(Mode::DocumentSearch),
            "inquiry" | "ask" | "explain" => Ok(Mode::Inquiry),
            other => Err(format!(
                "Unknown mode '{}'. Expected document_search or inquiry",
                other
            )),
        }
    }
}

/// Where an answer's content came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    /// Source as recorded on the chunk
    pub source: String,

    /// 0-based page, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,

    /// Display form: root-relative path plus optional "(page N)"
    pub label: String,
}

/// Durable, replayable result of one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredAnswer {
    pub mode: Mode,
    pub answer_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_citation: Option<Citation>,
    #[serde(default)]
    pub secondary_citations: Vec<Citation>,
    /// Renderers must not show a source list when set
    #[serde(default)]
    pub suppress_citations: bool,
}

impl StructuredAnswer {
    /// The canonical "nothing relevant" answer.
    pub fn no_documents(mode: Mode) -> Self {
        Self {
            mode,
            answer_text: NO_DOC_MATCH_MESSAGE.to_string(),
            primary_citation: None,
            secondary_citations: Vec::new(),
            suppress_citations: true,
        }
    }

    /// Primary citation followed by the secondary ones.
    pub fn citations(&self) -> impl Iterator<Item = &Citation> {
        self.primary_citation
            .iter()
            .chain(self.secondary_citations.iter())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Turn payload: raw user text or a structured answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TurnContent {
    Text(String),
    Answer(StructuredAnswer),
}

impl TurnContent {
    /// Plain text used when replaying history into a prompt.
    pub fn as_text(&self) -> &str {
        match self {
            TurnContent::Text(text) => text,
            TurnContent::Answer(answer) => &answer.answer_text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: TurnContent,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: TurnContent::Text(text.into()),
        }
    }

    pub fn assistant(answer: StructuredAnswer) -> Self {
        Self {
            role: Role::Assistant,
            content: TurnContent::Answer(answer),
        }
    }
}

pub(crate) fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}
