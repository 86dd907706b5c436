//! Type-specific readers that turn one file into raw text.

use docscout_core::{AppError, AppResult};
use std::fs;
use std::io::Read;
use std::path::Path;

/// Upper bound for `word/document.xml` inside a .docx archive.
const MAX_XML_ENTRY_BYTES: u64 = 32 * 1024 * 1024;

/// Content type classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Pdf,
    Docx,
    Csv,
    PlainText,
    Markdown,
    Unsupported,
}

impl ContentType {
    /// Detect content type from file extension.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("pdf") => Self::Pdf,
            Some("docx") => Self::Docx,
            Some("csv") => Self::Csv,
            Some("txt") => Self::PlainText,
            Some("md") | Some("markdown") => Self::Markdown,
            _ => Self::Unsupported,
        }
    }

    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Csv => "csv",
            Self::PlainText => "text",
            Self::Markdown => "markdown",
            Self::Unsupported => "unsupported",
        }
    }
}

/// Raw text pulled out of one file.
#[derive(Debug, Clone, PartialEq)]
pub enum Extracted {
    /// (0-based page, text) per page
    Pages(Vec<(u32, String)>),
    /// Whole-file text
    Text(String),
    /// A table rendered as one block
    Table(String),
}

/// Parse a source file by extension.
pub fn parse_file(path: &Path) -> AppResult<Extracted> {
    match ContentType::from_path(path) {
        ContentType::Pdf => read_pdf(path).map(Extracted::Pages),
        ContentType::Docx => {
            let bytes = fs::read(path)?;
            extract_docx(&bytes).map(Extracted::Text)
        }
        ContentType::Csv => {
            let bytes = fs::read(path)?;
            let title = path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "table".to_string());
            merge_csv(&String::from_utf8_lossy(&bytes), &title).map(Extracted::Table)
        }
        ContentType::PlainText | ContentType::Markdown => {
            let bytes = fs::read(path)?;
            Ok(Extracted::Text(String::from_utf8_lossy(&bytes).into_owned()))
        }
        ContentType::Unsupported => Err(AppError::Knowledge(format!(
            "Unsupported file type: {:?}",
            path
        ))),
    }
}

/// Read a PDF page by page.
///
/// Pages whose text cannot be extracted are skipped with a warning; a file
/// that cannot be opened is an error.
fn read_pdf(path: &Path) -> AppResult<Vec<(u32, String)>> {
    let document = lopdf::Document::load(path)
        .map_err(|e| AppError::Knowledge(format!("Failed to load PDF {:?}: {}", path, e)))?;

    let mut pages = Vec::new();
    for page_number in document.get_pages().keys() {
        match document.extract_text(&[*page_number]) {
            Ok(text) => pages.push((page_number.saturating_sub(1), text)),
            Err(e) => tracing::warn!(
                "Skipping page {} of {:?}: {}",
                page_number,
                path,
                e
            ),
        }
    }

    Ok(pages)
}

/// Extract paragraph text from a .docx archive.
pub fn extract_docx(bytes: &[u8]) -> AppResult<String> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| AppError::Knowledge(format!("Invalid docx archive: {}", e)))?;

    let entry = archive
        .by_name("word/document.xml")
        .map_err(|e| AppError::Knowledge(format!("word/document.xml not found: {}", e)))?;

    let mut doc_xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut doc_xml)?;
    if doc_xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(AppError::Knowledge(
            "word/document.xml exceeds size limit".to_string(),
        ));
    }

    extract_paragraph_text(&doc_xml)
}

/// Collect `w:t` runs, one line per `w:p` paragraph.
fn extract_paragraph_text(xml: &[u8]) -> AppResult<String> {
    use quick_xml::events::Event;

    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => {
                if let Ok(Event::Text(te)) = reader.read_event_into(&mut buf) {
                    let text = te
                        .unescape()
                        .map_err(|e| AppError::Knowledge(format!("Bad docx text: {}", e)))?;
                    out.push_str(&text);
                }
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"p" => out.push('\n'),
            Ok(Event::Eof) => break,
            Err(e) => return Err(AppError::Knowledge(format!("Malformed docx XML: {}", e))),
            _ => {}
        }
        buf.clear();
    }

    Ok(out)
}

/// Render every CSV row as a `- key: value / key: value` bullet under a title line.
///
/// Empty cells and empty rows are dropped. A leading byte-order mark is ignored.
pub fn merge_csv(text: &str, title: &str) -> AppResult<String> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| AppError::Knowledge(format!("Failed to read CSV headers: {}", e)))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut lines = vec![format!("[{} (merged table)]", title)];
    for record in reader.records() {
        let record =
            record.map_err(|e| AppError::Knowledge(format!("Failed to parse CSV row: {}", e)))?;

        let fields: Vec<String> = headers
            .iter()
            .zip(record.iter())
            .filter(|(_, value)| !value.trim().is_empty())
            .map(|(key, value)| format!("{}: {}", key, value.trim()))
            .collect();

        if !fields.is_empty() {
            lines.push(format!("- {}", fields.join(" / ")));
        }
    }

    Ok(lines.join("\n"))
}
