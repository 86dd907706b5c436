//! Document loading: directory traversal, per-type dispatch and web pages.
//!
//! Loading is best-effort: a file that fails to parse is logged and skipped.

use crate::parser::{self, ContentType, Extracted};
use crate::types::{DocumentUnit, UnitMetadata};
use docscout_core::{AppError, AppResult};
use std::path::Path;
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

/// Tally of one load, for operator logs and stats.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub files_loaded: usize,
    pub files_skipped: usize,
    pub files_failed: usize,
    pub pages_loaded: usize,
}

/// Recursively load every supported file under `root`.
#[instrument(skip_all, fields(root = %root.display()))]
pub fn load_directory(root: &Path) -> (Vec<DocumentUnit>, LoadReport) {
    let mut units = Vec::new();
    let mut report = LoadReport::default();

    if !root.exists() {
        warn!("Document root {:?} does not exist; nothing to load", root);
        return (units, report);
    }

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Failed to read directory entry: {}", e);
                report.files_failed += 1;
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if ContentType::from_path(path) == ContentType::Unsupported {
            debug!("Skipping unsupported file {:?}", path);
            report.files_skipped += 1;
            continue;
        }

        match load_file(path) {
            Ok(mut file_units) => {
                report.files_loaded += 1;
                report.pages_loaded += file_units.len();
                units.append(&mut file_units);
            }
            Err(e) => {
                warn!("Failed to load {:?}: {}", path, e);
                report.files_failed += 1;
            }
        }
    }

    info!(
        "Loaded {} units from {} files ({} skipped, {} failed)",
        units.len(),
        report.files_loaded,
        report.files_skipped,
        report.files_failed
    );

    (units, report)
}

/// Load one file into units whose `source` is the visited path.
pub fn load_file(path: &Path) -> AppResult<Vec<DocumentUnit>> {
    let source = normalize_source(path);

    let units = match parser::parse_file(path)? {
        Extracted::Pages(pages) => pages
            .into_iter()
            .filter_map(|(page, text)| {
                unit_from(text, UnitMetadata::new(source.clone()).with_page(page))
            })
            .collect(),
        Extracted::Text(text) => unit_from(text, UnitMetadata::new(source)).into_iter().collect(),
        Extracted::Table(text) => unit_from(text, UnitMetadata::new(source).merged())
            .into_iter()
            .collect(),
    };

    Ok(units)
}

/// Fetch each URL and keep its visible body text.
#[instrument(skip_all, fields(count = urls.len()))]
pub async fn load_web_pages(urls: &[String]) -> Vec<DocumentUnit> {
    if urls.is_empty() {
        return Vec::new();
    }

    let client = reqwest::Client::new();
    let mut units = Vec::new();

    for url in urls {
        match fetch_page(&client, url).await {
            Ok(text) => {
                if let Some(unit) = unit_from(text, UnitMetadata::new(url.clone())) {
                    units.push(unit);
                }
            }
            Err(e) => warn!("Failed to load {}: {}", url, e),
        }
    }

    info!("Loaded {} of {} web pages", units.len(), urls.len());
    units
}

async fn fetch_page(client: &reqwest::Client, url: &str) -> AppResult<String> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| AppError::Knowledge(format!("Request failed: {}", e)))?;

    if !response.status().is_success() {
        return Err(AppError::Knowledge(format!(
            "HTTP {} from {}",
            response.status(),
            url
        )));
    }

    let html = response
        .text()
        .await
        .map_err(|e| AppError::Knowledge(format!("Failed to read body: {}", e)))?;

    extract_page_text(&html)
}

/// Visible text of an HTML page, one line per text node, scripts and styles dropped.
pub fn extract_page_text(html: &str) -> AppResult<String> {
    let document = scraper::Html::parse_document(html);
    let body_selector = scraper::Selector::parse("body")
        .map_err(|e| AppError::Knowledge(format!("Invalid selector: {:?}", e)))?;

    let Some(body) = document.select(&body_selector).next() else {
        return Ok(String::new());
    };

    let mut lines = Vec::new();
    for node in body.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node
            .parent()
            .and_then(|p| p.value().as_element())
            .map(|el| matches!(el.name(), "script" | "style" | "noscript"))
            .unwrap_or(false);
        let trimmed = text.trim();
        if !hidden && !trimmed.is_empty() {
            lines.push(trimmed.to_string());
        }
    }

    Ok(lines.join("\n"))
}

/// Strip NULs and surrounding whitespace; drop units left empty.
fn unit_from(text: String, metadata: UnitMetadata) -> Option<DocumentUnit> {
    let cleaned = sanitize(&text);
    if cleaned.is_empty() {
        None
    } else {
        Some(DocumentUnit::new(cleaned, metadata))
    }
}

fn sanitize(text: &str) -> String {
    text.replace('\0', "").trim().to_string()
}

/// Absolute path with `/` as the only separator.
pub fn normalize_source(path: &Path) -> String {
    let absolute = path
        .canonicalize()
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf());
    absolute.to_string_lossy().replace('\\', "/")
}
