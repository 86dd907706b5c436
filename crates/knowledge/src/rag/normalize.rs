//! Turns a loosely shaped model response into a [`StructuredAnswer`].
//!
//! Answer text and citations are each pulled out by a short ordered list of
//! extractors; the first one that finds something wins and none of them fail.

use crate::types::{
    is_url, Citation, Mode, StructuredAnswer, INQUIRY_NO_MATCH_ANSWER, NO_DOC_MATCH_ANSWER,
    NO_DOC_MATCH_MESSAGE,
};
use serde_json::{Map, Value};

/// Shown when no extractor finds any answer text.
pub const NO_ANSWER_TEXT: &str = "(No answer text could be extracted.)";

const ANSWER_KEYS: &[&str] = &["answer", "result", "output_text", "text", "content"];
const SOURCE_KEYS: &[&str] = &["source", "file_path", "path"];

type AnswerExtractor = fn(&Value) -> Option<String>;
type CitationExtractor = fn(&Value) -> Option<Vec<(String, Option<u32>)>>;

const ANSWER_EXTRACTORS: &[AnswerExtractor] = &[bare_string, keyed_answer];
const CITATION_EXTRACTORS: &[CitationExtractor] = &[from_context, from_source_documents, from_sources];

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn bare_string(raw: &Value) -> Option<String> {
    raw.as_str().and_then(non_empty)
}

fn keyed_answer(raw: &Value) -> Option<String> {
    let object = raw.as_object()?;
    ANSWER_KEYS
        .iter()
        .find_map(|key| object.get(*key).and_then(Value::as_str).and_then(non_empty))
}

fn from_context(raw: &Value) -> Option<Vec<(String, Option<u32>)>> {
    documents_under(raw, "context")
}

fn from_source_documents(raw: &Value) -> Option<Vec<(String, Option<u32>)>> {
    documents_under(raw, "source_documents")
}

fn from_sources(raw: &Value) -> Option<Vec<(String, Option<u32>)>> {
    documents_under(raw, "sources")
}

/// Citations from a list of documents, metadata objects or plain strings.
fn documents_under(raw: &Value, key: &str) -> Option<Vec<(String, Option<u32>)>> {
    let items = raw.as_object()?.get(key)?.as_array()?;
    let citations: Vec<_> = items.iter().filter_map(citation_from_item).collect();
    (!citations.is_empty()).then_some(citations)
}

fn citation_from_item(item: &Value) -> Option<(String, Option<u32>)> {
    match item {
        Value::String(source) => non_empty(source).map(|s| (s, None)),
        Value::Object(object) => {
            let metadata = object
                .get("metadata")
                .and_then(Value::as_object)
                .unwrap_or(object);
            Some((source_of(metadata)?, page_of(metadata)))
        }
        _ => None,
    }
}

fn source_of(metadata: &Map<String, Value>) -> Option<String> {
    SOURCE_KEYS
        .iter()
        .find_map(|key| metadata.get(*key).and_then(Value::as_str).and_then(non_empty))
}

fn page_of(metadata: &Map<String, Value>) -> Option<u32> {
    match metadata.get("page")? {
        Value::Number(n) => n.as_u64().and_then(|p| u32::try_from(p).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Builds display labels relative to the document root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseNormalizer {
    root_name: String,
}

impl Default for ResponseNormalizer {
    fn default() -> Self {
        Self::new("data")
    }
}

impl ResponseNormalizer {
    /// `root_name` is the final component of the document root, e.g. `data`.
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            root_name: root_name.into(),
        }
    }

    /// `./<root>/...` from the last path segment equal to the root name.
    ///
    /// URLs and paths outside the root are returned as given.
    pub fn display_source(&self, source: &str) -> String {
        if is_url(source) {
            return source.to_string();
        }

        let normalized = source.replace('\\', "/");
        let segments: Vec<&str> = normalized.split('/').collect();
        match segments.iter().rposition(|s| *s == self.root_name) {
            Some(i) => format!("./{}", segments[i..].join("/")),
            None => normalized,
        }
    }

    /// Display label, with a 1-based page suffix for PDFs.
    pub fn label(&self, source: &str, page: Option<u32>) -> String {
        let path = self.display_source(source);
        match page {
            Some(page) if source.to_lowercase().ends_with(".pdf") => {
                format!("{} (page {})", path, page + 1)
            }
            _ => path,
        }
    }

    pub fn normalize(&self, raw: &Value, mode: Mode) -> StructuredAnswer {
        let answer_text = ANSWER_EXTRACTORS
            .iter()
            .find_map(|extract| extract(raw))
            .unwrap_or_else(|| NO_ANSWER_TEXT.to_string());

        let found = CITATION_EXTRACTORS
            .iter()
            .find_map(|extract| extract(raw))
            .unwrap_or_default();

        let mut citations: Vec<Citation> = Vec::new();
        for (source, page) in found {
            if citations.iter().any(|c| c.source == source) {
                continue;
            }
            citations.push(Citation {
                label: self.label(&source, page),
                source,
                page,
            });
        }

        let sentinel = answer_text == NO_DOC_MATCH_ANSWER || answer_text == INQUIRY_NO_MATCH_ANSWER;
        let suppress_citations = sentinel || citations.is_empty();

        let answer_text = if suppress_citations && mode == Mode::DocumentSearch {
            NO_DOC_MATCH_MESSAGE.to_string()
        } else {
            answer_text
        };

        let mut citations = citations.into_iter();
        StructuredAnswer {
            mode,
            answer_text,
            primary_citation: citations.next(),
            secondary_citations: citations.collect(),
            suppress_citations,
        }
    }
}

/// Normalize with the default `data` root.
pub fn normalize(raw: &Value, mode: Mode) -> StructuredAnswer {
    ResponseNormalizer::default().normalize(raw, mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_context_citations_deduplicated_first_page_wins() {
        let raw = json!({
            "answer": "See the handbook.",
            "context": [
                {"page_content": "a", "metadata": {"source": "/srv/app/data/hr/handbook.pdf", "page": 2}},
                {"page_content": "b", "metadata": {"source": "/srv/app/data/hr/handbook.pdf", "page": 7}},
                {"page_content": "c", "metadata": {"source": "/srv/app/data/staff.csv", "is_merged": true}},
                {"page_content": "d", "metadata": {"source": "https://intra.example.com/faq"}}
            ]
        });

        let answer = normalize(&raw, Mode::DocumentSearch);
        assert_eq!(answer.answer_text, "See the handbook.");
        assert!(!answer.suppress_citations);

        let primary = answer.primary_citation.clone().unwrap();
        assert_eq!(primary.page, Some(2));
        assert_eq!(primary.label, "./data/hr/handbook.pdf (page 3)");

        let labels: Vec<_> = answer.secondary_citations.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["./data/staff.csv", "https://intra.example.com/faq"]);
    }

    #[test]
    fn test_alternate_keys() {
        let raw = json!({
            "result": "",
            "output_text": "Use form B.",
            "source_documents": [{"metadata": {"file_path": "C:\\share\\data\\forms\\b.docx"}}]
        });
        let answer = normalize(&raw, Mode::Inquiry);
        assert_eq!(answer.answer_text, "Use form B.");
        assert_eq!(answer.primary_citation.unwrap().label, "./data/forms/b.docx");
    }

    #[test]
    fn test_string_sources() {
        let raw = json!({"text": "Yes.", "sources": ["/x/data/a.txt", "/x/data/a.txt", "/x/data/b.pdf"]});
        let answer = normalize(&raw, Mode::Inquiry);
        assert_eq!(answer.citations().count(), 2);
        assert_eq!(answer.secondary_citations[0].label, "./data/b.pdf");
    }

    #[test]
    fn test_bare_string_has_no_citations() {
        let answer = normalize(&json!("Just text"), Mode::Inquiry);
        assert_eq!(answer.answer_text, "Just text");
        assert!(answer.suppress_citations);
        assert!(answer.primary_citation.is_none());
    }

    #[test]
    fn test_sentinel_suppresses_and_document_search_rewrites() {
        let raw = json!({
            "answer": NO_DOC_MATCH_ANSWER,
            "context": [{"metadata": {"source": "/data/a.txt"}}]
        });

        let search = normalize(&raw, Mode::DocumentSearch);
        assert!(search.suppress_citations);
        assert_eq!(search.answer_text, NO_DOC_MATCH_MESSAGE);

        let inquiry = normalize(
            &json!({"answer": INQUIRY_NO_MATCH_ANSWER, "context": [{"metadata": {"source": "/data/a.txt"}}]}),
            Mode::Inquiry,
        );
        assert!(inquiry.suppress_citations);
        assert_eq!(inquiry.answer_text, INQUIRY_NO_MATCH_ANSWER);
    }

    #[test]
    fn test_unrecognised_shape() {
        let answer = normalize(&json!({"weird": 1, "context": "nope"}), Mode::Inquiry);
        assert_eq!(answer.answer_text, NO_ANSWER_TEXT);
        assert!(answer.suppress_citations);
    }

    #[test]
    fn test_page_only_for_pdf() {
        let normalizer = ResponseNormalizer::new("docs");
        assert_eq!(normalizer.label("/srv/docs/a.PDF", Some(0)), "./docs/a.PDF (page 1)");
        assert_eq!(normalizer.label("/srv/docs/a.docx", Some(4)), "./docs/a.docx");
        assert_eq!(normalizer.label("/elsewhere/a.txt", None), "/elsewhere/a.txt");
        assert_eq!(normalizer.label("/srv/docs/old/docs/a.txt", None), "./docs/a.txt");
    }

    #[test]
    fn test_page_as_string() {
        let raw = json!({"answer": "ok", "context": [{"metadata": {"source": "/d/data/x.pdf", "page": "4"}}]});
        assert_eq!(normalize(&raw, Mode::Inquiry).primary_citation.unwrap().page, Some(4));
    }
}
