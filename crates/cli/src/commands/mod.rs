//! Command handlers for the docscout CLI.
//!
//! Each subcommand lives in its own module; the helpers here are shared by
//! the commands that answer questions.

pub mod ask;
pub mod chat;
pub mod index;

pub use ask::AskCommand;
pub use chat::ChatCommand;
pub use index::IndexCommand;

use docscout_core::{config::AppConfig, AppResult};
use docscout_knowledge::{build_index, Pipeline, Services, StructuredAnswer};

/// Build services and the shared index for an answering command.
pub(crate) async fn open_pipeline(config: &AppConfig) -> AppResult<Pipeline> {
    let services = Services::from_config(config.clone())?;
    let index = build_index(&services, &config.data_dir(), &config.web_sources()).await?;

    for warning in &index.stats().warnings {
        tracing::warn!("{}", warning);
    }

    Ok(Pipeline::new(services, Some(index)))
}

/// Plain-text rendering: the answer, then its sources unless suppressed.
pub(crate) fn render_answer(answer: &StructuredAnswer) -> String {
    let mut out = answer.answer_text.clone();

    if answer.suppress_citations {
        return out;
    }

    let mut citations = answer.citations().peekable();
    if citations.peek().is_some() {
        out.push_str("\n\nSources:");
        for (i, citation) in citations.enumerate() {
            let marker = if i == 0 { "*" } else { "-" };
            out.push_str(&format!("\n  {} {}", marker, citation.label));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use docscout_knowledge::{Citation, Mode};

    fn citation(label: &str) -> Citation {
        Citation {
            source: format!("/srv{}", label.trim_start_matches('.')),
            page: None,
            label: label.to_string(),
        }
    }

    #[test]
    fn test_render_lists_primary_first() {
        let answer = StructuredAnswer {
            mode: Mode::DocumentSearch,
            answer_text: "It is in the staff list.".to_string(),
            primary_citation: Some(citation("./data/staff.csv")),
            secondary_citations: vec![citation("./data/hr/policy.txt")],
            suppress_citations: false,
        };

        assert_eq!(
            render_answer(&answer),
            "It is in the staff list.\n\nSources:\n  * ./data/staff.csv\n  - ./data/hr/policy.txt"
        );
    }

    #[test]
    fn test_render_hides_suppressed_sources() {
        let mut answer = StructuredAnswer::no_documents(Mode::DocumentSearch);
        answer.primary_citation = Some(citation("./data/a.txt"));

        assert_eq!(render_answer(&answer), answer.answer_text);
    }
}
