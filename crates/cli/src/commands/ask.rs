//! Ask command handler.
//!
//! Answers one question against the document index and exits.

use super::{open_pipeline, render_answer};
use clap::Args;
use docscout_core::{config::AppConfig, AppError, AppResult};
use docscout_knowledge::Mode;
use std::path::PathBuf;

/// Answer a single question
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: Option<String>,

    /// Read the question from a file
    #[arg(short, long, conflicts_with = "question")]
    pub file: Option<PathBuf>,

    /// Starting mode (document_search or inquiry); routing may override it
    #[arg(long)]
    pub mode: Option<Mode>,

    /// Output the structured answer as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        let question = self.question_text()?;
        let pipeline = open_pipeline(config).await?;
        let answer = pipeline.answer(&question, &[], self.mode).await?;

        if self.json {
            let json = serde_json::to_string_pretty(&answer)
                .map_err(|e| AppError::Serialization(e.to_string()))?;
            println!("{}", json);
        } else {
            println!("{}", render_answer(&answer));
        }

        Ok(())
    }

    fn question_text(&self) -> AppResult<String> {
        let text = match (&self.question, &self.file) {
            (Some(question), _) => question.clone(),
            (None, Some(path)) => std::fs::read_to_string(path).map_err(|e| {
                AppError::Config(format!("Failed to read question file {:?}: {}", path, e))
            })?,
            (None, None) => String::new(),
        };

        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(AppError::Config("No question provided".to_string()));
        }
        Ok(text)
    }
}
