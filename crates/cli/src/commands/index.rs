//! Index command handler.
//!
//! Builds the document index (or loads the persisted one) and reports its size.

use clap::Args;
use docscout_core::{config::AppConfig, AppError, AppResult};
use docscout_knowledge::{build_index, clear_index, Services};

/// Build or load the document index
#[derive(Args, Debug)]
pub struct IndexCommand {
    /// Discard the persisted index and embed every document again
    #[arg(long)]
    pub rebuild: bool,

    /// Extra web page to index (repeatable)
    #[arg(long)]
    pub url: Vec<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IndexCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing index command");

        if self.rebuild {
            clear_index(config)?;
        }

        let mut urls = config.web_sources();
        urls.extend(self.url.iter().cloned());

        let services = Services::from_config(config.clone())?;
        let index = build_index(&services, &config.data_dir(), &urls).await?;
        let stats = index.stats();

        if self.json {
            let json = serde_json::to_string_pretty(stats)
                .map_err(|e| AppError::Serialization(e.to_string()))?;
            println!("{}", json);
            return Ok(());
        }

        println!("Documents root: {}", config.data_dir().display());
        println!("Sources:        {}", stats.sources);
        println!("Chunks:         {}", stats.chunks);
        println!(
            "Search:         {}",
            if stats.semantic_available {
                "semantic + keyword"
            } else {
                "keyword only"
            }
        );
        println!("Origin:         {:?}", stats.origin);

        for warning in &stats.warnings {
            println!("Warning: {}", warning);
        }

        Ok(())
    }
}
