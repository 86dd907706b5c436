//! Prompt loader: built-in definitions with workspace overrides.
//!
//! A file `.docscout/prompts/<id>.yml` in the workspace replaces the built-in
//! definition with the same id.

use crate::builder::build_prompt;
use crate::types::{BuiltPrompt, PromptDefinition};
use docscout_core::{AppError, AppResult};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Rewrites a follow-up question into a standalone query.
pub const QUERY_REWRITE: &str = "query.rewrite";
/// Generates a hypothetical passage used as a retrieval query.
pub const RETRIEVAL_HYDE: &str = "retrieval.hyde";
/// Terse "which document has it" answer with a numbered source list.
pub const ANSWER_DOCUMENT_SEARCH: &str = "answer.document_search";
/// Structured, heading-based explanation.
pub const ANSWER_INQUIRY: &str = "answer.inquiry";

const BUILTIN: [(&str, &str); 4] = [
    (QUERY_REWRITE, include_str!("../prompts/query.rewrite.yml")),
    (RETRIEVAL_HYDE, include_str!("../prompts/retrieval.hyde.yml")),
    (
        ANSWER_DOCUMENT_SEARCH,
        include_str!("../prompts/answer.document_search.yml"),
    ),
    (ANSWER_INQUIRY, include_str!("../prompts/answer.inquiry.yml")),
];

/// Load a prompt definition by ID, preferring a workspace override.
///
/// # Example
/// ```no_run
/// use docscout_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("."), "answer.inquiry")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = workspace_path
        .join(".docscout/prompts")
        .join(format!("{}.yml", prompt_id));

    let (origin, contents) = if prompt_file.exists() {
        tracing::debug!("Loading prompt override from: {:?}", prompt_file);
        let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
            AppError::Prompt(format!(
                "Failed to read prompt file {:?}: {}",
                prompt_file, e
            ))
        })?;
        (prompt_file.display().to_string(), contents)
    } else {
        let builtin = BUILTIN
            .iter()
            .find(|(id, _)| *id == prompt_id)
            .map(|(_, yaml)| yaml.to_string())
            .ok_or_else(|| AppError::Prompt(format!("Unknown prompt: {}", prompt_id)))?;
        (format!("builtin:{}", prompt_id), builtin)
    };

    let definition: PromptDefinition = serde_yaml::from_str(&contents).map_err(|e| {
        AppError::Prompt(format!("Failed to parse prompt YAML {}: {}", origin, e))
    })?;

    validate_prompt(&definition)?;

    if definition.id != prompt_id {
        return Err(AppError::Prompt(format!(
            "Prompt {} declares id '{}', expected '{}'",
            origin, definition.id, prompt_id
        )));
    }

    Ok(definition)
}

fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.template.is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    Ok(())
}

/// The four prompts the answer pipeline needs, loaded once at startup.
#[derive(Debug, Clone)]
pub struct PromptLibrary {
    definitions: BTreeMap<String, PromptDefinition>,
}

impl PromptLibrary {
    /// Load every pipeline prompt, honouring workspace overrides.
    pub fn load(workspace_path: &Path) -> AppResult<Self> {
        let mut definitions = BTreeMap::new();
        for (id, _) in BUILTIN.iter() {
            definitions.insert(id.to_string(), load_prompt(workspace_path, id)?);
        }
        Ok(Self { definitions })
    }

    /// Built-in prompts only.
    pub fn builtin() -> AppResult<Self> {
        let mut definitions = BTreeMap::new();
        for (id, yaml) in BUILTIN.iter() {
            let definition: PromptDefinition = serde_yaml::from_str(yaml)?;
            validate_prompt(&definition)?;
            definitions.insert(id.to_string(), definition);
        }
        Ok(Self { definitions })
    }

    /// Render the prompt `id` with `variables`.
    pub fn render(&self, id: &str, variables: HashMap<String, String>) -> AppResult<BuiltPrompt> {
        let definition = self
            .definitions
            .get(id)
            .ok_or_else(|| AppError::Prompt(format!("Prompt not loaded: {}", id)))?;
        build_prompt(definition, variables)
    }
}
