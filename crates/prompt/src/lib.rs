//! Prompt system for docscout.
//!
//! - YAML prompt definitions (built in, overridable per workspace)
//! - Handlebars rendering of system and user templates

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use loader::{
    load_prompt, PromptLibrary, ANSWER_DOCUMENT_SEARCH, ANSWER_INQUIRY,
    QUERY_REWRITE, RETRIEVAL_HYDE,
};
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptBehavior, PromptDefinition, PromptOutputSpec};
