//! LLM provider factory.
//!
//! The process builds one client at startup and injects it into every
//! component that talks to a model.

use crate::client::LlmClient;
use crate::providers::{MockClient, OllamaClient, OpenAiClient};
use crate::types::ProviderType;
use std::sync::Arc;

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("ollama", "openai", "mock")
/// * `endpoint` - Optional custom endpoint URL
/// * `api_key` - Optional API key (for providers that require it)
///
/// # Errors
/// Returns error if the provider is unknown or a required secret is missing.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
) -> Result<Arc<dyn LlmClient>, String> {
    let provider_type =
        ProviderType::parse(provider).ok_or_else(|| format!("Unknown provider: {}", provider))?;
    let base_url = endpoint.or(provider_type.default_endpoint());

    match (provider_type, base_url) {
        (ProviderType::Ollama, Some(url)) => Ok(Arc::new(OllamaClient::with_base_url(url))),
        (ProviderType::OpenAI, Some(url)) => {
            let key = api_key.ok_or_else(|| "OpenAI provider requires API key".to_string())?;
            Ok(Arc::new(OpenAiClient::new(url, key)))
        }
        (ProviderType::Mock, _) => Ok(Arc::new(MockClient::echo())),
        (other, None) => Err(format!("No endpoint for provider: {}", other.as_str())),
    }
}
