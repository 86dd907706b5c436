//! Language-model integration for docscout.
//!
//! A provider-agnostic `LlmClient` trait with Ollama, OpenAI-compatible and
//! in-process mock implementations, plus a bounded retry helper.
//!
//! # Example
//! ```no_run
//! use docscout_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new("Hello, world!", "llama3.2");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod retry;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{MockClient, OllamaClient, OpenAiClient};
pub use retry::{complete_with_retry, RetryPolicy};
pub use types::ProviderType;
