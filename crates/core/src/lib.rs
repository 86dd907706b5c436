//! Docscout Core Library
//!
//! Foundational pieces shared by every docscout crate:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Layered configuration (`AppConfig`, `RetrievalConfig`, `RetryConfig`)

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{AppConfig, RetrievalConfig, RetryConfig};
pub use error::{AppError, AppResult};
