//! Configuration management for docscout.
//!
//! Configuration is layered, later layers winning:
//! - Built-in defaults
//! - Config file (`.docscout/config.yaml` or `DOCSCOUT_CONFIG`)
//! - Environment variables (`DOCSCOUT_*`)
//! - Command-line flags (`with_overrides`)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Providers the language-model factory knows how to build.
pub const KNOWN_PROVIDERS: [&str; 3] = ["ollama", "openai", "mock"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .docscout/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Language-model provider ("ollama", "openai", "mock")
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Provider endpoint override
    pub endpoint: Option<String>,

    /// API key for the language-model provider
    pub api_key: Option<String>,

    /// Embedding service settings
    pub embedding: EmbeddingConfig,

    /// Loader, chunker and retrieval settings
    pub retrieval: RetrievalConfig,

    /// Retry policy for the answer call
    pub retry: RetryConfig,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Emit logs as JSON
    pub json_logs: bool,
}

/// Embedding service configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct EmbeddingConfig {
    /// Provider name: "mock", "ollama", "openai"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Endpoint override for remote providers
    pub endpoint: Option<String>,

    /// Maximum number of texts per embedding request
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "nomic-embed-text".to_string(),
            dimensions: 768,
            endpoint: None,
            batch_size: 64,
        }
    }
}

/// Loader, chunker and retrieval tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct RetrievalConfig {
    /// Document root, relative to the workspace unless absolute
    pub data_dir: PathBuf,

    /// Semantic index artifact directory, relative to the workspace unless absolute
    pub persist_dir: PathBuf,

    /// Target chunk size in characters for file-sourced text
    pub chunk_size: usize,

    /// Overlap in characters between neighbouring chunks
    pub chunk_overlap: usize,

    /// Target chunk size in characters for web-sourced text
    pub web_chunk_size: usize,

    /// Result count for the first semantic tier
    pub top_k: usize,

    /// Lower bound for the widened semantic tier's result count
    pub widened_k_floor: usize,

    /// Result count for the lexical tier (defaults to max(5, top_k))
    pub lexical_top_k: Option<usize>,

    /// Minimum cosine similarity for a semantic hit. A tuning knob; set it to
    /// 0.0 to accept every nearest neighbour.
    pub min_relevance: f32,

    /// Folder/category names recognised in queries for re-ranking
    pub folder_keywords: Vec<String>,

    /// Fixed list of web pages to index
    pub urls: Vec<String>,

    /// Whether the fixed URL list is fetched at index time
    pub enable_web: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            persist_dir: PathBuf::from(".docscout/index"),
            chunk_size: 500,
            chunk_overlap: 50,
            web_chunk_size: 2000,
            top_k: 5,
            widened_k_floor: 8,
            lexical_top_k: None,
            min_relevance: 0.20,
            folder_keywords: [
                "customer",
                "sales",
                "marketing",
                "education",
                "hr",
                "general affairs",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            urls: Vec::new(),
            enable_web: false,
        }
    }
}

impl RetrievalConfig {
    /// Result count used by the lexical tier.
    pub fn effective_lexical_top_k(&self) -> usize {
        self.lexical_top_k.unwrap_or_else(|| self.top_k.max(5))
    }

    /// Result count used by the widened semantic tier.
    pub fn widened_k(&self) -> usize {
        self.widened_k_floor.max(self.top_k * 2)
    }
}

/// Bounded exponential backoff for the answer call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 1000,
            max_backoff_ms: 8000,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmSection>,
    embedding: Option<EmbeddingConfig>,
    retrieval: Option<RetrievalConfig>,
    retry: Option<RetryConfig>,
    workspace: Option<WorkspaceSection>,
    logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LlmSection {
    provider: Option<String>,
    model: Option<String>,
    endpoint: Option<String>,
    api_key_env: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceSection {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    color: Option<bool>,
    json: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "ollama".to_string(),
            model: "llama3.2".to_string(),
            endpoint: None,
            api_key: None,
            embedding: EmbeddingConfig::default(),
            retrieval: RetrievalConfig::default(),
            retry: RetryConfig::default(),
            log_level: None,
            verbose: false,
            no_color: false,
            json_logs: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the config file and environment variables.
    ///
    /// Environment variables:
    /// - `DOCSCOUT_WORKSPACE`: Override workspace path
    /// - `DOCSCOUT_CONFIG`: Path to config file
    /// - `DOCSCOUT_PROVIDER` / `DOCSCOUT_MODEL` / `DOCSCOUT_ENDPOINT`
    /// - `DOCSCOUT_EMBEDDING_PROVIDER` / `DOCSCOUT_EMBEDDING_MODEL`
    /// - `DOCSCOUT_API_KEY` (falls back to `OPENAI_API_KEY` for the openai provider)
    /// - `DOCSCOUT_DATA_DIR` / `DOCSCOUT_PERSIST_DIR`
    /// - `DOCSCOUT_ENABLE_WEB`: "1" or "true" to fetch configured URLs
    /// - `RUST_LOG`, `NO_COLOR`
    pub fn load() -> AppResult<Self> {
        Self::load_from(None, None)
    }

    /// Like [`AppConfig::load`], but an explicit workspace or config file
    /// (from `--workspace` / `--config`) wins over the environment and decides
    /// which YAML file is read.
    pub fn load_from(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) =
            workspace.or_else(|| std::env::var("DOCSCOUT_WORKSPACE").ok().map(PathBuf::from))
        {
            config.workspace = workspace;
        }

        config.config_file =
            config_file.or_else(|| std::env::var("DOCSCOUT_CONFIG").ok().map(PathBuf::from));

        if let Some(path) = &config.config_file {
            if !path.exists() {
                return Err(AppError::Config(format!("Config file not found: {:?}", path)));
            }
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.docscout_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        config.apply_env();

        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(provider) = std::env::var("DOCSCOUT_PROVIDER") {
            self.provider = provider;
        }

        if let Ok(model) = std::env::var("DOCSCOUT_MODEL") {
            self.model = model;
        }

        if let Ok(endpoint) = std::env::var("DOCSCOUT_ENDPOINT") {
            self.endpoint = Some(endpoint);
        }

        if let Ok(provider) = std::env::var("DOCSCOUT_EMBEDDING_PROVIDER") {
            self.embedding.provider = provider;
        }

        if let Ok(model) = std::env::var("DOCSCOUT_EMBEDDING_MODEL") {
            self.embedding.model = model;
        }

        if let Ok(key) = std::env::var("DOCSCOUT_API_KEY") {
            self.api_key = Some(key);
        } else if self.api_key.is_none()
            && (self.provider == "openai" || self.embedding.provider == "openai")
        {
            self.api_key = std::env::var("OPENAI_API_KEY").ok();
        }

        if let Ok(dir) = std::env::var("DOCSCOUT_DATA_DIR") {
            self.retrieval.data_dir = PathBuf::from(dir);
        }

        if let Ok(dir) = std::env::var("DOCSCOUT_PERSIST_DIR") {
            self.retrieval.persist_dir = PathBuf::from(dir);
        }

        if let Ok(flag) = std::env::var("DOCSCOUT_ENABLE_WEB") {
            self.retrieval.enable_web = matches!(flag.as_str(), "1" | "true" | "yes");
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            self.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            self.no_color = true;
        }
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(ws) = config_file.workspace {
            if let Some(path) = ws.path {
                result.workspace = PathBuf::from(path);
            }
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
            if let Some(json) = logging.json {
                result.json_logs = json;
            }
        }

        if let Some(llm) = config_file.llm {
            if let Some(provider) = llm.provider {
                result.provider = provider;
            }
            if let Some(model) = llm.model {
                result.model = model;
            }
            if llm.endpoint.is_some() {
                result.endpoint = llm.endpoint;
            }
            if let Some(env_var) = llm.api_key_env {
                if let Ok(key) = std::env::var(&env_var) {
                    result.api_key = Some(key);
                }
            }
        }

        if let Some(embedding) = config_file.embedding {
            result.embedding = embedding;
        }

        if let Some(retrieval) = config_file.retrieval {
            result.retrieval = retrieval;
        }

        if let Some(retry) = config_file.retry {
            result.retry = retry;
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the config file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
        json_logs: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        if json_logs {
            self.json_logs = true;
        }

        self
    }

    /// Path to the .docscout directory.
    pub fn docscout_dir(&self) -> PathBuf {
        self.workspace.join(".docscout")
    }

    /// Resolved document root.
    pub fn data_dir(&self) -> PathBuf {
        self.resolve(&self.retrieval.data_dir)
    }

    /// Resolved semantic index artifact directory.
    pub fn persist_dir(&self) -> PathBuf {
        self.resolve(&self.retrieval.persist_dir)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace.join(path)
        }
    }

    /// URLs to index, honouring the web toggle.
    pub fn web_sources(&self) -> Vec<String> {
        if self.retrieval.enable_web {
            self.retrieval.urls.clone()
        } else {
            Vec::new()
        }
    }

    /// Validate the configuration before any service is built.
    pub fn validate(&self) -> AppResult<()> {
        if !KNOWN_PROVIDERS.contains(&self.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        if self.provider == "openai" && self.api_key.is_none() {
            return Err(AppError::Config(
                "The openai provider needs DOCSCOUT_API_KEY or OPENAI_API_KEY".to_string(),
            ));
        }

        if self.embedding.dimensions == 0 {
            return Err(AppError::Config(
                "embedding.dimensions must be positive".to_string(),
            ));
        }

        let r = &self.retrieval;
        if r.chunk_size == 0 || r.web_chunk_size == 0 {
            return Err(AppError::Config("Chunk sizes must be positive".to_string()));
        }
        if r.chunk_overlap >= r.chunk_size {
            return Err(AppError::Config(format!(
                "Chunk overlap ({}) must be smaller than chunk size ({})",
                r.chunk_overlap, r.chunk_size
            )));
        }
        if r.top_k == 0 {
            return Err(AppError::Config("top_k must be positive".to_string()));
        }
        if self.retry.max_attempts == 0 {
            return Err(AppError::Config(
                "retry.maxAttempts must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
