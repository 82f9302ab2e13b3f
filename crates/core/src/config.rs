//! Configuration management for the filings chat.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - A `.env` file in the working directory (if present)
//! - Config file (`.filings/config.yaml`)
//! - Environment variables
//! - Command-line flags
//!
//! Configuration is read once at startup; a missing credential for the
//! selected provider is fatal for the whole session.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Chat providers the answer synthesizer can talk to.
pub const KNOWN_PROVIDERS: [&str; 2] = ["claude", "ollama"];

/// Embedding providers the index loader can query with.
pub const KNOWN_EMBEDDING_PROVIDERS: [&str; 2] = ["ollama", "mock"];

/// Default Claude model (the one the filings assistant was tuned against).
pub const DEFAULT_CLAUDE_MODEL: &str = "claude-sonnet-4-20250514";

/// Default local model served by Ollama.
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2";

/// Environment variable consulted for the Claude key when no config names one.
pub const DEFAULT_CLAUDE_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// Default bound on one embedding request, in seconds.
pub const DEFAULT_EMBEDDING_TIMEOUT_SECS: u64 = 30;

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .filings/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Storage root holding one subdirectory per named index
    pub indexes_dir: PathBuf,

    /// Chat provider ("claude" or "ollama")
    pub provider: String,

    /// Chat model identifier
    pub model: String,

    /// API key for the chat provider
    pub api_key: Option<String>,

    /// Embedding backend used to query the indexes
    pub embedding: EmbeddingSettings,

    /// Passages retrieved per index for each question
    pub top_k: usize,

    /// Upper bound on a single model call, in seconds
    pub request_timeout_secs: u64,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// LLM provider configurations
    pub llm: Option<LlmConfig>,
}

/// Embedding backend settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Upper bound on one embedding request, in seconds
    pub timeout_secs: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "nomic-embed-text".to_string(),
            dimensions: 768,
            endpoint: None,
            timeout_secs: DEFAULT_EMBEDDING_TIMEOUT_SECS,
        }
    }
}

/// LLM configuration from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    pub providers: HashMap<String, ProviderConfig>,
}

/// Provider-specific configuration, keyed by provider name in config.yaml.
///
/// Every field is optional. `apiKeyEnv` and `apiVersion` only apply to
/// Claude; the provider a block belongs to comes from its key, never from
/// which fields happen to be present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    pub model: Option<String>,
    pub endpoint: Option<String>,
    /// Environment variable holding the API key
    pub api_key_env: Option<String>,
    /// Value of the `anthropic-version` header
    pub api_version: Option<String>,
    /// Bound on one model call for this provider, in seconds
    #[serde(alias = "timeout")]
    pub timeout_secs: Option<u64>,
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmConfig>,
    embedding: Option<EmbeddingFileConfig>,
    retrieval: Option<RetrievalConfig>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EmbeddingFileConfig {
    provider: Option<String>,
    model: Option<String>,
    dimensions: Option<usize>,
    endpoint: Option<String>,
    #[serde(rename = "timeoutSecs")]
    timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RetrievalConfig {
    #[serde(rename = "indexesDir")]
    indexes_dir: Option<String>,
    #[serde(rename = "topK")]
    top_k: Option<usize>,
    #[serde(rename = "timeoutSecs")]
    timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let workspace = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            indexes_dir: workspace.join("indexes"),
            workspace,
            config_file: None,
            provider: "ollama".to_string(), // Local-first default
            model: DEFAULT_OLLAMA_MODEL.to_string(),
            api_key: None,
            embedding: EmbeddingSettings::default(),
            top_k: 5,
            request_timeout_secs: 120,
            log_level: None,
            verbose: false,
            no_color: false,
            llm: None,
        }
    }
}

/// Canonical provider name: lowercase, with `anthropic` meaning `claude`.
pub fn canonical_provider(name: &str) -> String {
    let name = name.trim().to_lowercase();
    match name.as_str() {
        "anthropic" => "claude".to_string(),
        _ => name,
    }
}

/// The model a provider falls back to when none is configured.
pub fn default_model_for(provider: &str) -> &'static str {
    match canonical_provider(provider).as_str() {
        "claude" => DEFAULT_CLAUDE_MODEL,
        _ => DEFAULT_OLLAMA_MODEL,
    }
}

impl AppConfig {
    /// Load configuration from `.env`, the YAML config file and environment variables.
    ///
    /// Environment variables:
    /// - `FILINGS_WORKSPACE`: Override workspace path
    /// - `FILINGS_CONFIG`: Path to config file
    /// - `FILINGS_INDEXES_DIR`: Storage root for indexes
    /// - `FILINGS_PROVIDER`: Chat provider
    /// - `FILINGS_MODEL`: Chat model identifier
    /// - `FILINGS_API_KEY`: API key for the chat provider
    /// - `FILINGS_TOP_K`: Passages per index
    /// - `FILINGS_TIMEOUT_SECS`: Model call timeout
    /// - `FILINGS_EMBEDDING_TIMEOUT_SECS`: Embedding request timeout
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use filings_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Indexes: {:?}", config.indexes_dir);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_with(None, None)
    }

    /// Like [`AppConfig::load`], with an explicit workspace and config file
    /// taking precedence over `FILINGS_WORKSPACE` and `FILINGS_CONFIG`.
    pub fn load_with(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        // A missing .env is fine; anything already in the environment wins.
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {:?}", path);
        }

        let mut config = Self::default();

        if let Some(workspace) = workspace
            .or_else(|| std::env::var("FILINGS_WORKSPACE").ok().map(PathBuf::from))
        {
            config.workspace = workspace;
            config.indexes_dir = config.workspace.join("indexes");
        }

        config.config_file =
            config_file.or_else(|| std::env::var("FILINGS_CONFIG").ok().map(PathBuf::from));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.workspace.join(".filings/config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(dir) = std::env::var("FILINGS_INDEXES_DIR") {
            config.indexes_dir = config.resolve_path(&dir);
        }

        if let Ok(provider) = std::env::var("FILINGS_PROVIDER") {
            config.set_provider(provider);
        }

        if let Ok(model) = std::env::var("FILINGS_MODEL") {
            config.model = model;
        }

        if let Ok(key) = std::env::var("FILINGS_API_KEY") {
            config.api_key = Some(key);
        }

        if let Ok(top_k) = std::env::var("FILINGS_TOP_K") {
            config.top_k = top_k.parse().map_err(|e| {
                AppError::Config(format!("Invalid FILINGS_TOP_K '{}': {}", top_k, e))
            })?;
        }

        if let Ok(timeout) = std::env::var("FILINGS_TIMEOUT_SECS") {
            config.request_timeout_secs = timeout.parse().map_err(|e| {
                AppError::Config(format!("Invalid FILINGS_TIMEOUT_SECS '{}': {}", timeout, e))
            })?;
        }

        if let Ok(timeout) = std::env::var("FILINGS_EMBEDDING_TIMEOUT_SECS") {
            config.embedding.timeout_secs = timeout.parse().map_err(|e| {
                AppError::Config(format!(
                    "Invalid FILINGS_EMBEDDING_TIMEOUT_SECS '{}': {}",
                    timeout, e
                ))
            })?;
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge YAML configuration file into this config.
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
                result.indexes_dir = result.workspace.join("indexes");
            }
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(retrieval) = config_file.retrieval {
            if let Some(dir) = retrieval.indexes_dir {
                result.indexes_dir = result.resolve_path(&dir);
            }
            if let Some(top_k) = retrieval.top_k {
                result.top_k = top_k;
            }
            if let Some(timeout) = retrieval.timeout_secs {
                result.request_timeout_secs = timeout;
            }
        }

        if let Some(embedding) = config_file.embedding {
            if let Some(provider) = embedding.provider {
                result.embedding.provider = provider;
            }
            if let Some(model) = embedding.model {
                result.embedding.model = model;
            }
            if let Some(dimensions) = embedding.dimensions {
                result.embedding.dimensions = dimensions;
            }
            if embedding.endpoint.is_some() {
                result.embedding.endpoint = embedding.endpoint;
            }
            if let Some(timeout) = embedding.timeout_secs {
                result.embedding.timeout_secs = timeout;
            }
        }

        if let Some(llm) = config_file.llm {
            let llm = LlmConfig {
                active_provider: canonical_provider(&llm.active_provider),
                providers: llm
                    .providers
                    .into_iter()
                    .map(|(name, pc)| (canonical_provider(&name), pc))
                    .collect(),
            };
            result.model = llm
                .providers
                .get(&llm.active_provider)
                .and_then(|pc| pc.model.clone())
                .unwrap_or_else(|| default_model_for(&llm.active_provider).to_string());
            result.provider = llm.active_provider.clone();
            result.llm = Some(llm);
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
        indexes_dir: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        top_k: Option<usize>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(dir) = indexes_dir {
            self.indexes_dir = dir;
        }

        if let Some(provider) = provider {
            self.set_provider(provider);
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(top_k) = top_k {
            self.top_k = top_k;
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

        self
    }

    /// Switch provider, picking up its configured (or default) model.
    fn set_provider(&mut self, provider: String) {
        let provider = canonical_provider(&provider);
        if provider == self.provider {
            return;
        }
        self.model = self
            .get_provider_config(&provider)
            .and_then(|pc| pc.model)
            .unwrap_or_else(|| default_model_for(&provider).to_string());
        self.provider = provider;
    }

    fn resolve_path(&self, raw: &str) -> PathBuf {
        let path = PathBuf::from(raw);
        if path.is_absolute() {
            path
        } else {
            self.workspace.join(path)
        }
    }

    /// Get the configuration block for a provider, if the config file has one.
    pub fn get_provider_config(&self, provider: &str) -> Option<ProviderConfig> {
        let provider = canonical_provider(provider);
        self.llm
            .as_ref()
            .and_then(|llm| llm.providers.get(&provider).cloned())
    }

    /// Endpoint override for the active provider.
    pub fn provider_endpoint(&self) -> Option<String> {
        self.get_provider_config(&self.provider)
            .and_then(|pc| pc.endpoint)
    }

    /// API version override for the active provider.
    pub fn provider_api_version(&self) -> Option<String> {
        self.get_provider_config(&self.provider)
            .and_then(|pc| pc.api_version)
    }

    /// Bound on one model call: the provider's own timeout, else the global one.
    pub fn model_timeout_secs(&self) -> u64 {
        self.get_provider_config(&self.provider)
            .and_then(|pc| pc.timeout_secs)
            .unwrap_or(self.request_timeout_secs)
    }

    /// Environment variable that holds the API key for a provider, if it needs one.
    pub fn api_key_env(&self, provider: &str) -> Option<String> {
        let configured = self
            .get_provider_config(provider)
            .and_then(|pc| pc.api_key_env);
        match configured {
            Some(var) => Some(var),
            None if canonical_provider(provider) == "claude" => {
                Some(DEFAULT_CLAUDE_KEY_ENV.to_string())
            }
            None => None,
        }
    }

    /// Resolve the API key for a provider from the environment.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        self.api_key_env(provider)
            .and_then(|var| std::env::var(&var).ok())
    }

    /// Validate configuration for the active provider.
    ///
    /// Called once at startup; any error here halts the session.
    pub fn validate(&self) -> AppResult<()> {
        if !KNOWN_PROVIDERS.contains(&self.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        if !KNOWN_EMBEDDING_PROVIDERS.contains(&self.embedding.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding.provider,
                KNOWN_EMBEDDING_PROVIDERS.join(", ")
            )));
        }

        if self.provider == "claude" && self.resolve_api_key("claude").is_none() {
            let env_var = self
                .api_key_env("claude")
                .unwrap_or_else(|| DEFAULT_CLAUDE_KEY_ENV.to_string());
            return Err(AppError::Config(format!(
                "API key not found in environment variable: {}",
                env_var
            )));
        }

        if self.top_k == 0 {
            return Err(AppError::Config("topK must be at least 1".to_string()));
        }

        if self.request_timeout_secs == 0 || self.model_timeout_secs() == 0 {
            return Err(AppError::Config(
                "timeoutSecs must be at least 1".to_string(),
            ));
        }

        if self.embedding.timeout_secs == 0 {
            return Err(AppError::Config(
                "embedding timeoutSecs must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
