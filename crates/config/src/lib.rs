//! Configuration loading, validation, and management for Sibyl.
//!
//! Loads configuration from `~/.sibyl/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.sibyl/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Upstream LLM endpoint
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Web-search backend
    #[serde(default)]
    pub search: SearchConfig,

    /// Knowledge-base (vector index) retrieval
    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    /// HTTP gateway
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Conversation history
    #[serde(default)]
    pub history: HistoryConfig,
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("upstream", &self.upstream)
            .field("search", &self.search)
            .field("knowledge", &self.knowledge)
            .field("gateway", &self.gateway)
            .field("history", &self.history)
            .finish()
    }
}

/// The upstream chat-completions endpoint.
#[derive(Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL (the client appends `/chat/completions`)
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// API key, sent as a bearer token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model name
    #[serde(default = "default_model")]
    pub model: String,
}

fn default_api_url() -> String {
    "https://api.deepseek.com/v1".into()
}
fn default_model() -> String {
    "deepseek-reasoner".into()
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key: None,
            model: default_model(),
        }
    }
}

impl std::fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .finish()
    }
}

/// Web-search backend selection.
#[derive(Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Backend kind: "searxng" (keyword engine) or "tavily" (AI search)
    #[serde(default = "default_search_backend")]
    pub backend: String,

    /// Base URL of the backend instance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// API key (tavily only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Number of results folded into the context block
    #[serde(default = "default_search_results")]
    pub results: usize,
}

fn default_search_backend() -> String {
    "searxng".into()
}
fn default_search_results() -> usize {
    3
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            backend: default_search_backend(),
            base_url: None,
            api_key: None,
            results: default_search_results(),
        }
    }
}

impl std::fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchConfig")
            .field("backend", &self.backend)
            .field("base_url", &self.base_url)
            .field("api_key", &redact(&self.api_key))
            .field("results", &self.results)
            .finish()
    }
}

/// Knowledge-base retrieval: an embedding service plus an Elasticsearch
/// kNN index with a keyword match filter.
#[derive(Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// Enable the vector-retrieval collaborator
    #[serde(default)]
    pub enabled: bool,

    /// Embedding service endpoint (`GET {url}?msg=...`)
    #[serde(default = "default_embedding_url")]
    pub embedding_url: String,

    /// Elasticsearch base URL
    #[serde(default = "default_elastic_url")]
    pub elastic_url: String,

    /// Index name
    #[serde(default = "default_index")]
    pub index: String,

    /// Field holding passage text
    #[serde(default = "default_content_field")]
    pub content_field: String,

    /// Field holding the passage embedding
    #[serde(default = "default_vector_field")]
    pub vector_field: String,

    /// `_source` fields prepended to each passage, in order
    #[serde(default = "default_metadata_fields")]
    pub metadata_fields: Vec<String>,

    /// Keyword-filter strictness: minimum share of query words that must match
    #[serde(default = "default_min_should_match")]
    pub min_should_match_pct: u8,

    /// Keyword-filter operator ("and" / "or")
    #[serde(default = "default_operator")]
    pub operator: String,

    /// kNN candidate pool size
    #[serde(default = "default_num_candidates")]
    pub num_candidates: u32,

    /// Basic-auth username for Elasticsearch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Basic-auth password for Elasticsearch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

fn default_embedding_url() -> String {
    "http://localhost:5001/msg_to_vector".into()
}
fn default_elastic_url() -> String {
    "http://localhost:9200".into()
}
fn default_index() -> String {
    "knowledge_index".into()
}
fn default_content_field() -> String {
    "content".into()
}
fn default_vector_field() -> String {
    "content_vector".into()
}
fn default_metadata_fields() -> Vec<String> {
    vec!["doc_name".into(), "chapter".into(), "item_number".into()]
}
fn default_min_should_match() -> u8 {
    45
}
fn default_operator() -> String {
    "and".into()
}
fn default_num_candidates() -> u32 {
    50
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            embedding_url: default_embedding_url(),
            elastic_url: default_elastic_url(),
            index: default_index(),
            content_field: default_content_field(),
            vector_field: default_vector_field(),
            metadata_fields: default_metadata_fields(),
            min_should_match_pct: default_min_should_match(),
            operator: default_operator(),
            num_candidates: default_num_candidates(),
            username: None,
            password: None,
        }
    }
}

impl std::fmt::Debug for KnowledgeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeConfig")
            .field("enabled", &self.enabled)
            .field("embedding_url", &self.embedding_url)
            .field("elastic_url", &self.elastic_url)
            .field("index", &self.index)
            .field("username", &self.username)
            .field("password", &redact(&self.password))
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    8080
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// The store never holds more than `2 * max_pairs` turns
    #[serde(default = "default_max_pairs")]
    pub max_pairs: usize,
}

fn default_max_pairs() -> usize {
    10
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_pairs: default_max_pairs(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (`~/.sibyl/config.toml`).
    ///
    /// Also checks environment variables:
    /// - `SIBYL_API_KEY` / `DEEPSEEK_API_KEY` — upstream API key
    /// - `SIBYL_MODEL` — upstream model override
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if config.upstream.api_key.is_none() {
            config.upstream.api_key = std::env::var("SIBYL_API_KEY")
                .ok()
                .or_else(|| std::env::var("DEEPSEEK_API_KEY").ok());
        }

        if let Ok(model) = std::env::var("SIBYL_MODEL") {
            config.upstream.model = model;
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".sibyl")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history.max_pairs == 0 {
            return Err(ConfigError::ValidationError(
                "history.max_pairs must be at least 1".into(),
            ));
        }

        if !matches!(self.search.backend.as_str(), "searxng" | "tavily") {
            return Err(ConfigError::ValidationError(format!(
                "unknown search backend '{}' (expected \"searxng\" or \"tavily\")",
                self.search.backend
            )));
        }

        if self.knowledge.min_should_match_pct > 100 {
            return Err(ConfigError::ValidationError(
                "knowledge.min_should_match_pct must be between 0 and 100".into(),
            ));
        }

        if !matches!(self.knowledge.operator.as_str(), "and" | "or") {
            return Err(ConfigError::ValidationError(format!(
                "knowledge.operator must be \"and\" or \"or\", got '{}'",
                self.knowledge.operator
            )));
        }

        Ok(())
    }

    /// Check if an upstream API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.upstream.api_key.is_some()
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            upstream: UpstreamConfig::default(),
            search: SearchConfig::default(),
            knowledge: KnowledgeConfig::default(),
            gateway: GatewayConfig::default(),
            history: HistoryConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.gateway.port, 8080);
        assert_eq!(config.history.max_pairs, 10);
        assert_eq!(config.upstream.model, "deepseek-reasoner");
        assert!(!config.knowledge.enabled);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.upstream.api_url, config.upstream.api_url);
        assert_eq!(parsed.search.backend, config.search.backend);
        assert_eq!(parsed.history.max_pairs, config.history.max_pairs);
    }

    #[test]
    fn zero_max_pairs_rejected() {
        let config = AppConfig {
            history: HistoryConfig { max_pairs: 0 },
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_search_backend_rejected() {
        let mut config = AppConfig::default();
        config.search.backend = "duckduckgo".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn out_of_range_match_pct_rejected() {
        let mut config = AppConfig::default();
        config.knowledge.min_should_match_pct = 120;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        assert_eq!(result.unwrap().gateway.port, 8080);
    }

    #[test]
    fn partial_config_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[upstream]\nmodel = \"deepseek-chat\"\n\n[gateway]\nport = 9000\n",
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.upstream.model, "deepseek-chat");
        assert_eq!(config.gateway.port, 9000);
        // untouched sections keep defaults
        assert_eq!(config.search.results, 3);
        assert_eq!(config.knowledge.num_candidates, 50);
    }

    #[test]
    fn secrets_redacted_in_debug() {
        let mut config = AppConfig::default();
        config.upstream.api_key = Some("sk-very-secret".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-very-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("searxng"));
        assert!(toml_str.contains("8080"));
    }
}
