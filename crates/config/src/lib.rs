//! Configuration loading, validation, and management for Stepwise.
//!
//! Loads configuration from `~/.stepwise/config.toml` with environment
//! variable overrides. Validates all settings before anything runs.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
///
/// Maps directly to `~/.stepwise/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the LLM backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of an OpenAI-compatible endpoint
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Default LLM provider name
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Which agent policy the CLI drives
    #[serde(default)]
    pub agent: AgentKind,

    /// Tools made available to the agent, by name
    #[serde(default = "default_tools")]
    pub tools: Vec<String>,

    /// Execution loop limits and recovery behavior
    #[serde(default)]
    pub executor: ExecutorConfig,

    /// Conversation memory configuration
    #[serde(default)]
    pub memory: MemoryConfig,

    /// SerpAPI settings for the `web_search` tool
    #[serde(default)]
    pub web_search: WebSearchConfig,

    /// Database behind the `sql_database` tool
    #[serde(default)]
    pub sql_database: SqlDatabaseConfig,
}

fn default_api_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_provider() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.0
}
fn default_tools() -> Vec<String> {
    vec!["calculator".into(), "web_search".into()]
}
fn default_true() -> bool {
    true
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
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("agent", &self.agent)
            .field("tools", &self.tools)
            .field("executor", &self.executor)
            .field("memory", &self.memory)
            .field("web_search", &self.web_search)
            .field("sql_database", &self.sql_database)
            .finish()
    }
}

/// Which decision policy to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    /// Zero-shot ReAct over an LLM (default)
    #[default]
    ZeroShot,
    /// ReAct with conversation history
    Conversational,
    /// Offline keyword rules, no LLM needed
    RuleBased,
}

/// How to end a loop that ran out of budget.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EarlyStoppingConfig {
    /// Fail with a "not finished" error
    #[default]
    Raise,
    /// Return a fixed "stopped" message
    Force,
    /// Return the last observation
    LastObservation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Maximum plan iterations per call (0 = unbounded)
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Wall-clock budget per call in seconds (0 = unbounded)
    #[serde(default)]
    pub max_execution_time_secs: u64,

    /// Feed unparseable agent output back as an observation
    #[serde(default = "default_true")]
    pub handle_parsing_errors: bool,

    #[serde(default)]
    pub early_stopping: EarlyStoppingConfig,
}

fn default_max_iterations() -> u32 {
    5
}

impl ExecutorConfig {
    pub fn max_execution_time(&self) -> Option<Duration> {
        (self.max_execution_time_secs > 0).then(|| Duration::from_secs(self.max_execution_time_secs))
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            max_execution_time_secs: 0,
            handle_parsing_errors: true,
            early_stopping: EarlyStoppingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Keep only the last N exchanges (0 = keep all)
    #[serde(default)]
    pub window: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window: 0,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct WebSearchConfig {
    /// SerpAPI key (falls back to `SERPAPI_API_KEY`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Organic results included in one observation
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

fn default_max_results() -> usize {
    3
}

impl std::fmt::Debug for WebSearchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSearchConfig")
            .field("api_key", &redact(&self.api_key))
            .field("max_results", &self.max_results)
            .finish()
    }
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            max_results: default_max_results(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqlDatabaseConfig {
    /// SQLite URL, e.g. `sqlite://data/shop.db` (falls back to `STEPWISE_DATABASE_URL`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Open the database read-only
    #[serde(default = "default_true")]
    pub read_only: bool,

    /// Rows shown per query result
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,
}

fn default_max_rows() -> usize {
    20
}

impl Default for SqlDatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            read_only: true,
            max_rows: default_max_rows(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.stepwise/config.toml).
    ///
    /// Also checks environment variables:
    /// - `STEPWISE_API_KEY` (highest priority), then `OPENAI_API_KEY`
    /// - `STEPWISE_API_URL`
    /// - `STEPWISE_MODEL`
    /// - `SERPAPI_API_KEY`, `STEPWISE_DATABASE_URL` for the tools
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::read_file(&config_path)?;

        if config.api_key.is_none() {
            config.api_key = std::env::var("STEPWISE_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if let Ok(url) = std::env::var("STEPWISE_API_URL") {
            config.api_url = url;
        }

        if let Ok(model) = std::env::var("STEPWISE_MODEL") {
            config.default_model = model;
        }

        if config.web_search.api_key.is_none() {
            config.web_search.api_key = std::env::var("SERPAPI_API_KEY").ok();
        }

        if config.sql_database.url.is_none() {
            config.sql_database.url = std::env::var("STEPWISE_DATABASE_URL").ok();
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::read_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse the file without validating; env overrides may still fill gaps.
    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".stepwise")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.agent != AgentKind::RuleBased && self.tools.is_empty() {
            return Err(ConfigError::ValidationError(
                "at least one tool must be enabled for ReAct agents".into(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for tool in &self.tools {
            if !seen.insert(tool.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "tool '{tool}' is listed more than once"
                )));
            }
        }

        if self.api_url.trim().is_empty() {
            return Err(ConfigError::ValidationError("api_url must not be empty".into()));
        }

        if self.web_search.max_results == 0 {
            return Err(ConfigError::ValidationError(
                "web_search.max_results must be at least 1".into(),
            ));
        }

        if self.tools.iter().any(|t| t == "sql_database") && self.sql_database.url.is_none() {
            return Err(ConfigError::ValidationError(
                "the sql_database tool needs [sql_database] url (or STEPWISE_DATABASE_URL)".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string (for the `config` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            agent: AgentKind::default(),
            tools: default_tools(),
            executor: ExecutorConfig::default(),
            memory: MemoryConfig::default(),
            web_search: WebSearchConfig::default(),
            sql_database: SqlDatabaseConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
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
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.executor.max_iterations, 5);
        assert!(config.executor.handle_parsing_errors);
        assert_eq!(config.executor.max_execution_time(), None);
        assert_eq!(config.agent, AgentKind::ZeroShot);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.default_model, config.default_model);
        assert_eq!(parsed.tools, config.tools);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            default_temperature: 5.0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn duplicate_tools_rejected() {
        let config = AppConfig {
            tools: vec!["calculator".into(), "calculator".into()],
            ..AppConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn rule_based_agent_may_run_without_tools() {
        let config = AppConfig {
            agent: AgentKind::RuleBased,
            tools: vec![],
            ..AppConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.default_provider, "openai");
    }

    #[test]
    fn executor_section_parsing() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
agent = "conversational"
tools = ["calculator"]

[executor]
max_iterations = 12
max_execution_time_secs = 30
handle_parsing_errors = false
early_stopping = "last_observation"

[memory]
window = 4
"#
        )
        .unwrap();

        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.agent, AgentKind::Conversational);
        assert_eq!(config.executor.max_iterations, 12);
        assert_eq!(
            config.executor.max_execution_time(),
            Some(Duration::from_secs(30))
        );
        assert!(!config.executor.handle_parsing_errors);
        assert_eq!(
            config.executor.early_stopping,
            EarlyStoppingConfig::LastObservation
        );
        assert!(config.memory.enabled);
        assert_eq!(config.memory.window, 4);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "executor = [").unwrap();
        let err = AppConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let config = AppConfig {
            api_key: Some("sk-secret".into()),
            ..AppConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("sk-secret"));
    }

    #[test]
    fn tool_sections_parsing() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
tools = ["calculator", "sql_database"]

[web_search]
api_key = "serp-secret"
max_results = 5

[sql_database]
url = "sqlite://shop.db"
read_only = false
"#
        )
        .unwrap();

        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.web_search.api_key.as_deref(), Some("serp-secret"));
        assert_eq!(config.web_search.max_results, 5);
        assert_eq!(config.sql_database.url.as_deref(), Some("sqlite://shop.db"));
        assert!(!config.sql_database.read_only);
        assert_eq!(config.sql_database.max_rows, 20);
        assert!(!format!("{config:?}").contains("serp-secret"));
    }

    #[test]
    fn sql_tool_without_url_rejected() {
        let config = AppConfig {
            tools: vec!["sql_database".into()],
            ..AppConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("sql_database"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("gpt-4o-mini"));
        assert!(toml_str.contains("max_iterations = 5"));
    }
}
