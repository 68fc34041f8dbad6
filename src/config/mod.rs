//! Configuration
//!
//! Settings come from a TOML file (`medallion.toml` by default), then
//! `env:NAME` references are resolved, then the well-known environment
//! variables override whatever the file says. A `.env` file in the working
//! directory is loaded first, so it feeds both steps.
//!
//! ```toml
//! [warehouse]
//! backend = "databricks"          # or "sqlite"
//! host = "env:DATABRICKS_HOST"
//! catalog = "main"
//!
//! [llm]
//! provider = "anthropic"          # "openai" | "stub"
//! api_key = "env:ANTHROPIC_API_KEY"
//!
//! [agent]
//! sample_rows = 5
//! enforce_sql_shape = true
//!
//! [intent]
//! extra_transform_patterns = ['pivot\s']
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::session::{PatternSet, SessionOptions};
use crate::warehouse::validate_identifier;

/// Default config file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "medallion.toml";

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "MEDALLION_CONFIG";

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Missing configuration: {0}")]
    Missing(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Warehouse backend selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Databricks,
    Sqlite,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Databricks => f.write_str("databricks"),
            BackendKind::Sqlite => f.write_str("sqlite"),
        }
    }
}

/// LLM provider selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Anthropic,
    #[serde(rename = "openai")]
    OpenAi,
    Stub,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Anthropic => f.write_str("anthropic"),
            Provider::OpenAi => f.write_str("openai"),
            Provider::Stub => f.write_str("stub"),
        }
    }
}

/// `[warehouse]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WarehouseSettings {
    pub backend: BackendKind,
    /// Workspace hostname, scheme and trailing slash are stripped
    pub host: Option<String>,
    pub token: Option<String>,
    pub warehouse_id: Option<String>,
    pub catalog: String,
    /// SQLite directory; in-memory when absent
    pub path: Option<PathBuf>,
    pub timeout_secs: u64,
}

impl Default for WarehouseSettings {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            host: None,
            token: None,
            warehouse_id: None,
            catalog: "main".to_string(),
            path: None,
            timeout_secs: 30,
        }
    }
}

/// `[llm]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub provider: Provider,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            base_url: None,
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 4096,
            timeout_secs: 60,
        }
    }
}

/// `[agent]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    pub log_level: String,
    /// Rows shown to the LLM and in previews
    pub sample_rows: usize,
    pub describe_sample_rows: usize,
    pub enforce_sql_shape: bool,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            sample_rows: 5,
            describe_sample_rows: 3,
            enforce_sql_shape: true,
        }
    }
}

/// `[intent]`: extends the built-in classifier vocabulary
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct IntentSettings {
    pub extra_question_patterns: Vec<String>,
    pub extra_transform_patterns: Vec<String>,
    pub extra_action_words: Vec<String>,
}

/// Complete application settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub warehouse: WarehouseSettings,
    pub llm: LlmSettings,
    pub agent: AgentSettings,
    pub intent: IntentSettings,
    /// File the settings were read from, if any
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl Settings {
    /// Parse TOML text without touching the environment
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Read and parse a TOML file without touching the environment
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut settings = Self::from_toml_str(&content)?;
        settings.source = Some(path.to_path_buf());
        Ok(settings)
    }

    /// Full load: `.env`, optional file, `env:` references, overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Ok(env_file) = dotenvy::dotenv() {
            tracing::debug!(path = %env_file.display(), "loaded .env");
        }

        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        settings.apply_environment(|name| std::env::var(name).ok());
        Ok(settings)
    }

    /// Resolve `env:NAME` values and apply environment overrides
    ///
    /// `lookup` stands in for `std::env::var` so this stays testable.
    pub fn apply_environment<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let wh = &mut self.warehouse;
        for value in [&mut wh.host, &mut wh.token, &mut wh.warehouse_id] {
            resolve_reference(value, &lookup);
        }
        resolve_reference(&mut self.llm.api_key, &lookup);
        resolve_reference(&mut self.llm.base_url, &lookup);

        if let Some(host) = lookup("DATABRICKS_HOST") {
            wh.host = Some(host);
        }
        if let Some(token) = lookup("DATABRICKS_TOKEN") {
            wh.token = Some(token);
        }
        if let Some(id) = lookup("DATABRICKS_WAREHOUSE_ID") {
            wh.warehouse_id = Some(id);
        }
        if let Some(catalog) = lookup("DATABRICKS_CATALOG") {
            wh.catalog = catalog;
        }
        wh.host = wh.host.take().map(|h| normalize_host(&h));

        match self.llm.provider {
            Provider::Anthropic => {
                if let Some(key) = lookup("ANTHROPIC_API_KEY") {
                    self.llm.api_key = Some(key);
                }
                if let Some(model) = lookup("ANTHROPIC_MODEL") {
                    self.llm.model = model;
                }
            }
            Provider::OpenAi => {
                if let Some(key) = lookup("OPENAI_API_KEY") {
                    self.llm.api_key = Some(key);
                }
            }
            Provider::Stub => {}
        }

        if let Some(level) = lookup("LOG_LEVEL") {
            self.agent.log_level = level.to_lowercase();
        }
    }

    /// Report everything a real run would need but does not have
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut missing = Vec::new();

        if self.warehouse.backend == BackendKind::Databricks {
            let wh = &self.warehouse;
            if is_blank(&wh.host) {
                missing.push("warehouse.host (DATABRICKS_HOST)");
            }
            if is_blank(&wh.token) {
                missing.push("warehouse.token (DATABRICKS_TOKEN)");
            }
            if is_blank(&wh.warehouse_id) {
                missing.push("warehouse.warehouse_id (DATABRICKS_WAREHOUSE_ID)");
            }
        }

        if self.llm.provider != Provider::Stub && is_blank(&self.llm.api_key) {
            missing.push(match self.llm.provider {
                Provider::OpenAi => "llm.api_key (OPENAI_API_KEY)",
                _ => "llm.api_key (ANTHROPIC_API_KEY)",
            });
        }

        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing.join(", ")));
        }

        validate_identifier(&self.warehouse.catalog).map_err(|_| {
            ConfigError::Invalid(format!(
                "warehouse.catalog '{}' is not a plain identifier",
                self.warehouse.catalog
            ))
        })?;

        if self.agent.sample_rows == 0 {
            return Err(ConfigError::Invalid(
                "agent.sample_rows must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Session tuning derived from `[agent]`, `[llm]` and `[intent]`
    pub fn session_options(&self) -> Result<SessionOptions, ConfigError> {
        let mut patterns = PatternSet::builtin();
        for pattern in &self.intent.extra_question_patterns {
            patterns
                .add_question_pattern(pattern)
                .map_err(|e| ConfigError::Invalid(format!("intent pattern '{}': {}", pattern, e)))?;
        }
        for pattern in &self.intent.extra_transform_patterns {
            patterns
                .add_transform_pattern(pattern)
                .map_err(|e| ConfigError::Invalid(format!("intent pattern '{}': {}", pattern, e)))?;
        }
        for word in &self.intent.extra_action_words {
            patterns.add_action_word(word);
        }

        Ok(SessionOptions {
            sample_rows: self.agent.sample_rows,
            describe_sample_rows: self.agent.describe_sample_rows,
            max_tokens: self.llm.max_tokens,
            enforce_sql_shape: self.agent.enforce_sql_shape,
            patterns,
        })
    }
}

/// Strip scheme and trailing slash: `https://x.cloud.databricks.com/` → `x.cloud.databricks.com`
pub fn normalize_host(host: &str) -> String {
    let host = host.trim();
    let host = host
        .strip_prefix("https://")
        .or_else(|| host.strip_prefix("http://"))
        .unwrap_or(host);
    host.trim_end_matches('/').to_string()
}

fn resolve_reference<F>(value: &mut Option<String>, lookup: &F)
where
    F: Fn(&str) -> Option<String>,
{
    let Some(name) = value.as_deref().and_then(|v| v.strip_prefix("env:")) else {
        return;
    };
    let resolved = lookup(name);
    if resolved.is_none() {
        tracing::warn!(variable = name, "config references unset environment variable");
    }
    *value = resolved;
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}
