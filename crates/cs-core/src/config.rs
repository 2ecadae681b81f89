//! Configuration management
//!
//! Settings are resolved in the following order:
//! 1. Environment variables
//! 2. `cluestack.toml` configuration file
//! 3. Default values
//!
//! `${VAR_NAME}` references inside the configuration file are expanded from
//! the environment before parsing.

use serde::Deserialize;
use std::fmt;
use std::path::Path;
use zeroize::Zeroizing;

use crate::Error;

/// Default configuration file name looked up by [`Config::load`]
pub const CONFIG_FILE_NAME: &str = "cluestack.toml";

/// LLM Provider type
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LlmProvider {
    /// Anthropic Claude API
    #[default]
    Claude,
    /// OpenAI-compatible API
    OpenAi,
}

impl LlmProvider {
    fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "openai" | "glm" | "zai" | "minimax" => LlmProvider::OpenAi,
            _ => LlmProvider::Claude,
        }
    }
}

/// Secret string that is wiped from memory on drop
#[derive(Clone)]
pub struct SecureString(Zeroizing<String>);

impl SecureString {
    /// Create a new secure string
    pub fn new(s: impl Into<String>) -> Self {
        Self(Zeroizing::new(s.into()))
    }

    /// Get the string contents
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecureString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecureString(***)")
    }
}

impl From<String> for SecureString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecureString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// LLM configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// API key
    pub api_key: String,
    /// Model to use
    pub model: String,
    /// API provider
    pub provider: LlmProvider,
    /// Base URL (optional, for custom endpoints)
    pub base_url: Option<String>,
    /// Maximum tokens per completion
    pub max_tokens: u64,
    /// HTTP timeout for a single inference call
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            provider: LlmProvider::Claude,
            base_url: None,
            max_tokens: default_max_tokens(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

/// Basic-auth credentials for the log backend
#[derive(Debug, Clone)]
pub struct BasicCredentials {
    pub username: SecureString,
    pub password: SecureString,
}

impl BasicCredentials {
    /// Build credentials, returning `None` unless both parts are non-empty
    pub fn from_parts(username: Option<String>, password: Option<String>) -> Option<Self> {
        match (username, password) {
            (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => Some(Self {
                username: SecureString::new(u),
                password: SecureString::new(p),
            }),
            _ => None,
        }
    }

    /// Read `GRAFANA_USERNAME` / `GRAFANA_PWD`
    pub fn from_env() -> Option<Self> {
        Self::from_parts(
            std::env::var("GRAFANA_USERNAME").ok(),
            std::env::var("GRAFANA_PWD").ok(),
        )
    }
}

/// Log backend configuration
#[derive(Debug, Clone)]
pub struct LogsConfig {
    /// Full URL of the `query_range` endpoint
    pub endpoint: String,
    /// Lookback window used when no valid time range is given
    pub lookback_days: u32,
    /// Maximum number of records per fetch
    pub limit: u32,
    /// HTTP timeout for a single fetch
    pub timeout_secs: u64,
    /// Basic-auth credentials; `None` makes every fetch fail before the request
    pub credentials: Option<BasicCredentials>,
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            endpoint: default_logs_endpoint(),
            lookback_days: default_lookback_days(),
            limit: default_logs_limit(),
            timeout_secs: default_logs_timeout(),
            credentials: None,
        }
    }
}

/// Code-index (MCP) configuration
#[derive(Debug, Clone)]
pub struct McpConfig {
    /// Path to an MCP server list (JSON format)
    pub config_path: Option<String>,
    /// Whether MCP integration is enabled
    pub enabled: bool,
    /// Code-index server used when no server list is configured
    pub code_index_url: String,
    /// Timeout for a single remote tool call
    pub call_timeout_secs: u64,
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            config_path: None,
            enabled: true,
            code_index_url: default_code_index_url(),
            call_timeout_secs: default_call_timeout(),
        }
    }
}

/// Budgets for the reasoning loops
#[derive(Debug, Clone)]
pub struct AgentsConfig {
    /// Maximum reasoning/tool round-trips for a specialist
    pub specialist_max_iterations: usize,
    /// Maximum reasoning turns for the supervisor
    pub supervisor_max_turns: usize,
    /// Corrective turns granted after a schema violation
    pub schema_corrections: usize,
    /// Re-prompts granted when the supervisor output cannot be interpreted
    pub max_clarifications: usize,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            specialist_max_iterations: 10,
            supervisor_max_turns: 8,
            schema_corrections: 1,
            max_clarifications: 2,
        }
    }
}

/// Main configuration for cluestack
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub llm: LlmConfig,
    pub logs: LogsConfig,
    pub mcp: McpConfig,
    pub agents: AgentsConfig,
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_max_tokens() -> u64 {
    4096
}

fn default_llm_timeout() -> u64 {
    120
}

fn default_logs_endpoint() -> String {
    "http://localhost:3100/loki/api/v1/query_range".to_string()
}

fn default_lookback_days() -> u32 {
    7
}

fn default_logs_limit() -> u32 {
    500
}

fn default_logs_timeout() -> u64 {
    30
}

fn default_code_index_url() -> String {
    "https://mcp.deepwiki.com/mcp".to_string()
}

fn default_call_timeout() -> u64 {
    60
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env_non_empty(name).and_then(|v| v.parse().ok())
}

impl Config {
    /// Expand `${VAR_NAME}` references from the environment.
    ///
    /// Unknown variables expand to an empty string.
    fn expand_env_vars(value: &str) -> String {
        let mut result = String::new();
        let mut chars = value.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '$' && chars.peek() == Some(&'{') {
                chars.next();

                let mut var_name = String::new();
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    var_name.push(c);
                }

                if let Ok(env_value) = std::env::var(&var_name) {
                    result.push_str(&env_value);
                }
            } else {
                result.push(c);
            }
        }

        result
    }

    /// Load configuration from a TOML file, then apply environment overrides
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();

        let toml_content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let mut cfg = Self::from_toml_str(&toml_content)?;
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    /// Parse configuration from TOML text (after `${VAR}` expansion)
    pub fn from_toml_str(content: &str) -> crate::Result<Self> {
        let expanded = Self::expand_env_vars(content);
        let config: TomlConfig = toml::from_str(&expanded)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;
        Ok(Self::from_toml_config(config))
    }

    /// Load `./cluestack.toml` if present, otherwise read the environment only
    pub fn load() -> crate::Result<Self> {
        if Path::new(CONFIG_FILE_NAME).exists() {
            return Self::from_toml_file(CONFIG_FILE_NAME);
        }
        Self::from_env()
    }

    fn from_toml_config(toml: TomlConfig) -> Self {
        let llm = toml.llm.unwrap_or_default();
        let llm_config = LlmConfig {
            api_key: llm.api_key.unwrap_or_default(),
            model: llm.model.unwrap_or_else(default_model),
            provider: LlmProvider::parse(&llm.provider.unwrap_or_default()),
            base_url: llm.base_url,
            max_tokens: llm.max_tokens.unwrap_or_else(default_max_tokens),
            timeout_secs: llm.timeout_secs.unwrap_or_else(default_llm_timeout),
        };

        let logs = toml.logs.unwrap_or_default();
        let logs_config = LogsConfig {
            endpoint: logs.endpoint.unwrap_or_else(default_logs_endpoint),
            lookback_days: logs.lookback_days.unwrap_or_else(default_lookback_days),
            limit: logs.limit.unwrap_or_else(default_logs_limit),
            timeout_secs: logs.timeout_secs.unwrap_or_else(default_logs_timeout),
            credentials: BasicCredentials::from_parts(logs.username, logs.password),
        };

        let mcp = toml.mcp.unwrap_or_default();
        let mcp_config = McpConfig {
            config_path: mcp.config_path,
            enabled: mcp.enabled.unwrap_or(true),
            code_index_url: mcp.code_index_url.unwrap_or_else(default_code_index_url),
            call_timeout_secs: mcp.call_timeout_secs.unwrap_or_else(default_call_timeout),
        };

        let agents = toml.agents.unwrap_or_default();
        let defaults = AgentsConfig::default();
        let agents_config = AgentsConfig {
            specialist_max_iterations: agents
                .specialist_max_iterations
                .unwrap_or(defaults.specialist_max_iterations),
            supervisor_max_turns: agents
                .supervisor_max_turns
                .unwrap_or(defaults.supervisor_max_turns),
            schema_corrections: agents
                .schema_corrections
                .unwrap_or(defaults.schema_corrections),
            max_clarifications: agents
                .max_clarifications
                .unwrap_or(defaults.max_clarifications),
        };

        Config {
            llm: llm_config,
            logs: logs_config,
            mcp: mcp_config,
            agents: agents_config,
        }
    }

    /// Override settings from the environment (environment wins)
    fn apply_env_overrides(&mut self) {
        if let Some(api_key) = env_non_empty("LLM_API_KEY").or_else(|| env_non_empty("CLAUDE_API_KEY")) {
            self.llm.api_key = api_key;
        }
        // ANTHROPIC_* is intentionally not read
        if let Some(model) = env_non_empty("LLM_MODEL").or_else(|| env_non_empty("CLAUDE_MODEL")) {
            self.llm.model = model;
        }
        if let Some(provider) = env_non_empty("LLM_PROVIDER") {
            self.llm.provider = LlmProvider::parse(&provider);
        }
        if let Some(base_url) = env_non_empty("LLM_BASE_URL") {
            self.llm.base_url = Some(base_url);
        }

        if let Some(endpoint) = env_non_empty("LOGS_ENDPOINT") {
            self.logs.endpoint = endpoint;
        }
        if let Some(days) = env_parse("LOGS_LOOKBACK_DAYS") {
            self.logs.lookback_days = days;
        }
        if let Some(limit) = env_parse("LOGS_LIMIT") {
            self.logs.limit = limit;
        }
        if let Some(credentials) = BasicCredentials::from_env() {
            self.logs.credentials = Some(credentials);
        }

        if let Some(enabled) = env_non_empty("MCP_ENABLED") {
            self.mcp.enabled = enabled.to_lowercase() != "false";
        }
        if let Some(path) = env_non_empty("MCP_CONFIG_PATH") {
            self.mcp.config_path = Some(path);
        }
        if let Some(url) = env_non_empty("CODE_INDEX_URL") {
            self.mcp.code_index_url = url;
        }

        if let Some(iterations) = env_parse("AGENT_MAX_ITERATIONS") {
            self.agents.specialist_max_iterations = iterations;
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let api_key = env_non_empty("LLM_API_KEY")
            .or_else(|| env_non_empty("CLAUDE_API_KEY"))
            .ok_or_else(|| Error::Config("LLM_API_KEY or CLAUDE_API_KEY not set".to_string()))?;

        let mut config = Config::default();
        config.llm.api_key = api_key;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Get the effective LLM configuration
    pub fn llm_config(&self) -> &LlmConfig {
        &self.llm
    }
}

// ============================================================================
// TOML file structure
// ============================================================================

#[derive(Debug, Deserialize)]
struct TomlConfig {
    llm: Option<TomlLlmConfig>,
    logs: Option<TomlLogsConfig>,
    mcp: Option<TomlMcpConfig>,
    agents: Option<TomlAgentsConfig>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlLlmConfig {
    /// "claude" or "openai"
    provider: Option<String>,
    model: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    max_tokens: Option<u64>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlLogsConfig {
    endpoint: Option<String>,
    lookback_days: Option<u32>,
    limit: Option<u32>,
    timeout_secs: Option<u64>,
    username: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlMcpConfig {
    config_path: Option<String>,
    enabled: Option<bool>,
    code_index_url: Option<String>,
    call_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlAgentsConfig {
    specialist_max_iterations: Option<usize>,
    supervisor_max_turns: Option<usize>,
    schema_corrections: Option<usize>,
    max_clarifications: Option<usize>,
}
