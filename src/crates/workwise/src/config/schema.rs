//! Configuration schema for workwise

use crate::agent::{CompletionOptions, WikipediaSearchTool};
use crate::error::ConfigError;
use crate::pipeline::{RetryPolicy, StagePolicy};
use llm::remote::WatsonxApi;
use llm::{ChatConfig, RemoteLlmConfig};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;

/// Main workwise configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkwiseConfig {
    /// LLM provider configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Pipeline execution configuration
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Agent tool configuration
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Hosted model provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Watsonx,
    Openai,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Watsonx => "watsonx",
            Provider::Openai => "openai",
        }
    }

    /// Environment variable consulted when no api key is configured.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            Provider::Watsonx => "WATSONX_TOKEN",
            Provider::Openai => "OPENAI_API_KEY",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "watsonx" => Ok(Provider::Watsonx),
            "openai" => Ok(Provider::Openai),
            other => Err(format!("unknown provider '{}' (expected watsonx or openai)", other)),
        }
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider: "watsonx" or "openai"
    pub provider: Provider,

    /// watsonx inference API: "chat" or "generation"
    pub api: WatsonxApi,

    /// Model identifier
    pub model: String,

    /// API base URL
    pub base_url: String,

    /// Bearer token (supports `${VAR}` interpolation)
    pub api_key: Option<String>,

    /// watsonx project id
    pub project_id: Option<String>,

    /// watsonx deployment space id
    pub space_id: Option<String>,

    /// Sampling temperature (0.0-2.0)
    pub temperature: f32,

    /// Maximum tokens to generate per model call
    pub max_tokens: usize,

    /// HTTP request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: Provider::Watsonx,
            api: WatsonxApi::Chat,
            model: "meta-llama/llama-3-3-70b-instruct".to_string(),
            base_url: "https://us-south.ml.cloud.ibm.com".to_string(),
            api_key: None,
            project_id: None,
            space_id: None,
            temperature: 0.0,
            max_tokens: 2000,
            timeout_secs: 60,
        }
    }
}

/// Pipeline execution configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum model calls per stage before giving up
    pub recursion_limit: usize,

    /// Deadline for a stage, retries included
    pub stage_timeout_secs: Option<u64>,

    /// Deadline for a single model client call
    pub call_timeout_secs: Option<u64>,

    /// Passages returned by the document lookup tool
    pub lookup_top_k: usize,

    /// Retry policy applied to every stage
    pub retry: RetryPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            recursion_limit: CompletionOptions::DEFAULT_RECURSION_LIMIT,
            stage_timeout_secs: None,
            call_timeout_secs: None,
            lookup_top_k: 3,
            retry: RetryPolicy::default(),
        }
    }
}

/// Tools offered to the chat assistant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Offer the Wikipedia search tool
    pub web_search: bool,

    /// MediaWiki API endpoint
    pub search_url: String,

    /// Articles returned per search
    pub search_top_k: usize,

    /// Deadline for one search request
    pub search_timeout_secs: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            web_search: true,
            search_url: WikipediaSearchTool::DEFAULT_URL.to_string(),
            search_top_k: WikipediaSearchTool::DEFAULT_TOP_K,
            search_timeout_secs: 10,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,

    /// Output format: compact or pretty
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

const REDACTED: &str = "********";

impl WorkwiseConfig {
    /// Expand `${VAR}` and `${VAR:default}` references in string values.
    ///
    /// Unset variables without a default expand to an empty string; optional
    /// fields that end up empty are cleared.
    pub fn resolve_env_vars<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let llm = &mut self.llm;
        llm.model = expand_env_refs(&llm.model, &lookup);
        llm.base_url = expand_env_refs(&llm.base_url, &lookup);
        for field in [&mut llm.api_key, &mut llm.project_id, &mut llm.space_id] {
            *field = field
                .take()
                .map(|value| expand_env_refs(&value, &lookup))
                .filter(|value| !value.trim().is_empty());
        }
        self.tools.search_url = expand_env_refs(&self.tools.search_url, &lookup);
        self.logging.level = expand_env_refs(&self.logging.level, &lookup);
    }

    /// Apply `WORKWISE_*` environment overrides, then fall back to the
    /// provider's conventional token variable when no api key is set.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("WORKWISE_PROVIDER") {
            self.llm.provider = v.parse().map_err(|reason| invalid("WORKWISE_PROVIDER", reason))?;
        }
        if let Some(v) = get("WORKWISE_API") {
            self.llm.api = match v.trim().to_ascii_lowercase().as_str() {
                "chat" => WatsonxApi::Chat,
                "generation" => WatsonxApi::Generation,
                other => {
                    return Err(invalid(
                        "WORKWISE_API",
                        format!("unknown api '{}' (expected chat or generation)", other),
                    ))
                }
            };
        }
        if let Some(v) = get("WORKWISE_MODEL") {
            self.llm.model = v;
        }
        if let Some(v) = get("WORKWISE_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Some(v) = get("WORKWISE_API_KEY") {
            self.llm.api_key = Some(v);
        }
        if let Some(v) = get("WORKWISE_PROJECT_ID") {
            self.llm.project_id = Some(v);
        }
        if let Some(v) = get("WORKWISE_SPACE_ID") {
            self.llm.space_id = Some(v);
        }
        if let Some(v) = get("WORKWISE_TEMPERATURE") {
            self.llm.temperature = parse_number("WORKWISE_TEMPERATURE", &v)?;
        }
        if let Some(v) = get("WORKWISE_MAX_RETRIES") {
            self.pipeline.retry.max_retries = parse_number("WORKWISE_MAX_RETRIES", &v)?;
        }
        if let Some(v) = get("WORKWISE_STAGE_TIMEOUT_SECS") {
            self.pipeline.stage_timeout_secs = Some(parse_number("WORKWISE_STAGE_TIMEOUT_SECS", &v)?);
        }
        if let Some(v) = get("WORKWISE_WEB_SEARCH") {
            self.tools.web_search = parse_flag("WORKWISE_WEB_SEARCH", &v)?;
        }
        if let Some(v) = get("WORKWISE_LOG_LEVEL") {
            self.logging.level = v;
        }

        if self.llm.api_key.is_none() {
            self.llm.api_key = get(self.llm.provider.api_key_env());
        }
        Ok(())
    }

    /// Check the values a model call depends on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.llm.model.trim().is_empty() {
            return Err(invalid("llm.model", "must not be empty"));
        }
        if self.llm.base_url.trim().is_empty() {
            return Err(invalid("llm.base_url", "must not be empty"));
        }
        if self.llm.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
            return Err(invalid(
                "llm.api_key",
                format!(
                    "no api key configured; set llm.api_key, WORKWISE_API_KEY or {}",
                    self.llm.provider.api_key_env()
                ),
            ));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(invalid(
                "llm.temperature",
                format!("{} is outside 0.0..=2.0", self.llm.temperature),
            ));
        }
        if self.llm.max_tokens == 0 {
            return Err(invalid("llm.max_tokens", "must be greater than zero"));
        }
        if self.pipeline.recursion_limit == 0 {
            return Err(invalid("pipeline.recursion_limit", "must be greater than zero"));
        }
        if self.pipeline.retry.backoff_multiplier < 1.0 {
            return Err(invalid("pipeline.retry.backoff_multiplier", "must be at least 1.0"));
        }
        if self.tools.web_search && self.tools.search_url.trim().is_empty() {
            return Err(invalid("tools.search_url", "must not be empty when web_search is on"));
        }
        if self.llm.provider == Provider::Watsonx
            && self.llm.project_id.is_none()
            && self.llm.space_id.is_none()
        {
            return Err(ConfigError::Invalid(
                "watsonx requires llm.project_id or llm.space_id".to_string(),
            ));
        }
        Ok(())
    }

    /// Copy with the api key masked, for display.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.llm.api_key.is_some() {
            copy.llm.api_key = Some(REDACTED.to_string());
        }
        copy
    }

    /// Connection settings for the provider client.
    pub fn remote_config(&self) -> RemoteLlmConfig {
        let mut remote = RemoteLlmConfig::new(
            self.llm.api_key.clone().unwrap_or_default(),
            self.llm.base_url.clone(),
            self.llm.model.clone(),
        )
        .with_timeout(Duration::from_secs(self.llm.timeout_secs));
        if let Some(project) = &self.llm.project_id {
            remote = remote.with_project_id(project.clone());
        }
        if let Some(space) = &self.llm.space_id {
            remote = remote.with_space_id(space.clone());
        }
        remote
    }

    /// Generation parameters for every model call.
    pub fn chat_config(&self) -> ChatConfig {
        ChatConfig {
            temperature: Some(self.llm.temperature),
            max_tokens: Some(self.llm.max_tokens),
            ..ChatConfig::default()
        }
    }

    /// Retry and deadline policy applied to each stage.
    pub fn stage_policy(&self) -> StagePolicy {
        let policy = StagePolicy::default().with_retry(self.pipeline.retry.clone());
        match self.pipeline.stage_timeout_secs {
            Some(secs) => policy.with_timeout(Duration::from_secs(secs)),
            None => policy,
        }
    }

    /// Client options for a new run.
    pub fn completion_options(&self) -> CompletionOptions {
        let options = CompletionOptions::default().with_recursion_limit(self.pipeline.recursion_limit);
        match self.pipeline.call_timeout_secs {
            Some(secs) => options.with_timeout(Duration::from_secs(secs)),
            None => options,
        }
    }
}

fn invalid(key: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(key, format!("'{}' is not a valid number", value)))
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(key, format!("'{}' is not a boolean", value))),
    }
}

fn env_ref_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{([^:}]+)(?::([^}]*))?\}").expect("env reference pattern is a valid regex")
    })
}

/// Replace every `${VAR}` / `${VAR:default}` in `value`.
fn expand_env_refs<F>(value: &str, lookup: &F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    env_ref_pattern()
        .replace_all(value, |caps: &regex::Captures<'_>| {
            let name = caps[1].trim();
            lookup(name)
                .or_else(|| caps.get(2).map(|d| d.as_str().to_string()))
                .unwrap_or_default()
        })
        .into_owned()
}
