//! Error types for workwise
//!
//! Each layer has its own error enum so callers can tell "the model call
//! failed" apart from "the reply could not be parsed" apart from "the config
//! is wrong". [`WorkwiseError`] wraps them at the application boundary.

use crate::pipeline::StageKind;
use llm::LlmError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for workwise operations
pub type Result<T> = std::result::Result<T, WorkwiseError>;

/// Why a model reply could not be turned into workflow steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionErrorKind {
    /// The text contains no `[` at all.
    NoArrayFound,
    /// Bracketed content exists but none of it parses as a JSON array.
    MalformedJson,
    /// An array element lacks one of the required keys or has the wrong type.
    MissingFields,
}

impl ExtractionErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoArrayFound => "no_array_found",
            Self::MalformedJson => "malformed_json",
            Self::MissingFields => "missing_fields",
        }
    }
}

impl fmt::Display for ExtractionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure to extract workflow steps from generated text.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {detail}")]
pub struct ExtractionError {
    pub kind: ExtractionErrorKind,
    pub detail: String,
}

impl ExtractionError {
    pub fn new(kind: ExtractionErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    pub fn no_array_found() -> Self {
        Self::new(ExtractionErrorKind::NoArrayFound, "text contains no '[' character")
    }

    pub fn malformed_json(detail: impl Into<String>) -> Self {
        Self::new(ExtractionErrorKind::MalformedJson, detail)
    }

    pub fn missing_fields(detail: impl Into<String>) -> Self {
        Self::new(ExtractionErrorKind::MissingFields, detail)
    }
}

/// Errors returned by a model client call.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The underlying chat model failed.
    #[error(transparent)]
    Llm(#[from] LlmError),

    /// The agent kept requesting tools past the allowed number of model calls.
    #[error("recursion limit of {0} model calls reached without a final answer")]
    RecursionLimit(usize),

    /// The whole call exceeded its deadline.
    #[error("model call timed out after {0:?}")]
    Timeout(Duration),

    /// The client returned without appending a message.
    #[error("model client returned no new message")]
    NoReply,
}

impl ClientError {
    /// Whether repeating the same call might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Llm(err) => err.is_retryable(),
            Self::Timeout(_) => true,
            Self::RecursionLimit(_) | Self::NoReply => false,
        }
    }
}

/// What went wrong inside a pipeline stage.
#[derive(Debug, Error)]
pub enum StageFailure {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("stage deadline of {0:?} exceeded")]
    Timeout(Duration),

    #[error("run was cancelled")]
    Cancelled,
}

/// A pipeline stage failed; later stages did not run.
#[derive(Debug, Error)]
#[error("{stage} stage failed: {cause}")]
pub struct PipelineError {
    pub stage: StageKind,
    #[source]
    pub cause: StageFailure,
}

impl PipelineError {
    pub fn new(stage: StageKind, cause: impl Into<StageFailure>) -> Self {
        Self {
            stage,
            cause: cause.into(),
        }
    }

    /// The stage that failed.
    pub fn stage(&self) -> StageKind {
        self.stage
    }
}

/// Chat history could not be converted into a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversationError {
    #[error("unknown role '{role}' at message {index}")]
    UnknownRole { index: usize, role: String },
}

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Main error type at the application boundary.
#[derive(Debug, Error)]
pub enum WorkwiseError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Conversation error: {0}")]
    Conversation(#[from] ConversationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_error_display() {
        let err = ExtractionError::missing_fields("element 0 is missing 'explanation'");
        assert_eq!(err.to_string(), "missing_fields: element 0 is missing 'explanation'");
        assert_eq!(
            serde_json::to_value(err.kind).unwrap(),
            serde_json::json!("missing_fields")
        );
    }

    #[test]
    fn test_client_error_retryable() {
        assert!(ClientError::Llm(LlmError::RateLimitExceeded("429".into())).is_retryable());
        assert!(ClientError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(!ClientError::RecursionLimit(10).is_retryable());
        assert!(!ClientError::Llm(LlmError::AuthenticationError("401".into())).is_retryable());
    }

    #[test]
    fn test_pipeline_error_reports_stage() {
        let err = PipelineError::new(StageKind::Score, StageFailure::Cancelled);
        assert_eq!(err.stage(), StageKind::Score);
        assert_eq!(err.to_string(), "score stage failed: run was cancelled");
    }

    #[test]
    fn test_error_conversion() {
        let err: WorkwiseError = ConfigError::Invalid("empty model".into()).into();
        assert!(matches!(err, WorkwiseError::Config(_)));
    }
}
