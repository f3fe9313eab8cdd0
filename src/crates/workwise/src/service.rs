//! Caller-facing entry points: analyze a workflow document, or chat about
//! workflow strategy.
//!
//! Both operations catch every failure at the run boundary. `analyze` always
//! yields an [`AnalysisReport`] (steps, or an empty list plus a structured
//! reason) and `chat` always yields a [`ChatEnvelope`].

use crate::agent::{
    CompletionOptions, DocumentLookupTool, ModelClient, ReactAgent, Tool, ToolSet, WikipediaSearchTool,
};
use crate::config::{Provider, WorkwiseConfig};
use crate::conversation::{ChatTurn, ConversationState};
use crate::error::{ConfigError, ExtractionError, ExtractionErrorKind, PipelineError, Result};
use crate::pipeline::{prompts, Pipeline, StageKind, StagePolicy};
use crate::step::WorkflowStep;
use llm::remote::{OpenAiClient, WatsonxClient};
use llm::{ChatModel, LlmError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

/// Why an analysis produced no steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    NoArrayFound,
    MalformedJson,
    MissingFields,
    StageFailed,
    InvalidHistory,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::NoArrayFound => "no_array_found",
            FailureReason::MalformedJson => "malformed_json",
            FailureReason::MissingFields => "missing_fields",
            FailureReason::StageFailed => "stage_failed",
            FailureReason::InvalidHistory => "invalid_history",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ExtractionErrorKind> for FailureReason {
    fn from(kind: ExtractionErrorKind) -> Self {
        match kind {
            ExtractionErrorKind::NoArrayFound => FailureReason::NoArrayFound,
            ExtractionErrorKind::MalformedJson => FailureReason::MalformedJson,
            ExtractionErrorKind::MissingFields => FailureReason::MissingFields,
        }
    }
}

/// Structured reason attached to an empty analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisFailure {
    pub reason: FailureReason,

    /// The stage that failed, for `stage_failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<StageKind>,

    /// Human-readable diagnostic.
    pub message: String,
}

impl From<ExtractionError> for AnalysisFailure {
    fn from(err: ExtractionError) -> Self {
        Self {
            reason: err.kind.into(),
            stage: None,
            message: err.detail,
        }
    }
}

impl From<PipelineError> for AnalysisFailure {
    fn from(err: PipelineError) -> Self {
        Self {
            reason: FailureReason::StageFailed,
            stage: Some(err.stage()),
            message: err.to_string(),
        }
    }
}

/// Result of one analysis. `steps` is empty exactly when `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub steps: Vec<WorkflowStep>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<AnalysisFailure>,
}

impl AnalysisReport {
    pub fn success(steps: Vec<WorkflowStep>) -> Self {
        Self { steps, error: None }
    }

    pub fn failure(failure: AnalysisFailure) -> Self {
        Self {
            steps: Vec::new(),
            error: Some(failure),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Chat reply in the chat-completions response shape the UI consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEnvelope {
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatChoice {
    pub index: u32,
    pub message: ChatTurn,
}

impl ChatEnvelope {
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            choices: vec![ChatChoice {
                index: 0,
                message: ChatTurn::new("assistant", content),
            }],
        }
    }

    /// Text of the first choice.
    pub fn content(&self) -> &str {
        self.choices
            .first()
            .map(|c| c.message.content.as_str())
            .unwrap_or_default()
    }
}

/// Build the chat model named by `config`.
pub fn connect(config: &WorkwiseConfig) -> std::result::Result<Arc<dyn ChatModel>, LlmError> {
    let remote = config.remote_config();
    let model: Arc<dyn ChatModel> = match config.llm.provider {
        Provider::Watsonx => Arc::new(WatsonxClient::new(remote, config.llm.api)?),
        Provider::Openai => Arc::new(OpenAiClient::new(remote)?),
    };
    Ok(model)
}

/// Runs workflow analyses and assistant chats against one model client.
#[derive(Clone)]
pub struct WorkflowAnalyzer {
    client: Arc<dyn ModelClient>,
    policy: StagePolicy,
    options: CompletionOptions,
    lookup_top_k: usize,
    chat_tools: ToolSet,
}

impl WorkflowAnalyzer {
    pub fn new(client: Arc<dyn ModelClient>) -> Self {
        Self {
            client,
            policy: StagePolicy::default(),
            options: CompletionOptions::default(),
            lookup_top_k: DocumentLookupTool::DEFAULT_TOP_K,
            chat_tools: ToolSet::new(),
        }
    }

    /// Validate `config` and connect to its provider.
    pub fn from_config(config: &WorkwiseConfig) -> Result<Self> {
        config.validate()?;
        let agent = ReactAgent::new(connect(config)?).with_config(config.chat_config());
        info!(
            provider = %config.llm.provider,
            model = %agent.model_name(),
            "workflow analyzer ready"
        );
        let mut analyzer = Self::new(Arc::new(agent))
            .with_policy(config.stage_policy())
            .with_options(config.completion_options())
            .with_lookup_top_k(config.pipeline.lookup_top_k);

        if config.tools.web_search {
            let search = WikipediaSearchTool::new(Duration::from_secs(config.tools.search_timeout_secs))
                .map_err(|e| ConfigError::Invalid(e.to_string()))?
                .with_url(config.tools.search_url.clone())
                .with_top_k(config.tools.search_top_k);
            analyzer = analyzer.with_chat_tool(Arc::new(search));
        }
        Ok(analyzer)
    }

    pub fn with_policy(mut self, policy: StagePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Recursion limit and call timeout for every run. Each run gets its own
    /// thread id.
    pub fn with_options(mut self, options: CompletionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_lookup_top_k(mut self, top_k: usize) -> Self {
        self.lookup_top_k = top_k;
        self
    }

    /// Offer `tool` to the assistant in [`chat`](Self::chat).
    pub fn with_chat_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.chat_tools.register(tool);
        self
    }

    pub fn chat_tools(&self) -> &ToolSet {
        &self.chat_tools
    }

    fn run_options(&self) -> CompletionOptions {
        CompletionOptions {
            thread_id: Uuid::new_v4().to_string(),
            ..self.options.clone()
        }
    }

    /// Analyze `document` into scored workflow steps.
    pub async fn analyze(&self, document: &str, history: &[ChatTurn]) -> AnalysisReport {
        self.analyze_with_cancel(document, history, CancellationToken::new())
            .await
    }

    /// Like [`analyze`](Self::analyze), abandoning the run once `cancel` fires.
    pub async fn analyze_with_cancel(
        &self,
        document: &str,
        history: &[ChatTurn],
        cancel: CancellationToken,
    ) -> AnalysisReport {
        let conversation = match ConversationState::from_turns(history) {
            Ok(conversation) => conversation,
            Err(e) => {
                warn!(error = %e, "rejected chat history");
                return AnalysisReport::failure(AnalysisFailure {
                    reason: FailureReason::InvalidHistory,
                    stage: None,
                    message: e.to_string(),
                });
            }
        };

        let tools = ToolSet::new().with_tool(Arc::new(
            DocumentLookupTool::new(document).with_top_k(self.lookup_top_k),
        ));
        let pipeline = Pipeline::new(self.client.clone())
            .with_tools(tools)
            .with_policy(self.policy.clone())
            .with_options(self.run_options());

        match pipeline.run_with_cancel(document, conversation, cancel).await {
            Ok(outcome) => match outcome.failure {
                Some(failure) => AnalysisReport::failure(failure.into()),
                None => AnalysisReport::success(outcome.steps),
            },
            Err(e) => AnalysisReport::failure(e.into()),
        }
    }

    /// Answer the last message of `history` with the assistant persona.
    pub async fn chat(&self, history: &[ChatTurn]) -> ChatEnvelope {
        let conversation = match ConversationState::from_turns(history) {
            Ok(conversation) => conversation,
            Err(e) => {
                warn!(error = %e, "rejected chat history");
                return ChatEnvelope::assistant(format!("Invalid chat history: {}", e));
            }
        };
        let before = conversation.len();
        let options = self.run_options();

        match self
            .client
            .complete(conversation, &self.chat_tools, prompts::ASSISTANT_INSTRUCTIONS, &options)
            .await
        {
            Ok(out) if out.len() > before => {
                ChatEnvelope::assistant(out.last_text().unwrap_or_default())
            }
            Ok(_) => ChatEnvelope::assistant("Error: the model returned no reply."),
            Err(e) => {
                warn!(thread_id = %options.thread_id, error = %e, "chat call failed");
                ChatEnvelope::assistant(format!("Error: {}", e))
            }
        }
    }
}

impl fmt::Debug for WorkflowAnalyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowAnalyzer")
            .field("policy", &self.policy)
            .field("options", &self.options)
            .field("lookup_top_k", &self.lookup_top_k)
            .field("chat_tools", &self.chat_tools)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use async_trait::async_trait;
    use llm::Message;
    use std::sync::Mutex;

    struct Echo {
        seen: Mutex<Vec<String>>,
        reply: std::result::Result<&'static str, ()>,
    }

    #[async_trait]
    impl ModelClient for Echo {
        async fn complete(
            &self,
            mut conversation: ConversationState,
            _tools: &ToolSet,
            role_instructions: &str,
            _options: &CompletionOptions,
        ) -> std::result::Result<ConversationState, ClientError> {
            self.seen.lock().unwrap().push(role_instructions.to_string());
            match self.reply {
                Ok(text) => {
                    conversation.push(Message::assistant(text));
                    Ok(conversation)
                }
                Err(()) => Err(ClientError::Llm(LlmError::ServiceUnavailable("503".into()))),
            }
        }
    }

    fn analyzer(reply: std::result::Result<&'static str, ()>) -> (Arc<Echo>, WorkflowAnalyzer) {
        let client = Arc::new(Echo {
            seen: Mutex::new(Vec::new()),
            reply,
        });
        (client.clone(), WorkflowAnalyzer::new(client))
    }

    #[tokio::test]
    async fn test_chat_envelope_shape() {
        let (client, analyzer) = analyzer(Ok("Hi, I am the WorkWise AI assistant."));
        let envelope = analyzer.chat(&[ChatTurn::user("hello")]).await;

        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            serde_json::json!({"choices": [{"index": 0, "message": {
                "role": "assistant", "content": "Hi, I am the WorkWise AI assistant."
            }}]})
        );
        assert_eq!(client.seen.lock().unwrap()[0], prompts::ASSISTANT_INSTRUCTIONS);
    }

    #[tokio::test]
    async fn test_chat_failure_is_visible_text() {
        let (_, analyzer) = analyzer(Err(()));
        let envelope = analyzer.chat(&[ChatTurn::user("hello")]).await;
        assert!(envelope.content().starts_with("Error:"));

        let envelope = analyzer.chat(&[ChatTurn::new("robot", "beep")]).await;
        assert!(envelope.content().contains("unknown role"));
    }

    #[tokio::test]
    async fn test_analyze_reports_stage_failure() {
        let (_, analyzer) = analyzer(Err(()));
        let report = analyzer.analyze("Acme", &[]).await;

        assert!(report.steps.is_empty());
        let failure = report.error.unwrap();
        assert_eq!(failure.reason, FailureReason::StageFailed);
        assert_eq!(failure.stage, Some(StageKind::Summarize));
    }

    #[tokio::test]
    async fn test_analyze_rejects_invalid_history() {
        let (client, analyzer) = analyzer(Ok("[]"));
        let report = analyzer
            .analyze("Acme", &[ChatTurn::new("narrator", "once upon a time")])
            .await;

        assert_eq!(report.error.unwrap().reason, FailureReason::InvalidHistory);
        assert!(client.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_from_config_offers_web_search_to_chat() {
        let mut config = WorkwiseConfig::default();
        config.llm.api_key = Some("token".into());
        config.llm.space_id = Some("space".into());

        let analyzer = WorkflowAnalyzer::from_config(&config).unwrap();
        assert_eq!(analyzer.chat_tools().names(), vec![WikipediaSearchTool::NAME]);

        config.tools.web_search = false;
        let analyzer = WorkflowAnalyzer::from_config(&config).unwrap();
        assert!(analyzer.chat_tools().is_empty());
    }

    #[test]
    fn test_report_serialization() {
        let report = AnalysisReport::failure(ExtractionError::no_array_found().into());
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["steps"], serde_json::json!([]));
        assert_eq!(value["error"]["reason"], "no_array_found");
        assert!(value["error"].get("stage").is_none());

        let ok = AnalysisReport::success(vec![WorkflowStep::new("Receive order", 6.0, "Manual")]);
        assert!(serde_json::to_value(&ok).unwrap().get("error").is_none());
    }
}
