//! IBM watsonx.ai client implementation.
//!
//! watsonx exposes two inference APIs:
//!
//! - the **chat** API (`/ml/v1/text/chat`), message based with tool calling
//! - the **text generation** API (`/ml/v1/text/generation`), a single prompt
//!   in, a single completion out
//!
//! Requests are scoped to either a project or a deployment space. The bearer
//! token is taken as-is from [`RemoteLlmConfig::api_key`]; exchanging an IBM
//! Cloud API key for a token is left to the caller.
//!
//! # Example
//!
//! ```rust,ignore
//! use llm::remote::{WatsonxApi, WatsonxClient};
//! use llm::{ChatModel, ChatRequest, Message, RemoteLlmConfig};
//!
//! let config = RemoteLlmConfig::new(token, "https://us-south.ml.cloud.ibm.com", "ibm/granite-3-8b-instruct")
//!     .with_project_id("f284f75e-ea6b-4395-a973-1b7b02b2c176");
//! let client = WatsonxClient::new(config, WatsonxApi::Generation)?;
//! let response = client.chat(ChatRequest::new(vec![Message::human("Score this workflow")])).await?;
//! ```

use super::completions::{into_chat_response, to_wire_message, to_wire_tools, WireCompletion, WireMessage};
use crate::chat::{ChatModel, ChatRequest, ChatResponse, UsageMetadata};
use crate::config::RemoteLlmConfig;
use crate::error::{LlmError, Result};
use crate::message::{Message, MessageRole};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const PROVIDER: &str = "watsonx";
const CHAT_PATH: &str = "/ml/v1/text/chat?version=2024-05-01";
const GENERATION_PATH: &str = "/ml/v1/text/generation?version=2023-05-29";

/// Token budget for text generation when the request leaves it unset.
const DEFAULT_MAX_NEW_TOKENS: usize = 7999;

/// Which watsonx inference API to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatsonxApi {
    /// Message based chat API; supports tools.
    #[default]
    Chat,
    /// Prompt based text generation API.
    Generation,
}

/// watsonx.ai API client.
#[derive(Clone)]
pub struct WatsonxClient {
    config: RemoteLlmConfig,
    api: WatsonxApi,
    client: Client,
}

impl WatsonxClient {
    /// Create a new watsonx client.
    ///
    /// Fails when neither a project nor a space is configured, since every
    /// watsonx inference call must name one.
    pub fn new(config: RemoteLlmConfig, api: WatsonxApi) -> Result<Self> {
        if config.project_id.is_none() && config.space_id.is_none() {
            return Err(LlmError::ConfigError(
                "watsonx requires either project_id or space_id".to_string(),
            ));
        }
        let client = super::http_client(&config)?;
        Ok(Self { config, api, client })
    }

    /// The API this client calls.
    pub fn api(&self) -> WatsonxApi {
        self.api
    }

    fn scope(&self) -> (Option<String>, Option<String>) {
        // A project wins when both are set.
        match (&self.config.project_id, &self.config.space_id) {
            (Some(project), _) => (Some(project.clone()), None),
            (None, space) => (None, space.clone()),
        }
    }

    fn build_chat_request(&self, request: &ChatRequest) -> WatsonxChatRequest {
        let (project_id, space_id) = self.scope();
        WatsonxChatRequest {
            model_id: self.config.model.clone(),
            project_id,
            space_id,
            messages: request.messages.iter().map(to_wire_message).collect(),
            tools: to_wire_tools(&request.config.tools),
            max_tokens: request.config.max_tokens,
            temperature: request.config.temperature,
            top_p: request.config.top_p,
            frequency_penalty: request.config.frequency_penalty,
            presence_penalty: request.config.presence_penalty,
        }
    }

    fn build_generation_request(&self, request: &ChatRequest) -> WatsonxGenerationRequest {
        if !request.config.tools.is_empty() {
            tracing::warn!(
                provider = PROVIDER,
                tools = request.config.tools.len(),
                "text generation API does not support tools; ignoring them"
            );
        }
        let (project_id, space_id) = self.scope();
        WatsonxGenerationRequest {
            model_id: self.config.model.clone(),
            project_id,
            space_id,
            input: flatten_prompt(&request.messages),
            parameters: GenerationParameters {
                decoding_method: "greedy",
                max_new_tokens: request.config.max_tokens.unwrap_or(DEFAULT_MAX_NEW_TOKENS),
                min_new_tokens: 0,
                repetition_penalty: 1.0,
                stop_sequences: request.config.stop_sequences.clone(),
            },
        }
    }

    async fn chat_api(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let url = format!("{}{}", self.config.trimmed_base_url(), CHAT_PATH);
        let body = self.build_chat_request(request);
        let req = self.authorized(self.client.post(&url)).json(&body);
        let completion: WireCompletion = super::send_json(PROVIDER, req).await?;
        into_chat_response(PROVIDER, completion)
    }

    async fn generation_api(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let url = format!("{}{}", self.config.trimmed_base_url(), GENERATION_PATH);
        let body = self.build_generation_request(request);
        let req = self.authorized(self.client.post(&url)).json(&body);
        let reply: GenerationResponse = super::send_json(PROVIDER, req).await?;
        convert_generation(reply)
    }

    fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Accept", "application/json")
    }
}

#[async_trait]
impl ChatModel for WatsonxClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        tracing::debug!(
            provider = PROVIDER,
            api = ?self.api,
            model = %self.config.model,
            messages = request.messages.len(),
            "sending watsonx request"
        );
        match self.api {
            WatsonxApi::Chat => self.chat_api(&request).await,
            WatsonxApi::Generation => self.generation_api(&request).await,
        }
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

/// Render a conversation as one role-labelled prompt for the generation API.
fn flatten_prompt(messages: &[Message]) -> String {
    if let [only] = messages {
        if only.role == MessageRole::Human {
            return only.content.clone();
        }
    }

    let mut prompt = String::new();
    for msg in messages {
        let label = match msg.role {
            MessageRole::System => "System",
            MessageRole::Human => "User",
            MessageRole::Assistant => "Assistant",
            MessageRole::Tool => "Tool",
        };
        prompt.push_str(label);
        prompt.push_str(": ");
        prompt.push_str(&msg.content);
        prompt.push_str("\n\n");
    }
    prompt.push_str("Assistant:");
    prompt
}

fn convert_generation(reply: GenerationResponse) -> Result<ChatResponse> {
    let result = reply.results.into_iter().next().ok_or_else(|| {
        LlmError::InvalidResponse("watsonx generation returned no results".to_string())
    })?;

    let usage = match (result.input_token_count, result.generated_token_count) {
        (Some(input), Some(output)) => Some(UsageMetadata::new(input, output)),
        _ => None,
    };

    Ok(ChatResponse {
        message: Message::assistant(result.generated_text.trim().to_string()),
        usage,
        finish_reason: result.stop_reason,
    })
}

#[derive(Debug, Serialize)]
struct WatsonxChatRequest {
    model_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    project_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    space_id: Option<String>,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frequency_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    presence_penalty: Option<f32>,
}

#[derive(Debug, Serialize)]
struct WatsonxGenerationRequest {
    model_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    project_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    space_id: Option<String>,
    input: String,
    parameters: GenerationParameters,
}

#[derive(Debug, Serialize)]
struct GenerationParameters {
    decoding_method: &'static str,
    max_new_tokens: usize,
    min_new_tokens: usize,
    repetition_penalty: f32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stop_sequences: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    #[serde(default)]
    results: Vec<GenerationResult>,
}

#[derive(Debug, Deserialize)]
struct GenerationResult {
    generated_text: String,
    #[serde(default)]
    generated_token_count: Option<usize>,
    #[serde(default)]
    input_token_count: Option<usize>,
    #[serde(default)]
    stop_reason: Option<String>,
}
