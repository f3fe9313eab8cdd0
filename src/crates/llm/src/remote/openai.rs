//! OpenAI-compatible client implementation.
//!
//! Works against OpenAI itself and any gateway exposing `/chat/completions`.
//!
//! # Example
//!
//! ```rust,ignore
//! use llm::remote::OpenAiClient;
//! use llm::{ChatModel, ChatRequest, Message, RemoteLlmConfig};
//!
//! let config = RemoteLlmConfig::from_env(
//!     "OPENAI_API_KEY",
//!     "https://api.openai.com/v1",
//!     "gpt-4o-mini",
//! )?;
//! let client = OpenAiClient::new(config)?;
//!
//! let request = ChatRequest::new(vec![Message::human("Hello!")]);
//! let response = client.chat(request).await?;
//! ```

use super::completions::{into_chat_response, to_wire_message, to_wire_tools, WireCompletion, WireMessage};
use crate::chat::{ChatModel, ChatRequest, ChatResponse};
use crate::config::RemoteLlmConfig;
use crate::error::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

const PROVIDER: &str = "openai";

/// OpenAI API client.
#[derive(Clone)]
pub struct OpenAiClient {
    config: RemoteLlmConfig,
    client: Client,
}

impl OpenAiClient {
    /// Create a new OpenAI client with the given configuration.
    pub fn new(config: RemoteLlmConfig) -> Result<Self> {
        let client = super::http_client(&config)?;
        Ok(Self { config, client })
    }

    fn build_request(&self, request: &ChatRequest) -> OpenAiRequest {
        OpenAiRequest {
            model: self.config.model.clone(),
            messages: request.messages.iter().map(to_wire_message).collect(),
            temperature: request.config.temperature,
            max_tokens: request.config.max_tokens,
            top_p: request.config.top_p,
            frequency_penalty: request.config.frequency_penalty,
            presence_penalty: request.config.presence_penalty,
            stop: if request.config.stop_sequences.is_empty() {
                None
            } else {
                Some(request.config.stop_sequences.clone())
            },
            tools: to_wire_tools(&request.config.tools),
            stream: false,
        }
    }
}

#[async_trait]
impl ChatModel for OpenAiClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let url = format!("{}/chat/completions", self.config.trimmed_base_url());
        let body = self.build_request(&request);

        tracing::debug!(
            provider = PROVIDER,
            model = %self.config.model,
            messages = body.messages.len(),
            "sending chat completion"
        );

        let req = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&body);

        let completion: WireCompletion = super::send_json(PROVIDER, req).await?;
        into_chat_response(PROVIDER, completion)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frequency_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    presence_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Value>>,
    stream: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::ToolDefinition;
    use crate::message::Message;
    use std::time::Duration;

    fn client() -> OpenAiClient {
        let config = RemoteLlmConfig::new("test-key", "https://api.openai.com/v1/", "gpt-4o-mini");
        OpenAiClient::new(config).unwrap()
    }

    #[test]
    fn test_client_creation() {
        let client = client();
        assert_eq!(client.model_name(), "gpt-4o-mini");
    }

    #[test]
    fn test_config_with_custom_timeout() {
        let config = RemoteLlmConfig::new("test-key", "https://api.openai.com/v1", "gpt-4")
            .with_timeout(Duration::from_secs(10));
        let client = OpenAiClient::new(config).unwrap();
        assert_eq!(client.config.timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_request_body_all_roles() {
        let request = ChatRequest::new(vec![
            Message::system("You are helpful"),
            Message::human("Hello"),
            Message::assistant("Hi there!"),
            Message::tool("42", "call_1"),
        ]);
        let body = client().build_request(&request);
        let roles: Vec<&str> = body.messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "tool"]);
        assert_eq!(body.messages[3].tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(body.temperature, Some(0.0));
        assert!(body.tools.is_none());
        assert!(body.stop.is_none());
    }

    #[test]
    fn test_request_body_with_tools() {
        let request = ChatRequest::new(vec![Message::human("Find it")])
            .with_tools(vec![ToolDefinition::new("lookup", "Search the document")])
            .with_stop_sequences(vec!["END".into()]);
        let body = client().build_request(&request);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["tools"][0]["type"], "function");
        assert_eq!(json["stop"][0], "END");
        assert_eq!(json["stream"], false);
    }
}
