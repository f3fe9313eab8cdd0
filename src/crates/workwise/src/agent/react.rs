//! ReAct agent: alternate model calls and tool execution until the model
//! answers without requesting tools.

use super::{CompletionOptions, ModelClient, ToolSet};
use crate::conversation::ConversationState;
use crate::error::ClientError;
use async_trait::async_trait;
use llm::{ChatConfig, ChatModel, ChatRequest, Message, MessageRole, ToolCall};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info_span, warn, Instrument};

/// Tool-using agent over a [`ChatModel`].
///
/// System messages found in the incoming conversation are folded into the
/// role instructions, which go to the model as one leading system message.
/// Tool failures never fail the call; they come back to the model as tool
/// messages shaped `{"error": ..., "status": "error"}`.
#[derive(Clone)]
pub struct ReactAgent {
    model: Arc<dyn ChatModel>,
    config: ChatConfig,
}

impl ReactAgent {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self {
            model,
            config: ChatConfig::default(),
        }
    }

    /// Generation parameters for every model call.
    pub fn with_config(mut self, config: ChatConfig) -> Self {
        self.config = config;
        self
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    fn request_messages(instructions: &str, conversation: &ConversationState) -> Vec<Message> {
        let mut system = instructions.to_string();
        for msg in conversation.messages() {
            if msg.role == MessageRole::System {
                if !system.is_empty() {
                    system.push_str("\n\n");
                }
                system.push_str(&msg.content);
            }
        }

        let mut messages = Vec::with_capacity(conversation.len() + 1);
        if !system.is_empty() {
            messages.push(Message::system(system));
        }
        messages.extend(
            conversation
                .messages()
                .iter()
                .filter(|m| m.role != MessageRole::System)
                .cloned(),
        );
        messages
    }

    async fn run_tool(tools: &ToolSet, call: &ToolCall) -> Message {
        let content = match tools.execute(&call.name, call.arguments.clone()).await {
            Ok(Value::String(text)) => text,
            Ok(other) => other.to_string(),
            Err(e) => {
                warn!(tool = %call.name, error = %e, "tool call failed");
                json!({"error": e.to_string(), "status": "error"}).to_string()
            }
        };
        Message::tool(content, call.id.clone()).with_name(call.name.clone())
    }

    async fn run_loop(
        &self,
        mut conversation: ConversationState,
        tools: &ToolSet,
        role_instructions: &str,
        recursion_limit: usize,
    ) -> Result<ConversationState, ClientError> {
        let definitions = tools.definitions();

        for model_call in 1..=recursion_limit {
            let request = ChatRequest::new(Self::request_messages(role_instructions, &conversation))
                .with_config(self.config.clone())
                .with_tools(definitions.clone());

            let response = self.model.chat(request).await?;
            let reply = response.message;
            debug!(
                model_call,
                tool_calls = reply.tool_calls.as_ref().map_or(0, Vec::len),
                "model replied"
            );

            let calls = reply.tool_calls.clone().unwrap_or_default();
            conversation.push(reply);

            if calls.is_empty() {
                return Ok(conversation);
            }

            for call in &calls {
                conversation.push(Self::run_tool(tools, call).await);
            }
        }

        Err(ClientError::RecursionLimit(recursion_limit))
    }
}

#[async_trait]
impl ModelClient for ReactAgent {
    async fn complete(
        &self,
        conversation: ConversationState,
        tools: &ToolSet,
        role_instructions: &str,
        options: &CompletionOptions,
    ) -> Result<ConversationState, ClientError> {
        let span = info_span!(
            "agent",
            thread_id = %options.thread_id,
            model = %self.model.model_name()
        );
        let started = Instant::now();
        let run = self.run_loop(conversation, tools, role_instructions, options.recursion_limit);

        let result = match options.timeout {
            Some(limit) => tokio::time::timeout(limit, run.instrument(span.clone()))
                .await
                .map_err(|_| ClientError::Timeout(limit))?,
            None => run.instrument(span.clone()).await,
        };

        span.in_scope(|| {
            debug!(
                elapsed_ms = started.elapsed().as_millis() as u64,
                ok = result.is_ok(),
                "agent call finished"
            )
        });
        result
    }
}
