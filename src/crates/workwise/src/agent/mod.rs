//! Model client contract and the tool-using agent that implements it.
//!
//! The pipeline only needs [`ModelClient::complete`]: given a conversation,
//! some tools and role instructions, return the conversation extended with at
//! least one new trailing message. [`ReactAgent`] fulfils it over any
//! [`llm::ChatModel`] with a reason/act loop.

mod react;
mod tools;

pub use react::ReactAgent;
pub use tools::{DocumentLookupTool, Tool, ToolError, ToolSet, WikipediaSearchTool};

use crate::conversation::ConversationState;
use crate::error::ClientError;
use async_trait::async_trait;
use std::time::Duration;
use uuid::Uuid;

/// Per-call options for a model client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionOptions {
    /// Identifies the run in logs.
    pub thread_id: String,

    /// Maximum number of model calls within one completion.
    pub recursion_limit: usize,

    /// Deadline for the whole completion, tool calls included.
    pub timeout: Option<Duration>,
}

impl CompletionOptions {
    pub const DEFAULT_RECURSION_LIMIT: usize = 10;

    pub fn new(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            ..Self::default()
        }
    }

    pub fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = limit;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            thread_id: Uuid::new_v4().to_string(),
            recursion_limit: Self::DEFAULT_RECURSION_LIMIT,
            timeout: None,
        }
    }
}

/// Something that can extend a conversation with a model's answer.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Run the model over `conversation` and return it with the new messages
    /// appended. The last message of the result is the final answer.
    async fn complete(
        &self,
        conversation: ConversationState,
        tools: &ToolSet,
        role_instructions: &str,
        options: &CompletionOptions,
    ) -> Result<ConversationState, ClientError>;
}
