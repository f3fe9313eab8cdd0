//! Chat model abstractions and hosted LLM providers for workwise.
//!
//! This crate defines the provider-agnostic [`ChatModel`] trait together with
//! the message, request and response types that flow through it, plus concrete
//! clients for hosted completion endpoints.
//!
//! # Remote Providers
//!
//! - **watsonx.ai** - IBM hosted foundation models, through either the chat API
//!   (tool calling capable) or the older text generation API
//! - **OpenAI-compatible** - any gateway exposing `/chat/completions`
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use llm::remote::{WatsonxApi, WatsonxClient};
//! use llm::{ChatModel, ChatRequest, Message, RemoteLlmConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RemoteLlmConfig::from_env(
//!         "WATSONX_TOKEN",
//!         "https://us-south.ml.cloud.ibm.com",
//!         "meta-llama/llama-3-3-70b-instruct",
//!     )?
//!     .with_space_id("825b15ec-b09f-413c-80ed-4e7fd3fc0bb0");
//!     let client = WatsonxClient::new(config, WatsonxApi::Chat)?;
//!
//!     let request = ChatRequest::new(vec![
//!         Message::human("Name two metrics for workflow efficiency."),
//!     ])
//!     .with_max_tokens(500);
//!
//!     let response = client.chat(request).await?;
//!     println!("{}", response.message.content);
//!     Ok(())
//! }
//! ```

pub mod chat;
pub mod config;
pub mod error;
pub mod message;

#[cfg(feature = "remote")]
pub mod remote;

// Re-export commonly used types
pub use chat::{ChatConfig, ChatModel, ChatRequest, ChatResponse, ToolDefinition, UsageMetadata};
pub use config::RemoteLlmConfig;
pub use error::{LlmError, Result};
pub use message::{Message, MessageRole, ToolCall};
