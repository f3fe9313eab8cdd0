//! Remote LLM provider implementations.
//!
//! These clients talk to hosted completion APIs over HTTPS and authenticate
//! with a bearer token from [`RemoteLlmConfig`](crate::RemoteLlmConfig).
//!
//! # Providers
//!
//! - **watsonx** - IBM watsonx.ai, chat or text-generation API
//! - **OpenAI** - OpenAI and any `/chat/completions`-compatible gateway

mod completions;
pub mod openai;
pub mod watsonx;

pub use openai::OpenAiClient;
pub use watsonx::{WatsonxApi, WatsonxClient};

use crate::config::RemoteLlmConfig;
use crate::error::{LlmError, Result};
use reqwest::Client;

/// Build the shared HTTP client for a provider.
pub(crate) fn http_client(config: &RemoteLlmConfig) -> Result<Client> {
    Client::builder()
        .timeout(config.timeout)
        .build()
        .map_err(|e| LlmError::ConfigError(format!("Failed to create HTTP client: {}", e)))
}

/// Send a JSON request and decode the reply, mapping HTTP failures.
pub(crate) async fn send_json<T: serde::de::DeserializeOwned>(
    provider: &str,
    request: reqwest::RequestBuilder,
) -> Result<T> {
    let response = request.send().await.map_err(LlmError::from_transport)?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        tracing::warn!(provider, status = status.as_u16(), "provider returned error status");
        return Err(LlmError::from_status(provider, status, error_text));
    }

    response
        .json()
        .await
        .map_err(|e| LlmError::InvalidResponse(e.to_string()))
}
