//! Common test utilities: scripted model clients with call counters.
#![allow(dead_code)]

use async_trait::async_trait;
use llm::{ChatModel, ChatRequest, ChatResponse, LlmError, Message};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use workwise::agent::{CompletionOptions, ModelClient, ToolSet};
use workwise::{ClientError, ConversationState};

/// What a [`ScriptedClient`] does on one call.
pub enum Reply {
    /// Append an assistant message with this text.
    Text(String),
    /// Fail the call.
    Fail(ClientError),
    /// Sleep, then append the text.
    Slow(Duration, String),
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Reply::Text(text.into())
    }
}

/// Model client that replays a script, one entry per call.
///
/// Records the role instructions of every call so tests can tell which stage
/// was invoked and how often.
pub struct ScriptedClient {
    script: Mutex<VecDeque<Reply>>,
    calls: AtomicUsize,
    instructions: Mutex<Vec<String>>,
}

impl ScriptedClient {
    pub fn new(script: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
            instructions: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Role instructions received, one entry per call.
    pub fn instructions(&self) -> Vec<String> {
        self.instructions.lock().unwrap().clone()
    }

    /// Number of calls made with `instructions`.
    pub fn calls_with(&self, instructions: &str) -> usize {
        self.instructions
            .lock()
            .unwrap()
            .iter()
            .filter(|seen| seen.as_str() == instructions)
            .count()
    }
}

#[async_trait]
impl ModelClient for ScriptedClient {
    async fn complete(
        &self,
        mut conversation: ConversationState,
        _tools: &ToolSet,
        role_instructions: &str,
        _options: &CompletionOptions,
    ) -> Result<ConversationState, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.instructions
            .lock()
            .unwrap()
            .push(role_instructions.to_string());

        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Reply::Text(text)) => {
                conversation.push(Message::assistant(text));
                Ok(conversation)
            }
            Some(Reply::Fail(err)) => Err(err),
            Some(Reply::Slow(delay, text)) => {
                tokio::time::sleep(delay).await;
                conversation.push(Message::assistant(text));
                Ok(conversation)
            }
            None => Err(ClientError::NoReply),
        }
    }
}

/// Chat model that replays canned messages and records every request.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<llm::Result<Message>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<llm::Result<Message>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn chat(&self, request: ChatRequest) -> llm::Result<ChatResponse> {
        self.requests.lock().unwrap().push(request);
        let next = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::InvalidResponse("script exhausted".into())));
        next.map(ChatResponse::from_message)
    }

    fn model_name(&self) -> &str {
        "scripted-model"
    }
}

pub fn rate_limited() -> ClientError {
    ClientError::Llm(LlmError::RateLimitExceeded("429 Too Many Requests".into()))
}

pub fn unavailable() -> ClientError {
    ClientError::Llm(LlmError::ServiceUnavailable("503 Service Unavailable".into()))
}

pub fn unauthorized() -> ClientError {
    ClientError::Llm(LlmError::AuthenticationError("401 Unauthorized".into()))
}

pub const SUMMARY: &str = "Company: Acme Logistics, 200 staff, freight.\n\n\
    Step 1: Orders arrive by email and are retyped into the ERP.\n\
    Step 2: A manager approves each invoice on paper.\n\
    Step 3: Shipments are tracked in a shared spreadsheet.";

pub const SCORES: &str = "Step 1: 3/10 (error rate: frequent retyping mistakes)\n\
    Step 2: 5/10 (cycle time: two-day approval wait)\n\
    Step 3: 6/10 (automation coverage: none)";

pub const FINAL_JSON: &str = r#"[JSON Output]
[
  {"step_summary": "Orders arrive by email and are manually retyped into the ERP system", "efficiency_score": 3, "explanation": "Retyping causes errors. Parse order emails automatically."},
  {"step_summary": "A manager approves every invoice on paper before payment is released", "efficiency_score": 5, "explanation": "Two-day wait. Move approvals to an e-signature workflow."},
  {"step_summary": "Shipments are tracked by hand in a shared spreadsheet by dispatch", "efficiency_score": 6.5, "explanation": "No alerts. Use carrier tracking integrations."}
]"#;

pub const DOCUMENT: &str = "Acme Logistics is a 200 person freight company in Rotterdam.\n\n\
    Orders arrive by email and the sales team retypes them into the ERP.\n\n\
    Every invoice is printed and approved on paper by a manager.\n\n\
    Dispatch tracks shipments in a shared spreadsheet.";

/// The three canned stage replies of a successful run.
pub fn happy_script() -> Vec<Reply> {
    vec![Reply::text(SUMMARY), Reply::text(SCORES), Reply::text(FINAL_JSON)]
}
