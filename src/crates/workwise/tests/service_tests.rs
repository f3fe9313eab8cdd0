//! End-to-end tests: analyzer → pipeline → ReAct agent → scripted chat model.

mod common;

use common::{Reply, ScriptedClient, ScriptedModel};
use llm::{LlmError, Message, MessageRole, ToolCall};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use workwise::pipeline::prompts::{ASSISTANT_INSTRUCTIONS, SUMMARIZER_INSTRUCTIONS};
use workwise::{ChatTurn, FailureReason, ReactAgent, StageKind, WikipediaSearchTool, WorkflowAnalyzer};

fn lookup(query: &str) -> Message {
    Message::assistant("").with_tool_calls(vec![
        ToolCall::new("document_lookup", json!({ "query": query })).with_id("call-1")
    ])
}

#[tokio::test]
async fn test_analyze_with_document_lookup() {
    let model = ScriptedModel::new(vec![
        Ok(lookup("invoice approved on paper")),
        Ok(Message::assistant(common::SUMMARY)),
        Ok(Message::assistant(common::SCORES)),
        Ok(Message::assistant(common::FINAL_JSON)),
    ]);
    let analyzer = WorkflowAnalyzer::new(Arc::new(ReactAgent::new(model.clone())));

    let report = analyzer
        .analyze(common::DOCUMENT, &[ChatTurn::user("Please review our order process.")])
        .await;

    assert!(report.is_success(), "unexpected failure: {:?}", report.error);
    assert_eq!(report.steps.len(), 3);
    assert!(report.steps[0].step_summary.starts_with("Orders arrive by email"));

    let requests = model.requests();
    assert_eq!(requests.len(), 4);

    // the summarizer sees its instructions, the caller's history and the document
    let first = &requests[0];
    assert_eq!(first.messages[0].role, MessageRole::System);
    assert_eq!(first.messages[0].content, SUMMARIZER_INSTRUCTIONS);
    assert_eq!(first.messages[1].content, "Please review our order process.");
    assert!(first.messages[2].content.contains("Acme Logistics"));
    assert!(first.config.tools.iter().any(|t| t.name == "document_lookup"));

    // the lookup result is fed back before the summarizer answers
    let tool_reply = requests[1]
        .messages
        .iter()
        .find(|m| m.role == MessageRole::Tool)
        .expect("tool message in second request");
    assert!(tool_reply.content.contains("approved on paper"));

    // the suggester sees the whole thread
    let last = &requests[3];
    assert!(last.messages.iter().any(|m| m.content == common::SUMMARY));
    assert!(last.messages.iter().any(|m| m.content == common::SCORES));
    assert!(last.messages.last().unwrap().content.contains("step_summary"));
}

#[tokio::test]
async fn test_analyze_reports_failing_stage() {
    let model = ScriptedModel::new(vec![
        Ok(Message::assistant(common::SUMMARY)),
        Err(LlmError::AuthenticationError("401 Unauthorized".into())),
    ]);
    let analyzer = WorkflowAnalyzer::new(Arc::new(ReactAgent::new(model.clone())));

    let report = analyzer.analyze(common::DOCUMENT, &[]).await;

    assert!(report.steps.is_empty());
    let failure = report.error.unwrap();
    assert_eq!(failure.reason, FailureReason::StageFailed);
    assert_eq!(failure.stage, Some(StageKind::Score));
    assert!(failure.message.contains("score stage failed"));
    assert_eq!(model.requests().len(), 2);
}

#[tokio::test]
async fn test_analyze_reports_extraction_reason() {
    let client = ScriptedClient::new(vec![
        Reply::text(common::SUMMARY),
        Reply::text(common::SCORES),
        Reply::text("I could not produce the JSON, sorry."),
    ]);
    let report = WorkflowAnalyzer::new(client).analyze(common::DOCUMENT, &[]).await;

    assert!(report.steps.is_empty());
    assert_eq!(report.error.unwrap().reason, FailureReason::NoArrayFound);
}

#[tokio::test]
async fn test_chat_uses_assistant_persona() {
    let client = ScriptedClient::new(vec![Reply::text(
        "Hi, I am the WorkWise AI assistant. How can I help you?",
    )]);
    let analyzer = WorkflowAnalyzer::new(client.clone());

    let envelope = analyzer
        .chat(&[
            ChatTurn::user("hello"),
            ChatTurn::new("assistant", "Hello!"),
            ChatTurn::user("who are you?"),
        ])
        .await;

    assert_eq!(envelope.choices.len(), 1);
    assert_eq!(envelope.choices[0].index, 0);
    assert_eq!(envelope.choices[0].message.role, "assistant");
    assert!(envelope.content().contains("WorkWise AI assistant"));
    assert_eq!(client.instructions(), vec![ASSISTANT_INSTRUCTIONS]);
}

#[tokio::test]
async fn test_chat_runs_web_search_tool() {
    let model = ScriptedModel::new(vec![
        Ok(Message::assistant("").with_tool_calls(vec![ToolCall::new(
            WikipediaSearchTool::NAME,
            json!({ "query": "three-way invoice matching" }),
        )
        .with_id("call-1")])),
        Ok(Message::assistant("Three-way matching compares the PO, receipt and invoice.")),
    ]);
    let search = WikipediaSearchTool::new(Duration::from_secs(2))
        .unwrap()
        .with_url("http://127.0.0.1:9/w/api.php");
    let analyzer = WorkflowAnalyzer::new(Arc::new(ReactAgent::new(model.clone())))
        .with_chat_tool(Arc::new(search));

    let envelope = analyzer
        .chat(&[ChatTurn::user("How do I automate invoice matching?")])
        .await;

    assert_eq!(
        envelope.content(),
        "Three-way matching compares the PO, receipt and invoice."
    );

    let requests = model.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].messages[0].content, ASSISTANT_INSTRUCTIONS);
    assert!(requests[0]
        .config
        .tools
        .iter()
        .any(|t| t.name == WikipediaSearchTool::NAME));

    // the search ran and its failure went back to the model as a tool message
    let tool_reply = requests[1]
        .messages
        .iter()
        .find(|m| m.role == MessageRole::Tool)
        .expect("tool message in second request");
    assert_eq!(tool_reply.name.as_deref(), Some(WikipediaSearchTool::NAME));
    assert!(tool_reply.content.contains("search request failed"));
}
