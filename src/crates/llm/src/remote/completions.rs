//! Wire types shared by chat-completion style APIs.
//!
//! OpenAI's `/chat/completions` and the watsonx chat endpoint agree on the
//! message, tool and choice shapes, so both clients convert through here.

use crate::chat::{ChatResponse, ToolDefinition, UsageMetadata};
use crate::error::{LlmError, Result};
use crate::message::{Message, MessageRole, ToolCall};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct WireMessage {
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<WireToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct WireToolCall {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type", default = "function_type")]
    pub kind: String,
    pub function: WireFunction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct WireFunction {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireChoice {
    pub message: WireMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireUsage {
    #[serde(default)]
    pub prompt_tokens: usize,
    #[serde(default)]
    pub completion_tokens: usize,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireCompletion {
    #[serde(default)]
    pub choices: Vec<WireChoice>,
    #[serde(default)]
    pub usage: Option<WireUsage>,
}

fn function_type() -> String {
    "function".to_string()
}

pub(crate) fn to_wire_message(msg: &Message) -> WireMessage {
    let tool_calls = msg.tool_calls.as_ref().map(|calls| {
        calls
            .iter()
            .map(|call| WireToolCall {
                id: Some(call.id.clone()),
                kind: function_type(),
                function: WireFunction {
                    name: call.name.clone(),
                    arguments: call.arguments_string(),
                },
            })
            .collect()
    });

    WireMessage {
        role: msg.role.as_wire_str().to_string(),
        content: Some(msg.content.clone()),
        name: msg.name.clone(),
        tool_calls,
        tool_call_id: msg.tool_call_id.clone(),
    }
}

pub(crate) fn to_wire_tools(tools: &[ToolDefinition]) -> Option<Vec<Value>> {
    if tools.is_empty() {
        None
    } else {
        Some(tools.iter().map(ToolDefinition::to_function_json).collect())
    }
}

/// Turn the first choice of a completion into a [`ChatResponse`].
pub(crate) fn into_chat_response(provider: &str, completion: WireCompletion) -> Result<ChatResponse> {
    let choice = completion.choices.into_iter().next().ok_or_else(|| {
        LlmError::InvalidResponse(format!("{} response contained no choices", provider))
    })?;

    let calls: Vec<ToolCall> = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|call| ToolCall::from_wire(call.id, call.function.name, &call.function.arguments))
        .collect();

    let message = Message::new(
        MessageRole::Assistant,
        choice.message.content.unwrap_or_default(),
    )
    .with_tool_calls(calls);

    Ok(ChatResponse {
        message,
        usage: completion
            .usage
            .map(|u| UsageMetadata::new(u.prompt_tokens, u.completion_tokens)),
        finish_reason: choice.finish_reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_assistant_tool_calls_round_trip_to_wire() {
        let msg = Message::assistant("")
            .with_tool_calls(vec![ToolCall::new("lookup", json!({"query": "invoice"})).with_id("c1")]);
        let wire = to_wire_message(&msg);
        let calls = wire.tool_calls.unwrap();
        assert_eq!(calls[0].id.as_deref(), Some("c1"));
        assert_eq!(calls[0].kind, "function");
        assert_eq!(calls[0].function.arguments, r#"{"query":"invoice"}"#);
    }

    #[test]
    fn test_completion_with_tool_calls() {
        let completion: WireCompletion = serde_json::from_value(json!({
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_9",
                        "type": "function",
                        "function": {"name": "lookup", "arguments": "{\"query\":\"approvals\"}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
        }))
        .unwrap();

        let response = into_chat_response("test", completion).unwrap();
        assert!(response.message.has_tool_calls());
        assert_eq!(response.message.content, "");
        let call = &response.message.tool_calls.as_ref().unwrap()[0];
        assert_eq!(call.id, "call_9");
        assert_eq!(call.arguments, json!({"query": "approvals"}));
        assert_eq!(response.finish_reason.as_deref(), Some("tool_calls"));
        assert_eq!(response.usage.unwrap().total_tokens, 15);
    }

    #[test]
    fn test_empty_choices_is_invalid() {
        let completion: WireCompletion = serde_json::from_value(json!({"choices": []})).unwrap();
        let err = into_chat_response("test", completion).unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse(_)));
    }

    #[test]
    fn test_no_tools_serializes_nothing() {
        assert!(to_wire_tools(&[]).is_none());
        let tools = to_wire_tools(&[ToolDefinition::new("lookup", "Search")]).unwrap();
        assert_eq!(tools[0]["function"]["name"], "lookup");
    }
}
