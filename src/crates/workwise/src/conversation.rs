//! Conversation state threaded through an analysis run.

use crate::error::ConversationError;
use llm::{Message, MessageRole};
use serde::{Deserialize, Serialize};

/// Ordered, append-only message history.
///
/// Each pipeline run owns its state and hands it from stage to stage by
/// value. Messages can be added but never removed or reordered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationState {
    messages: Vec<Message>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a conversation from a caller's chat history.
    pub fn from_turns(turns: &[ChatTurn]) -> Result<Self, ConversationError> {
        let messages = turns
            .iter()
            .enumerate()
            .map(|(index, turn)| {
                let role = MessageRole::parse(&turn.role).ok_or_else(|| ConversationError::UnknownRole {
                    index,
                    role: turn.role.clone(),
                })?;
                Ok(Message::new(role, turn.content.clone()))
            })
            .collect::<Result<Vec<_>, ConversationError>>()?;
        Ok(Self { messages })
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn extend(&mut self, messages: impl IntoIterator<Item = Message>) {
        self.messages.extend(messages);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Text of the most recent message.
    pub fn last_text(&self) -> Option<&str> {
        self.messages.last().map(|m| m.content.as_str())
    }

    /// Text of the most recent assistant message.
    pub fn last_assistant_text(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::Assistant)
            .map(|m| m.content.as_str())
    }

    /// Messages appended after the first `from` entries.
    pub fn since(&self, from: usize) -> &[Message] {
        &self.messages[from.min(self.messages.len())..]
    }
}

impl From<Vec<Message>> for ConversationState {
    fn from(messages: Vec<Message>) -> Self {
        Self { messages }
    }
}

/// One role/content pair of a caller-supplied chat history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

impl ChatTurn {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }
}
