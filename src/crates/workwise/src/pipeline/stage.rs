//! Stage descriptors: what each step of the analysis chain asks the model.

use super::prompts;
use super::retry::RetryPolicy;
use crate::conversation::ConversationState;
use llm::Message;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::OnceLock;
use std::time::Duration;

/// The three analysis stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    Summarize,
    Score,
    Suggest,
}

impl StageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::Summarize => "summarize",
            StageKind::Score => "score",
            StageKind::Suggest => "suggest",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a stage's handoff builder sees.
#[derive(Debug, Clone, Copy)]
pub struct StageInput<'a> {
    /// The submitted document / company description.
    pub company_context: &'a str,

    /// Conversation as left by the previous stage.
    pub conversation: &'a ConversationState,

    /// Number of steps the summarizer enumerated, once known.
    pub expected_steps: Option<usize>,
}

/// Builds the messages appended to the conversation before a stage runs.
pub type HandoffFn = fn(&StageInput<'_>) -> Vec<Message>;

/// Retry and deadline settings for a stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StagePolicy {
    pub retry: RetryPolicy,

    /// Deadline covering every attempt of the stage.
    pub timeout: Option<Duration>,
}

impl StagePolicy {
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// One stage of the pipeline.
#[derive(Clone)]
pub struct StageDescriptor {
    pub kind: StageKind,
    pub instructions: String,
    pub handoff: HandoffFn,
    pub policy: StagePolicy,
}

impl StageDescriptor {
    pub fn new(kind: StageKind, instructions: impl Into<String>, handoff: HandoffFn) -> Self {
        Self {
            kind,
            instructions: instructions.into(),
            handoff,
            policy: StagePolicy::default(),
        }
    }

    /// Enumerates every workflow step and flags inefficiencies.
    pub fn summarizer() -> Self {
        Self::new(
            StageKind::Summarize,
            prompts::SUMMARIZER_INSTRUCTIONS,
            prompts::summarizer_handoff,
        )
    }

    /// Scores each step independently.
    pub fn scorer() -> Self {
        Self::new(StageKind::Score, prompts::SCORER_INSTRUCTIONS, prompts::scorer_handoff)
    }

    /// Produces the final JSON array.
    pub fn suggester() -> Self {
        Self::new(
            StageKind::Suggest,
            prompts::SUGGESTER_INSTRUCTIONS,
            prompts::suggester_handoff,
        )
    }

    pub fn with_policy(mut self, policy: StagePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }
}

impl fmt::Debug for StageDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageDescriptor")
            .field("kind", &self.kind)
            .field("instructions_len", &self.instructions.len())
            .field("policy", &self.policy)
            .finish()
    }
}

/// summarize → score → suggest.
pub fn default_stages() -> Vec<StageDescriptor> {
    vec![
        StageDescriptor::summarizer(),
        StageDescriptor::scorer(),
        StageDescriptor::suggester(),
    ]
}

fn step_heading_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?mi)^[\s>#*\-]*step\s*(\d{1,3})\b")
            .expect("step heading pattern is a valid regex")
    })
}

fn numbered_item_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?m)^[\s>#*]*(\d{1,3})\s*(?:\*\*)?[.):](?:\s|$)")
            .expect("numbered item pattern is a valid regex")
    })
}

fn distinct_numbers(pattern: &Regex, text: &str) -> BTreeSet<u32> {
    pattern
        .captures_iter(text)
        .filter_map(|caps| caps.get(1)?.as_str().parse().ok())
        .collect()
}

/// Count the distinct numbered steps in a summarizer reply.
///
/// `Step N` headings (`Step 3:`, `**Step 3**:`, `## Step 3`) win whenever the
/// reply has any. Otherwise a numbered list (`3.` or `3)` followed by
/// whitespace) is counted. Bullets that open with a figure, like
/// `- 12.5% of orders`, are never steps. Returns `None` when the text
/// enumerates nothing.
pub fn count_enumerated_steps(text: &str) -> Option<usize> {
    let headings = distinct_numbers(step_heading_pattern(), text);
    let numbers = if headings.is_empty() {
        distinct_numbers(numbered_item_pattern(), text)
    } else {
        headings
    };
    (!numbers.is_empty()).then_some(numbers.len())
}
