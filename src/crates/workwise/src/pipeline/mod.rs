//! The workflow-analysis pipeline.
//!
//! Three stages run in sequence over one conversation:
//!
//! 1. **summarize** enumerates every workflow step and flags inefficiencies
//! 2. **score** rates each step from 1 to 10 with a cited metric
//! 3. **suggest** emits the final JSON array of steps
//!
//! The final reply goes through [`crate::extractor::extract`]. Stage failures
//! surface as [`PipelineError`](crate::error::PipelineError) tagged with the
//! stage; an unparsable final reply is reported in
//! [`PipelineOutcome::failure`] instead.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use workwise::agent::{DocumentLookupTool, ReactAgent, ToolSet};
//! use workwise::conversation::ConversationState;
//! use workwise::pipeline::Pipeline;
//!
//! let agent = Arc::new(ReactAgent::new(model));
//! let tools = ToolSet::new().with_tool(Arc::new(DocumentLookupTool::new(&document)));
//! let outcome = Pipeline::new(agent)
//!     .with_tools(tools)
//!     .run(&document, ConversationState::new())
//!     .await?;
//! for step in &outcome.steps {
//!     println!("{} ({})", step.step_summary, step.efficiency_score);
//! }
//! ```

mod orchestrator;
pub mod prompts;
pub mod retry;
mod stage;

pub use orchestrator::{Pipeline, PipelineOutcome};
pub use retry::{retry_with_backoff, RetryPolicy};
pub use stage::{
    count_enumerated_steps, default_stages, HandoffFn, StageDescriptor, StageInput, StageKind,
    StagePolicy,
};
