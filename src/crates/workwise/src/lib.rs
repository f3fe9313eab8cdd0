//! workwise - business workflow analysis with tool-using LLM agents
//!
//! A submitted workflow document goes through three sequential agent stages:
//! a summarizer enumerates the process steps, a scorer rates each step's
//! efficiency from 1 to 10, and a suggester emits the final JSON array of
//! steps with improvement suggestions. The array is recovered from the
//! model's free-form reply by [`extractor::extract`].
//!
//! # Architecture
//!
//! - [`agent`] - the model client contract and a ReAct agent over
//!   [`llm::ChatModel`], plus the document lookup tool
//! - [`pipeline`] - stage descriptors, retry policy and the stage driver
//! - [`extractor`] - bracket-matching JSON array recovery
//! - [`service`] - `analyze` and `chat`, which never fail at the caller
//! - [`config`] - layered TOML configuration
//!
//! # Example
//!
//! ```rust,ignore
//! use workwise::{ConfigLoader, WorkflowAnalyzer};
//!
//! let config = ConfigLoader::new().load().await?;
//! let analyzer = WorkflowAnalyzer::from_config(&config)?;
//! let report = analyzer.analyze(&document, &[]).await;
//! match report.error {
//!     None => println!("{} steps", report.steps.len()),
//!     Some(failure) => eprintln!("no steps: {}", failure.reason),
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod config;
pub mod conversation;
pub mod error;
pub mod extractor;
pub mod pipeline;
pub mod service;
pub mod step;
pub mod version;

pub use agent::{CompletionOptions, ModelClient, ReactAgent, Tool, ToolSet, WikipediaSearchTool};
pub use config::{ConfigLoader, WorkwiseConfig};
pub use conversation::{ChatTurn, ConversationState};
pub use error::{
    ClientError, ConfigError, ExtractionError, ExtractionErrorKind, PipelineError, Result,
    StageFailure, WorkwiseError,
};
pub use extractor::extract;
pub use pipeline::{Pipeline, PipelineOutcome, RetryPolicy, StageKind};
pub use service::{AnalysisFailure, AnalysisReport, ChatEnvelope, FailureReason, WorkflowAnalyzer};
pub use step::{ScoreBand, WorkflowStep};
pub use version::{full_version as version_info, short_version};
