//! Layered configuration: defaults, user file, project file, explicit file,
//! then environment.

mod loader;
mod schema;

pub use loader::ConfigLoader;
pub use schema::{
    LlmConfig, LogFormat, LoggingConfig, PipelineConfig, Provider, ToolsConfig, WorkwiseConfig,
};
