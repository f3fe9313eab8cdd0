//! Command-line interface for the `workwise` binary.

pub mod handlers;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// workwise - analyze business workflows with LLM agents
#[derive(Parser, Debug)]
#[command(name = "workwise")]
#[command(version = crate::version::VERSION)]
#[command(about = "Break a business workflow into steps, score their efficiency and suggest improvements", long_about = None)]
pub struct Cli {
    /// Config file layered on top of the user and project configs
    #[arg(long, global = true, env = "WORKWISE_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid output format: {} (expected text or json)", s)),
        }
    }
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze a workflow document into scored steps
    Analyze {
        /// Plain-text workflow document
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// JSON chat history (array of {"role", "content"}) to prepend
        #[arg(long, value_name = "FILE")]
        history: Option<PathBuf>,

        /// Output format: text, json
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Ask the workflow assistant a question
    Chat {
        /// The question
        #[arg(value_name = "MESSAGE")]
        message: String,

        /// JSON chat history the question continues
        #[arg(long, value_name = "FILE")]
        history: Option<PathBuf>,
    },

    /// Show the resolved configuration
    Config,

    /// Show version information
    Version,
}
