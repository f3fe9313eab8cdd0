//! workwise CLI - entry point

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use workwise::cli::{handlers, Cli, Commands};
use workwise::config::{LogFormat, LoggingConfig};
use workwise::ConfigLoader;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is not an error
    let dotenv = dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.with_explicit_path(path);
    }
    let config = loader.load().await.context("failed to load configuration")?;

    init_tracing(cli.log_level.as_deref(), &config.logging);
    if let Some(path) = dotenv {
        tracing::debug!(path = %path.display(), "Loaded .env");
    }

    match cli.command {
        Commands::Analyze {
            file,
            history,
            format,
        } => {
            let found = handlers::handle_analyze(&config, &file, history.as_deref(), format)
                .await
                .with_context(|| format!("failed to analyze {}", file.display()))?;
            if !found {
                std::process::exit(1);
            }
        }
        Commands::Chat { message, history } => {
            handlers::handle_chat(&config, message, history.as_deref())
                .await
                .context("chat failed")?;
        }
        Commands::Config => handlers::handle_config(&config),
        Commands::Version => handlers::handle_version(),
    }

    Ok(())
}

/// RUST_LOG wins over `--log-level`, which wins over `logging.level`.
fn init_tracing(flag: Option<&str>, logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = flag.unwrap_or(logging.level.as_str());
        EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match logging.format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
    }
}
