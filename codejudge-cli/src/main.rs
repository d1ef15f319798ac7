//! codejudge CLI - run and inspect translation evaluations

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use codejudge_core::config::CodeJudgeConfig;
use codejudge_core::orchestrator::{EvalRequest, Orchestrator, TaskLifecycle, progress_channel};
use codejudge_core::scoring::ScoringCascade;

#[derive(Parser)]
#[command(name = "codejudge")]
#[command(about = "Judge code translations produced by a remote agent", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a participant and print the result artifact as JSON
    Evaluate {
        /// Evaluation request file (JSON)
        #[arg(short, long)]
        request: PathBuf,

        /// Configuration file; defaults to codejudge.toml plus environment
        #[arg(short, long, env = "CODEJUDGE_CONFIG_PATH")]
        config: Option<PathBuf>,
    },
    /// Check a request without contacting anyone
    Validate {
        /// Evaluation request file (JSON)
        #[arg(short, long)]
        request: PathBuf,
    },
    /// List scoring backends in attempt order
    Backends {
        #[arg(short, long, env = "CODEJUDGE_CONFIG_PATH")]
        config: Option<PathBuf>,
    },
    /// Version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Version => {
            println!("codejudge {}", env!("CARGO_PKG_VERSION"));
            println!("codejudge-core {}", codejudge_core::VERSION);
        }
        Commands::Validate { request } => {
            let request = read_request(&request)?;
            let validated = request.validate()?;
            println!(
                "ok: role {} at {}, {} case(s), {} -> {}",
                validated.role,
                validated.endpoint,
                validated.cases.len(),
                validated.source_language,
                validated.target_language
            );
        }
        Commands::Backends { config } => {
            let config = load_config(config.as_deref())?;
            let cascade = ScoringCascade::from_config(&config.scoring)?;
            for (position, backend) in cascade.backends().enumerate() {
                let output = if backend.supports_structured_output {
                    "structured"
                } else {
                    "text"
                };
                println!("{}. {} ({})", position + 1, backend.name, output);
            }
        }
        Commands::Evaluate { request, config } => {
            let request = read_request(&request)?;
            let config = load_config(config.as_deref())?;
            let orchestrator = Orchestrator::from_config(&config)?;

            let (sink, mut rx) = progress_channel(64);
            let printer = tokio::spawn(async move {
                while let Some(event) = rx.recv().await {
                    match event.state() {
                        Some(TaskLifecycle::Failed) => tracing::error!("{}", event.describe()),
                        _ => tracing::info!("{}", event.describe()),
                    }
                }
            });

            let outcome = orchestrator.run(&request, &sink).await;
            drop(sink);
            printer.await.context("progress printer panicked")?;

            let result = outcome?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}

fn read_request(path: &Path) -> Result<EvalRequest> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read request {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("invalid request JSON in {}", path.display()))
}

fn load_config(path: Option<&Path>) -> Result<CodeJudgeConfig> {
    let config = match path {
        Some(path) => CodeJudgeConfig::from_file(path)?,
        None => CodeJudgeConfig::load()?,
    };
    Ok(config)
}
