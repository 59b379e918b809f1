//! Operator CLI: replay raw upstream captures and inspect configuration.

#![allow(clippy::print_stdout, reason = "CLI tool outputs to stdout")]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod replay;

#[derive(Parser, Debug)]
#[command(name = "ag2api", author, version, about, long_about = None)]
struct Cli {
    /// Gateway configuration file (JSON); defaults apply when absent
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Transforms a saved raw-response capture or a bare upstream body
    Replay {
        /// Capture file (`raw_response_*.json`) or upstream body
        file: PathBuf,
        /// Treat the body as SSE and print the transformed event stream
        #[arg(long)]
        stream: bool,
        /// Model name to report instead of the upstream's
        #[arg(long)]
        model: Option<String>,
        /// Context window of the requested model, drives the usage split
        #[arg(long = "max-context")]
        max_context: Option<u32>,
    },
    /// Prints the effective configuration as JSON
    Config {
        /// Configuration file to load (overrides --config)
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Config { file } => {
            let path = file.or(cli.config);
            let config = ag2api_core::load_config(path.as_deref())
                .with_context(|| format!("loading configuration from {:?}", path))?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        },
        Commands::Replay { file, stream, model, max_context } => {
            let config = ag2api_core::load_config(cli.config.as_deref())
                .context("loading configuration")?;
            let _guard = ag2api_core::init_logger(&config.log).context("initialising logger")?;

            let raw = std::fs::read(&file).with_context(|| format!("reading {}", file.display()))?;
            let input = replay::ReplayInput::from_file_bytes(&raw, stream)?;
            let request = replay::ReplayRequest { override_model: model, max_context_tokens: max_context };
            let output = replay::run(input, request, &config).await?;
            print!("{}", output);
        },
    }

    Ok(())
}
