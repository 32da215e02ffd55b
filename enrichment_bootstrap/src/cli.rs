//! Secure argument parsing for the demo CLI: a single `process` subcommand
//! that runs one block of text through the pipeline and prints the result.
//! Narrower than a full multi-pipeline file-processing CLI since this
//! engine processes text, not files, on the host's behalf.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Parser)]
#[command(name = "enrichment", about = "Domain-specific text enrichment pipeline", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug-level logging.
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Path to a TOML pipeline configuration file; falls back to defaults
    /// when omitted.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run one block of text through the enrichment pipeline.
    Process {
        /// The text to process.
        text: String,

        /// Optional domain tag (e.g. "medical", "legal").
        #[arg(long)]
        domain: Option<String>,

        /// Per-request deadline override, in milliseconds.
        #[arg(long)]
        deadline_ms: Option<u64>,
    },
}

#[derive(Debug, Clone)]
pub struct ValidatedCli {
    pub command: ValidatedCommand,
    pub verbose: bool,
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub enum ValidatedCommand {
    Process { text: String, domain: Option<String>, deadline_ms: Option<u64> },
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("text argument must not be empty")]
    EmptyText,
    #[error("config path does not exist: {0}")]
    ConfigNotFound(PathBuf),
}

const MAX_TEXT_BYTES: usize = 1_000_000;

fn validate(cli: Cli) -> Result<ValidatedCli, ParseError> {
    if let Some(config) = &cli.config {
        if !config.exists() {
            return Err(ParseError::ConfigNotFound(config.clone()));
        }
    }

    let command = match cli.command {
        Commands::Process { text, domain, deadline_ms } => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Err(ParseError::EmptyText);
            }
            let text = if trimmed.len() > MAX_TEXT_BYTES { trimmed[..MAX_TEXT_BYTES].to_string() } else { trimmed.to_string() };
            ValidatedCommand::Process { text, domain, deadline_ms }
        }
    };

    Ok(ValidatedCli { command, verbose: cli.verbose, config: cli.config })
}

/// Parses `std::env::args`, then runs the same validation a handwritten
/// caller (tests, embedders) would run via [`validate`].
pub fn parse_and_validate() -> Result<ValidatedCli, ParseError> {
    validate(Cli::parse())
}
