//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod check;
mod config_cmd;
mod modes;
mod serve;
mod summarise;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{load_settings, LoadOptions};
use crate::summarise::{ChainType, SummaryMode};

#[derive(Parser)]
#[command(name = "summarist")]
#[command(about = "Summarise PDF and text documents with a hosted LLM")]
#[command(version)]
pub struct Cli {
    /// Config file path (defaults to ./summarist.toml when present)
    #[arg(short, long, global = true, env = "SUMMARIST_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web interface
    Serve {
        /// Bind address: a port, a host, or host:port [default: from config]
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Summarise a PDF or text file
    #[command(alias = "summarize")]
    Summarise {
        /// File to summarise (.pdf or .txt)
        file: PathBuf,
        /// Summary mode: prose, bullet or extractive
        #[arg(short, long)]
        mode: Option<SummaryMode>,
        /// Strategy: stuff, map_reduce or refine
        #[arg(long, alias = "chain-type")]
        chain: Option<ChainType>,
        /// Model name (overrides config)
        #[arg(long)]
        model: Option<String>,
        /// Sampling temperature (overrides config; invalid values mean 0.0)
        #[arg(short, long)]
        temperature: Option<String>,
        /// Write the summary to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print the summary and its metadata as JSON
        #[arg(long)]
        json: bool,
    },

    /// List summary modes and strategies
    Modes,

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Check that the configured model endpoint is reachable
    Check,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective configuration as TOML (API key redacted)
    Show,
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
        search_dir: None,
    };
    let settings = load_settings(options).await?;

    match cli.command {
        Commands::Serve { bind } => serve::cmd_serve(settings, bind.as_deref()).await,
        Commands::Summarise {
            file,
            mode,
            chain,
            model,
            temperature,
            output,
            json,
        } => {
            summarise::cmd_summarise(
                settings,
                summarise::SummariseArgs {
                    file,
                    mode,
                    chain,
                    model,
                    temperature,
                    output,
                    json,
                },
            )
            .await
        }
        Commands::Modes => modes::cmd_modes(&settings),
        Commands::Config { command } => match command {
            ConfigCommands::Show => config_cmd::cmd_config_show(&settings),
        },
        Commands::Check => check::cmd_check(&settings).await,
    }
}
