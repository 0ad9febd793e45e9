//! CLI module
//!
//! This module defines the command-line interface using clap and implements
//! the command execution logic.

use crate::state::FighterId;
use crate::{Config, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub mod commands;
pub mod output;

/// Search fighter state sequences extracted from replays
#[derive(Parser, Debug)]
#[command(name = "sequence-search")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run queries over one or more replays
    Search(SearchArgs),

    /// Parse a query and, with a fighter id, compile it against the labels
    Check(CheckArgs),

    /// List the labels known to a dictionary
    Labels(LabelsArgs),
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Replay files (JSON)
    #[arg(short, long)]
    pub replay: Vec<PathBuf>,

    /// Data source type
    #[arg(short, long, value_enum, default_value = "json")]
    pub source: DataSourceType,

    /// Label dictionary (overrides config)
    #[arg(short, long, env = "SEQUENCE_SEARCH_LABELS")]
    pub labels: Option<PathBuf>,

    /// Query to run; repeat for several queries
    #[arg(short, long, required = true)]
    pub query: Vec<String>,

    /// Character id to search (defaults to the first fighter of the first replay)
    #[arg(short, long)]
    pub fighter: Option<FighterId>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: OutputFormat,

    /// Write each query's transition graph as a DOT file
    #[arg(long)]
    pub export: bool,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Query text
    pub query: String,

    /// Label dictionary (overrides config)
    #[arg(short, long, env = "SEQUENCE_SEARCH_LABELS")]
    pub labels: Option<PathBuf>,

    /// Compile for this character id
    #[arg(short, long)]
    pub fighter_id: Option<FighterId>,
}

#[derive(Args, Debug)]
pub struct LabelsArgs {
    /// Label dictionary (overrides config)
    #[arg(short, long, env = "SEQUENCE_SEARCH_LABELS")]
    pub labels: Option<PathBuf>,

    /// Only list this character's labels
    #[arg(short, long)]
    pub fighter_id: Option<FighterId>,
}

/// Data source types
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DataSourceType {
    /// Replay files on disk
    Json,
    /// Built-in sample match
    Mock,
}

/// Output format types
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Plain text table
    Table,
    /// JSON output
    Json,
    /// DOT format (Graphviz)
    Dot,
}

/// Execute the CLI command
pub fn execute(args: Cli, config: Config) -> Result<()> {
    match args.command {
        Commands::Search(search) => commands::search::execute(search, &config),
        Commands::Check(check) => commands::check::execute(check, &config),
        Commands::Labels(labels) => commands::labels::execute(labels, &config),
    }
}
