// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::types::{DagType, DeadlineType};

/// Command-line arguments for `dagsched`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "dagsched",
    version,
    about = "Generate and analyze real-time DAG task models.",
    long_about = None
)]
pub struct CliArgs {
    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `DAGSCHED_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Generate a random task (or task set) from generator parameters.
    Generate(GenerateArgs),
    /// Load a task file (DOT or JSON) and print its timing analysis.
    Analyze(AnalyzeArgs),
}

#[derive(Debug, Clone, clap::Args)]
pub struct GenerateArgs {
    /// Generator parameter file (TOML).
    ///
    /// Default: `dagsched.toml` if it exists, otherwise built-in defaults.
    #[arg(long, value_name = "PATH")]
    pub params: Option<PathBuf>,

    /// Seed for the random source; overrides `seed` from the parameter file.
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Override `dag_type` (dag, cdag, tdag).
    #[arg(long, value_name = "TYPE")]
    pub dag_type: Option<DagType>,

    /// Override `deadline_type` (constrained, implicit, arbitrary).
    #[arg(long, value_name = "TYPE")]
    pub deadline_type: Option<DeadlineType>,

    /// Write the first generated task as DOT.
    #[arg(long, value_name = "PATH")]
    pub out: Option<PathBuf>,

    /// Write the generated task set as a JSON document.
    #[arg(long, value_name = "PATH")]
    pub json: Option<PathBuf>,

    /// Print a report of every generated task.
    #[arg(long)]
    pub print: bool,
}

#[derive(Debug, Clone, clap::Args)]
pub struct AnalyzeArgs {
    /// Task file: `.json` task-set document, anything else is read as DOT.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Print every source-to-sink path.
    #[arg(long)]
    pub paths: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
