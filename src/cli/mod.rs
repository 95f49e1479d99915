//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Overrides;

/// Minimal async test runner
#[derive(Parser, Debug)]
#[command(name = "kocha")]
#[command(version = "0.1.0")]
#[command(about = "Run nested test suites with hooks, timeouts and retries")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run suite files
    Run(RunArgs),

    /// List available suite files
    List(ListArgs),
}

/// Arguments for run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Suite file patterns (globs over suite names)
    pub patterns: Vec<String>,

    /// Timeout for every test, e.g. 500, 2s, 1m
    #[arg(short, long)]
    pub timeout: Option<String>,

    /// Times to retry a failing test
    #[arg(short, long)]
    pub retries: Option<u32>,

    /// Suite file to register before the selected ones
    #[arg(long = "require", value_name = "NAME")]
    pub require: Vec<String>,

    /// Configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format (spec, json, summary)
    #[arg(short, long)]
    pub format: Option<String>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

impl RunArgs {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            timeout: self.timeout.clone(),
            retries: self.retries,
            format: self.format.clone(),
            no_color: self.no_color,
            require: self.require.clone(),
            patterns: self.patterns.clone(),
        }
    }
}

/// Arguments for list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Show suite descriptions
    #[arg(short, long)]
    pub detailed: bool,
}
