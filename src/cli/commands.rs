//! CLI commands and argument parsing

use crate::config::ConfigOverrides;
use crate::types::LoadMode;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Flat file loader CLI
#[derive(Parser, Debug)]
#[command(name = "flatload")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (YAML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Profile, reconcile and load files into the warehouse
    Load {
        /// Files or glob patterns (e.g. "data/*.csv")
        #[arg(required = true)]
        inputs: Vec<String>,

        #[command(flatten)]
        options: LoadArgs,
    },

    /// Print inferred schemas without touching the warehouse
    Profile {
        /// Files or glob patterns
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Rows to sample per file (0 = whole file)
        #[arg(long)]
        sample_rows: Option<usize>,

        /// Field delimiter or preset (csv, tsv, semicolon, pipe)
        #[arg(long)]
        delimiter: Option<String>,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        format: OutputFormat,
    },

    /// Validate the configuration and print it with defaults applied
    Validate,
}

/// Overrides accepted by `load`
#[derive(Args, Debug, Default, Clone)]
pub struct LoadArgs {
    /// DuckDB database file, or :memory:
    #[arg(short, long)]
    pub warehouse: Option<String>,

    /// Destination table template, e.g. "raw_{{ file.stem }}"
    #[arg(short, long)]
    pub table_template: Option<String>,

    /// Rows to sample per file (0 = whole file)
    #[arg(long)]
    pub sample_rows: Option<usize>,

    /// Per-statement timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Append to or replace existing rows
    #[arg(short, long)]
    pub mode: Option<LoadMode>,

    /// Field delimiter or preset (csv, tsv, semicolon, pipe)
    #[arg(long)]
    pub delimiter: Option<String>,

    /// Destination tables loaded at the same time
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Also write the audit log to this JSON-lines file
    #[arg(long)]
    pub audit_file: Option<PathBuf>,
}

impl From<&LoadArgs> for ConfigOverrides {
    fn from(args: &LoadArgs) -> Self {
        Self {
            warehouse: args.warehouse.clone(),
            table_template: args.table_template.clone(),
            sample_rows: args.sample_rows,
            timeout_secs: args.timeout,
            load_mode: args.mode,
            delimiter: args.delimiter.clone(),
            concurrency: args.concurrency,
            audit_file: args.audit_file.clone(),
        }
    }
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one report per line)
    Json,
    /// Human-readable output
    Pretty,
}
