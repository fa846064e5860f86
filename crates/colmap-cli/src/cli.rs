//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "colmap",
    version,
    about = "Governed column mapping between warehouse datasets",
    long_about = "Infer column mappings between a source and a target dataset, review them,\n\
                  and generate guarded INSERT/MERGE transformation SQL.\n\n\
                  Every stage is recorded in an append-only audit log."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Config file (default: colmap.toml in the platform config directory).
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// JSON catalog describing the warehouse to run against.
    #[arg(long = "catalog", value_name = "PATH", global = true)]
    pub catalog: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// List the tables and columns of a dataset.
    Schema(SchemaArgs),

    /// Show a few rows of a table.
    Sample(SampleArgs),

    /// Suggest column mappings between two tables.
    Suggest(PairArgs),

    /// Suggest, review, generate SQL and dry-run (or execute) it.
    Run(RunArgs),
}

#[derive(Parser)]
pub struct SchemaArgs {
    #[arg(value_name = "DATASET")]
    pub dataset: String,
}

#[derive(Parser)]
pub struct SampleArgs {
    #[arg(value_name = "DATASET")]
    pub dataset: String,

    #[arg(value_name = "TABLE")]
    pub table: String,

    /// Maximum number of rows to show.
    #[arg(long = "limit", default_value_t = colmap_ingest::DEFAULT_SAMPLE_LIMIT)]
    pub limit: usize,
}

#[derive(Parser)]
pub struct PairArgs {
    /// Table in the configured source dataset.
    #[arg(value_name = "SOURCE_TABLE")]
    pub source_table: String,

    /// Table in the configured target dataset.
    #[arg(value_name = "TARGET_TABLE")]
    pub target_table: String,
}

#[derive(Parser)]
pub struct RunArgs {
    #[command(flatten)]
    pub pair: PairArgs,

    /// Execute the statement after the dry run passes.
    ///
    /// Without this flag the generated SQL is only validated against the
    /// warehouse and no data is written.
    #[arg(long = "execute")]
    pub execute: bool,

    /// Run the MERGE statement instead of the INSERT.
    #[arg(long = "merge")]
    pub merge: bool,

    /// Approve the suggested mappings without prompting.
    #[arg(long = "yes", short = 'y')]
    pub yes: bool,

    /// Seconds to wait for a review decision (default from config).
    #[arg(long = "review-timeout", value_name = "SECS")]
    pub review_timeout: Option<u64>,

    /// Print the generated SQL.
    #[arg(long = "show-sql")]
    pub show_sql: bool,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
