//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Ingest raw event data into partitioned, catalogued Parquet datasets
#[derive(Parser, Debug)]
#[command(name = "cleanse")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Pipeline configuration file (YAML)
    #[arg(short, long, global = true, env = "CLEANSE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Log format
    #[arg(long, global = true, default_value = "text")]
    pub log_format: LogFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the batch reshaping job once
    Batch {
        /// Read every partition and filter afterwards
        #[arg(long)]
        no_pushdown: bool,
    },

    /// Handle one object event
    Event {
        /// Inline event JSON (`{"bucket": .., "key": ..}` or a storage notification)
        #[arg(long, conflicts_with = "event_file")]
        event_json: Option<String>,

        /// File holding the event JSON
        #[arg(long)]
        event_file: Option<PathBuf>,

        /// Take the handler settings from the environment instead of the config file
        #[arg(long)]
        from_env: bool,
    },

    /// Validate a mapping table (built-in name or YAML path)
    ValidateMapping {
        /// Mapping table name or path
        mapping: String,
    },

    /// Print a mapping table, or list the built-in tables
    ShowMapping {
        /// Mapping table name or path
        mapping: Option<String>,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one document per line)
    Json,
    /// Indented JSON
    Pretty,
}

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per line
    Json,
}
