//! CLI module
//!
//! Command-line interface for running the pipelines.
//!
//! # Commands
//!
//! - `batch` - Run the batch reshaping job
//! - `event` - Handle one object event
//! - `validate-mapping` - Check a mapping table
//! - `show-mapping` - Print a mapping table or list the built-in ones

mod commands;
mod runner;

pub use commands::{Cli, Commands, LogFormat, OutputFormat};
pub use runner::Runner;
