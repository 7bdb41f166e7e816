//! CLI module for dirquery
//!
//! Provides command-line interface for:
//! - query: Run one filter, or a batch from stdin
//! - explain: Show the scan strategy for a filter
//! - methods: List attack method names

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{
    explain, explain_to, load_store, methods, query, run, run_command, run_filters, Config,
};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{object_json, read_filters, read_filters_from, write_error, write_line, write_response};
