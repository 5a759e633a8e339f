//! CLI module for aeroquery
//!
//! Provides command-line interface for:
//! - query: Run a query over a JSON data file, one result per line
//! - explain: Report the candidate path a query would take

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command, QueryArgs};
pub use commands::{execute_explain, execute_query, explain, query, run, run_command};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{write_error, write_response};
