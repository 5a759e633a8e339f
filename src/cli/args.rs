//! CLI argument definitions using clap
//!
//! Commands:
//! - aeroquery query --data <path> [--filter <json>] [--sort <field[:dir]>] [--limit <n>]
//! - aeroquery explain --data <path> [same options as query]

use clap::{Args, Parser, Subcommand};
use serde_json::{json, Map, Value};
use std::path::PathBuf;

/// aeroquery - streaming queries over an ordered document store
#[derive(Parser, Debug)]
#[command(name = "aeroquery")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a query and print each result as one JSON line
    Query(QueryArgs),

    /// Print the path a query would take
    Explain(QueryArgs),
}

/// Arguments shared by `query` and `explain`
#[derive(Args, Debug, Clone, Default)]
pub struct QueryArgs {
    /// JSON file holding an object of `{id: document}`
    #[arg(long)]
    pub data: PathBuf,

    /// Path to configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Filter as a JSON object, e.g. '{"age": {"$gte": 18}}'
    #[arg(long)]
    pub filter: Option<String>,

    /// Sort attribute, optionally suffixed with :asc, :desc, :1 or :-1
    #[arg(long)]
    pub sort: Option<String>,

    /// Maximum results; negative or non-numeric means unbounded
    #[arg(long, allow_hyphen_values = true)]
    pub limit: Option<String>,

    /// Field to index (repeatable), in addition to the config's fields
    #[arg(long = "index")]
    pub indexes: Vec<String>,
}

impl QueryArgs {
    /// Sort and limit as a loosely typed options object.
    ///
    /// `--sort age:desc --limit 5` becomes `{"sort": {"age": "desc"}, "limit": 5}`.
    pub fn options_json(&self) -> Value {
        let mut options = Map::new();

        if let Some(sort) = &self.sort {
            let (field, order) = match sort.rsplit_once(':') {
                Some((field, order)) if !field.is_empty() => (field, order),
                _ => (sort.as_str(), "asc"),
            };
            let order = serde_json::from_str::<Value>(order)
                .ok()
                .filter(Value::is_number)
                .unwrap_or_else(|| json!(order));
            let mut sort = Map::new();
            sort.insert(field.to_string(), order);
            options.insert("sort".to_string(), Value::Object(sort));
        }

        if let Some(limit) = &self.limit {
            let limit = serde_json::from_str::<Value>(limit).unwrap_or_else(|_| json!(limit));
            options.insert("limit".to_string(), limit);
        }

        Value::Object(options)
    }
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
