//! CLI command implementations
//!
//! Both commands load the data file into an in-memory store, build the
//! reference index engine over it, and hand the query to `QueryEngine` on
//! a tokio runtime owned by the command.

use std::collections::HashSet;
use std::io::{self, Write};
use std::sync::Arc;

use futures_util::StreamExt;
use tokio::runtime::Runtime;

use crate::config::QueryConfig;
use crate::executor::{ExecutorError, QueryEngine};
use crate::index::FieldIndexEngine;
use crate::observability::Logger;
use crate::planner::{Filter, QueryExplain, QueryOptions};
use crate::store::MemoryStore;

use super::args::{Cli, Command, QueryArgs};
use super::errors::{CliError, CliResult};
use super::io::{parse_filter, read_documents, write_line, write_response};

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command)
}

/// Run a parsed command
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Query(args) => query(&args),
        Command::Explain(args) => explain(&args),
    }
}

/// Run a query, writing each result to stdout as one JSON line
pub fn query(args: &QueryArgs) -> CliResult<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let written = execute_query(args, &mut out)?;
    out.flush()?;

    Logger::info("CLI_QUERY_COMPLETE", &[("results", &written.to_string())]);
    Ok(())
}

/// Print the path a query would take as a success envelope
pub fn explain(args: &QueryArgs) -> CliResult<()> {
    let explain = execute_explain(args)?;
    write_response(serde_json::to_value(&explain)?)
}

/// Run a query and write its results to `out`.
///
/// Results already written stay written when the query fails part way.
/// Returns the number of results written.
pub fn execute_query<W: Write>(args: &QueryArgs, out: &mut W) -> CliResult<usize> {
    let prepared = prepare(args)?;
    runtime()?.block_on(stream_results(&prepared, out))
}

/// Compute the explain output of a query
pub fn execute_explain(args: &QueryArgs) -> CliResult<QueryExplain> {
    let prepared = prepare(args)?;
    runtime()?.block_on(explain_plan(&prepared))
}

async fn stream_results<W: Write>(prepared: &Prepared, out: &mut W) -> CliResult<usize> {
    let engine = prepared.engine().await?;
    let mut results = engine.query(&prepared.filter, &prepared.options);

    let mut written = 0;
    while let Some(document) = results.next().await {
        write_line(out, &document?)?;
        written += 1;
    }
    Ok(written)
}

async fn explain_plan(prepared: &Prepared) -> CliResult<QueryExplain> {
    let engine = prepared.engine().await?;
    Ok(engine.explain(&prepared.filter, &prepared.options).await?)
}

/// Everything a command needs before the runtime starts
struct Prepared {
    config: QueryConfig,
    store: Arc<MemoryStore>,
    filter: Filter,
    options: QueryOptions,
}

impl Prepared {
    /// Builds the index engine over the store and wraps both in an engine
    async fn engine(&self) -> CliResult<QueryEngine<MemoryStore, FieldIndexEngine>> {
        let index = Arc::new(FieldIndexEngine::new(
            self.config.indexed_fields.iter().cloned(),
        ));
        index
            .rebuild_from_store(self.store.as_ref())
            .await
            .map_err(ExecutorError::from)?;

        Ok(QueryEngine::with_config(
            Arc::clone(&self.store),
            index,
            self.config.clone(),
        ))
    }
}

fn prepare(args: &QueryArgs) -> CliResult<Prepared> {
    let config = load_config(args)?;

    let documents = read_documents(&args.data)?;
    Logger::trace(
        "CLI_DATA_LOADED",
        &[("documents", &documents.len().to_string())],
    );
    let store = Arc::new(MemoryStore::from_documents(documents));

    let filter = Filter::from_json(&parse_filter(args.filter.as_deref())?)?;
    let options = QueryOptions::from_json(&args.options_json());

    Ok(Prepared {
        config,
        store,
        filter,
        options,
    })
}

/// Loads the optional config file and merges `--index` fields into it
fn load_config(args: &QueryArgs) -> CliResult<QueryConfig> {
    let config = match &args.config {
        Some(path) => QueryConfig::load(path)?,
        None => QueryConfig::default(),
    };
    config.apply_log_level()?;

    let mut seen = HashSet::new();
    let mut fields = Vec::new();
    for field in config.indexed_fields.iter().chain(args.indexes.iter()) {
        if seen.insert(field.clone()) {
            fields.push(field.clone());
        }
    }

    if fields.iter().any(|field| field.is_empty()) {
        return Err(CliError::invalid_input("--index requires a non-empty field"));
    }

    Ok(config.with_indexed_fields(fields))
}

fn runtime() -> CliResult<Runtime> {
    Runtime::new().map_err(|e| CliError::runtime_failed(e.to_string()))
}
