// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! blockflow CLI
//!
//! Runs graph files and answers queries against them.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use blockflow::{BlockRegistry, GraphFile, RuntimeConfig, TopBlock};
use clap::{Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;

#[derive(Parser)]
#[command(name = "blockflow")]
#[command(author, version, about = "Run and inspect blockflow graphs", long_about = None)]
struct Cli {
    /// Runtime configuration (defaults to ./blockflow.toml when present)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long = "log-file", global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a graph file until it completes or the duration elapses
    Run {
        /// Graph file to load (JSON)
        #[arg(value_name = "GRAPH_FILE")]
        graph_file: PathBuf,

        /// Stop after this many seconds instead of waiting for completion
        #[arg(long, value_name = "SECS")]
        duration: Option<f64>,

        /// Preferred output buffer size in bytes
        #[arg(long, value_name = "BYTES")]
        buffer_hint: Option<usize>,

        /// Print /stats.json when the run ends
        #[arg(long)]
        stats: bool,
    },

    /// Run a graph file, then answer a JSON query against it
    Query {
        /// Graph file to load (JSON)
        #[arg(value_name = "GRAPH_FILE")]
        graph_file: PathBuf,

        /// Query document, e.g. '{"path":"/blocks.json"}'
        #[arg(value_name = "REQUEST")]
        request: String,

        /// Commit the graph without running it
        #[arg(long)]
        no_run: bool,
    },

    /// List the block kinds graph files can use
    Kinds,
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

fn setup_logging(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::prelude::*;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let file_name = path
                .file_name()
                .context("Log file path has no file name")?;
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn load_config(path: Option<&Path>) -> Result<RuntimeConfig> {
    match path {
        Some(path) => RuntimeConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => {
            let cwd = std::env::current_dir().context("Failed to read working directory")?;
            Ok(RuntimeConfig::load_or_default(&cwd))
        }
    }
}

fn build_graph(graph_file: &Path, config: RuntimeConfig) -> Result<TopBlock> {
    let graph = GraphFile::from_json_file(graph_file)?;
    let top = graph
        .build(&BlockRegistry::with_builtins(), config)
        .with_context(|| format!("Failed to build {}", graph_file.display()))?;
    Ok(top)
}

fn print_json(response: &str) -> Result<()> {
    let value: serde_json::Value = serde_json::from_str(response)?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn run(
    graph_file: &Path,
    config: RuntimeConfig,
    duration: Option<f64>,
    buffer_hint: Option<usize>,
    stats: bool,
) -> Result<()> {
    let top = build_graph(graph_file, config)?;

    match buffer_hint {
        Some(hint) => top.start_with_hint(hint)?,
        None => top.start()?,
    }

    match duration {
        Some(secs) => {
            if top.wait_timeout(secs) {
                tracing::info!("[{}] Completed within {}s", top.id(), secs);
            } else {
                tracing::info!("[{}] Duration elapsed, stopping", top.id());
                top.stop();
                top.wait();
            }
        }
        None => top.wait(),
    }

    if stats {
        print_json(&top.query(r#"{"path":"/stats.json"}"#)?)?;
    }
    Ok(())
}

fn query(graph_file: &Path, config: RuntimeConfig, request: &str, no_run: bool) -> Result<()> {
    let top = build_graph(graph_file, config)?;
    if no_run {
        let result = top.commit()?;
        tracing::info!("[{}] {}", top.id(), result);
    } else {
        top.run()?;
    }

    let response = top.query(request).context("Query is not valid JSON")?;
    print_json(&response)
}

fn kinds() {
    let registry = BlockRegistry::with_builtins();
    for kind in registry.kinds() {
        println!("{}", kind);
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = setup_logging(cli.log_file.as_deref())?;

    match cli.command {
        Commands::Run {
            graph_file,
            duration,
            buffer_hint,
            stats,
        } => {
            let config = load_config(cli.config.as_deref())?;
            run(&graph_file, config, duration, buffer_hint, stats)
        }
        Commands::Query {
            graph_file,
            request,
            no_run,
        } => {
            let config = load_config(cli.config.as_deref())?;
            query(&graph_file, config, &request, no_run)
        }
        Commands::Kinds => {
            kinds();
            Ok(())
        }
    }
}
