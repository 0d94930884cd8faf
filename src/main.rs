// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! Contract Manager MCP server and CLI.
//!
//! Runs the MCP server over stdio (or a Unix socket with `--listen`), and
//! offers `reset` and `stats` for looking after the database.

#![allow(clippy::print_stdout, reason = "CLI tool needs to output to stdout")]

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use contract_manager_mcp::bridge::ContractManagerHandler;
use contract_manager_mcp::cli::{self, ColorConfig, ColumnWidths};
use contract_manager_mcp::config::Config;
use contract_manager_mcp::listener::SessionListener;
use contract_manager_mcp::mcp::McpServer;
use contract_manager_mcp::session::SessionHub;
use contract_manager_mcp::store::Store;

/// Command-line arguments for Contract Manager.
#[derive(Parser, Debug)]
#[command(name = "contract-manager")]
#[command(about = "MCP server for programs, contracts, tasks, employees and tags")]
#[command(version = env!("CONTRACT_MANAGER_VERSION"))]
struct Args {
    /// The subcommand to run.
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database file. Overrides the config file.
    #[arg(long, global = true)]
    db: Option<PathBuf>,
}

/// Subcommands supported by Contract Manager.
#[derive(Subcommand, Debug)]
enum Command {
    /// Run the MCP server (default if no subcommand given).
    Serve {
        /// Accept sessions on this Unix socket instead of stdio.
        #[arg(long)]
        listen: Option<PathBuf>,

        /// Keep the existing data instead of loading the demo set.
        #[arg(long)]
        no_seed: bool,
    },

    /// Wipe the database and load the demo data set.
    Reset,

    /// Show record counts and which tools are available.
    Stats {
        /// Disable colored output.
        #[arg(long)]
        nocolor: bool,
    },
}

/// Entry point.
///
/// # Errors
///
/// Returns an error if the subcommand fails.
#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("contract_manager_mcp=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = Config::load(args.config)?;
    if let Some(db) = args.db {
        config.database = db;
    }

    match args.command {
        None => run_server(config, None).await,
        Some(Command::Serve { listen, no_seed }) => {
            if no_seed {
                config.seed_on_start = false;
            }
            run_server(config, listen).await
        }
        Some(Command::Reset) => run_reset(&config).await,
        Some(Command::Stats { nocolor }) => run_stats(&config, nocolor).await,
    }
}

/// Runs the MCP server.
///
/// # Errors
///
/// Returns an error if the database cannot be opened, the socket cannot be
/// bound or reading stdin fails.
async fn run_server(config: Config, listen: Option<PathBuf>) -> Result<()> {
    let store = Arc::new(Store::open(&config.database)?);
    info!("Database: {}", config.database.display());

    if config.seed_on_start {
        store.seed().await?;
        info!("Loaded demo data set");
    }

    let hub = Arc::new(SessionHub::new());
    let handler =
        ContractManagerHandler::new(store, Arc::clone(&hub), config.handler_options()).await?;
    let server = Arc::new(McpServer::new(Arc::new(handler), hub));

    let Some(socket) = listen else {
        let result = tokio::select! {
            res = server.run_stdio() => res,
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal");
                Ok(())
            }
        };
        return result;
    };

    let accept = SessionListener::new(server).start(&socket)?;
    let abort = accept.abort_handle();
    tokio::select! {
        res = accept => {
            res?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
            abort.abort();
        }
    }

    let _ = std::fs::remove_file(&socket);
    Ok(())
}

/// Wipes the database and reseeds it.
///
/// # Errors
///
/// Returns an error if the database cannot be opened or seeding fails.
async fn run_reset(config: &Config) -> Result<()> {
    let store = Store::open(&config.database)?;
    store.seed().await?;
    println!("Reset {}", config.database.display());
    Ok(())
}

/// Prints per-collection counts, availability and gated tools.
///
/// # Errors
///
/// Returns an error if the database cannot be opened or counted.
async fn run_stats(config: &Config, nocolor: bool) -> Result<()> {
    let store = Arc::new(Store::open(&config.database)?);
    let rows = cli::collect_stats(store).await?;
    let colors = ColorConfig::new(nocolor);
    let widths = ColumnWidths::calculate(cli::terminal_width());

    println!("Database: {}", config.database.display());
    print!("{}", cli::render_stats(&rows, &colors, &widths));
    Ok(())
}
