//! Grid Viewer Daemon (gvd)
//!
//! Read-only browser for X/Y generation runs written by the batch generator. It provides:
//!
//! - **API Server**: run listing, descriptor plus dense grid, and image bytes over HTTP
//! - **Inspection commands**: the same data printed to stdout for scripting
//!
//! Every run identifier is checked against the allowlist of run directories and every file
//! path is confined to its run directory before anything is read.

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::{handle_grid, handle_list, handle_resolve, handle_serve, load_config};
use crate::prelude::*;

mod cli;
mod commands;
mod error;
mod prelude;

/// Main entry point for the grid viewer daemon.
///
/// # Examples
///
/// ```bash
/// # Serve the runs under ./comfyui_api_outputs on 127.0.0.1:3000
/// gvd serve
///
/// # Serve another root on every interface
/// COMFYUI_OUT_DIR=/srv/outputs gvd serve --bind 0.0.0.0:8080
///
/// # Inspect a run from the shell
/// gvd --config gvd.toml grid run-20240101T120000Z
/// gvd resolve run-20240101T120000Z images/x0-y0.png
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "gvd=info,gv_web=info,gv_store=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let bind = match &cli.command {
        Commands::Serve { bind } => bind.clone(),
        _ => None,
    };
    let config = load_config(cli.config, cli.root, bind)?;
    let store = config.storage.open();

    match cli.command {
        Commands::Serve { .. } => handle_serve(&config).await,
        Commands::List => handle_list(&store),
        Commands::Grid { run_id } => handle_grid(&store, &run_id),
        Commands::Resolve { run_id, path } => handle_resolve(&store, &run_id, &path),
    }
}
