//! Command-line interface for the grid viewer daemon.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line interface for the grid viewer daemon.
#[derive(Parser)]
#[command(name = "gvd")]
#[command(about = "Grid viewer - Browse X/Y generation runs and their images")]
pub struct Cli {
    /// Path to the configuration file (defaults come from the environment otherwise)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Storage root holding one directory per run (overrides COMFYUI_OUT_DIR and the config file)
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for the grid viewer daemon.
#[derive(Subcommand)]
pub enum Commands {
    /// Serve the HTTP API
    Serve {
        /// Address to listen on (overrides GV_BIND and the config file)
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// List allowlisted runs, most recent first
    List,
    /// Print the descriptor and dense grid of a run as JSON
    Grid {
        /// Run identifier, e.g. run-20240101T120000Z
        run_id: String,
    },
    /// Print the confined absolute path of a file inside a run
    Resolve {
        /// Run identifier
        run_id: String,
        /// Path relative to the run directory
        path: String,
    },
}
