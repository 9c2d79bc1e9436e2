//! Command handlers.

use std::path::PathBuf;

use gv_config::ViewerConfig;
use gv_store::store::RunStore;
use gv_web::api::setup_api_from_config;
use tracing::{error, info};

use crate::prelude::*;

/// Resolve the effective configuration: file or environment, then CLI overrides.
pub fn load_config(
    config_path: Option<PathBuf>,
    root: Option<PathBuf>,
    bind: Option<String>,
) -> Result<ViewerConfig> {
    let mut config = match config_path {
        Some(path) => ViewerConfig::from_file(&path)?,
        None => ViewerConfig::from_env()?,
    };
    if let Some(root) = root {
        config.storage.root = root;
    }
    if let Some(bind) = bind {
        config.server.bind = bind;
    }
    config.validate()?;
    Ok(config)
}

pub async fn handle_serve(config: &ViewerConfig) -> Result<()> {
    let (addr, api_handle) = setup_api_from_config(config).await?;
    info!("Grid viewer available at http://{addr}/v1/runs");

    tokio::select! {
        result = api_handle => {
            error!("API server stopped: {:?}", result);
            result??;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
        }
    }
    Ok(())
}

pub fn handle_list(store: &RunStore) -> Result<()> {
    let summaries = store.summaries()?;
    if summaries.is_empty() {
        info!("No runs under {}", store.root().display());
    }
    for summary in summaries {
        let cells = summary
            .total_cells
            .map(|total| total.to_string())
            .unwrap_or_else(|| String::from("?"));
        let dry_run = if summary.dry_run == Some(true) {
            " (dry run)"
        } else {
            ""
        };
        println!("{}\t{cells} cells{dry_run}", summary.run_id);
    }
    Ok(())
}

pub fn handle_grid(store: &RunStore, run_id: &str) -> Result<()> {
    let view = store.grid(run_id)?;
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}

pub fn handle_resolve(store: &RunStore, run_id: &str, path: &str) -> Result<()> {
    match store.resolve_file(run_id, path) {
        Ok(resolved) => println!("{}", resolved.display()),
        Err(err) if err.is_not_found() => {
            info!("Rejected {run_id}/{path}: {err}");
            println!("not found");
        }
        Err(err) => return Err(err.into()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gvd.toml");
        std::fs::write(
            &path,
            "[storage]\nroot = \"from-file\"\n[server]\nbind = \"127.0.0.1:4000\"\n",
        )
        .unwrap();

        let config = load_config(Some(path.clone()), None, None).unwrap();
        assert_eq!(config.storage.root, PathBuf::from("from-file"));
        assert_eq!(config.server.bind, "127.0.0.1:4000");

        let config = load_config(
            Some(path.clone()),
            Some(PathBuf::from("from-cli")),
            Some(String::from("127.0.0.1:5000")),
        )
        .unwrap();
        assert_eq!(config.storage.root, PathBuf::from("from-cli"));
        assert_eq!(config.server.bind, "127.0.0.1:5000");

        let err = load_config(Some(path), None, Some(String::from("nowhere"))).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
