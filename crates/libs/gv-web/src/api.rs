//! Routes and server setup.

use std::net::SocketAddr;

use axum::{
    Json, Router,
    extract::{Path, State},
    response::Response,
    routing::get,
};
use gv_config::ViewerConfig;
use gv_store::store::{RunStore, RunSummary, RunView};
use tokio::task::JoinHandle;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};
use tracing::{debug, info};

use crate::{image::respond_with_file, prelude::*};

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub store: RunStore,
    pub image_max_age_s: u64,
}

impl AppState {
    pub fn new(store: RunStore, image_max_age_s: u64) -> Self {
        Self {
            store,
            image_max_age_s,
        }
    }

    pub fn from_config(config: &ViewerConfig) -> Self {
        Self::new(config.storage.open(), config.server.image_max_age_s)
    }
}

fn v1(path: &str) -> String {
    format!("/v1/{path}")
}

/// Build the router without binding it.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(&v1("runs"), get(list_runs))
        .route(&v1("runs/{run_id}"), get(get_run))
        .route(&v1("runs/{run_id}/files/{*path}"), get(get_file))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(true)),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind `bind` and serve in the background.
///
/// Returns the bound address, which differs from `bind` when port 0 was requested.
pub async fn setup_api(
    state: AppState,
    bind: SocketAddr,
) -> Result<(SocketAddr, JoinHandle<Result<()>>)> {
    info!("Serving runs from {}", state.store.root().display());
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    let local_addr = listener.local_addr()?;
    info!("Listening on {local_addr}");
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await?;
        Ok(())
    });

    Ok((local_addr, handle))
}

/// Bind the address named in `config` and serve its storage root.
pub async fn setup_api_from_config(
    config: &ViewerConfig,
) -> Result<(SocketAddr, JoinHandle<Result<()>>)> {
    let bind = config.server.bind_addr()?;
    setup_api(AppState::from_config(config), bind).await
}

async fn list_runs(State(state): State<AppState>) -> Result<Json<Vec<RunSummary>>> {
    let store = state.store;
    let summaries = tokio::task::spawn_blocking(move || store.summaries()).await??;
    debug!("Listing {} runs", summaries.len());
    Ok(Json(summaries))
}

async fn get_run(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<Json<RunView>> {
    let store = state.store;
    let view = tokio::task::spawn_blocking(move || store.grid(&run_id)).await??;
    Ok(Json(view))
}

async fn get_file(
    State(state): State<AppState>,
    Path((run_id, path)): Path<(String, String)>,
) -> Result<Response> {
    let store = state.store;
    let resolved =
        tokio::task::spawn_blocking(move || store.resolve_file(&run_id, &path)).await??;
    respond_with_file(&resolved, state.image_max_age_s).await
}
