//! HTTP surface of the grid viewer.
//!
//! Three read-only routes sit on top of [`gv_store::store::RunStore`]:
//!
//! - `GET /v1/runs`: the allowlist with per-run counts.
//! - `GET /v1/runs/{run_id}`: descriptor and dense grid.
//! - `GET /v1/runs/{run_id}/files/{*path}`: image bytes, confined to the run directory.
//!
//! Every rejection on the way to a file is reported as the same 404 response.

pub mod api;
pub mod error;
pub mod image;
pub mod prelude;
