//! Run artifact ingestion for the grid viewer.
//!
//! A storage root holds one directory per generation run. Each run directory carries a
//! descriptor (`run.json`) and an optional append-only event log (`metadata.jsonl`) with one
//! record per attempted cell. This crate turns untrusted identifiers into root-confined
//! filesystem locations and turns the event log into a dense [`grid::GridIndex`].
//!
//! # Usage
//!
//! ```rust,no_run
//! use gv_store::store::RunStore;
//!
//! let store = RunStore::new("comfyui_api_outputs");
//! for run in store.list_runs().unwrap() {
//!     let view = store.grid(run.as_str()).unwrap();
//!     println!("{run}: {} cells", view.grid.len());
//! }
//! ```

pub mod allowlist;
pub mod cell;
mod coerce;
pub mod descriptor;
pub mod error;
pub mod event_log;
pub mod grid;
pub mod path;
pub mod prelude;
pub mod prompt;
pub mod resolver;
pub mod run_id;
pub mod store;

pub use allowlist::list_run_identifiers;
pub use descriptor::load_descriptor;
pub use event_log::parse_event_log;
pub use grid::build_grid;
pub use path::sanitize;
pub use resolver::resolve_under_root;

/// File name of the per-run descriptor.
pub const DESCRIPTOR_FILE: &str = "run.json";

/// File name of the per-run event log.
pub const EVENT_LOG_FILE: &str = "metadata.jsonl";
