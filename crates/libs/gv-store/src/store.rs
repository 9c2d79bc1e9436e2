//! Entry point used by request handlers.
//!
//! Every method takes the caller's raw identifier and path strings, checks them against the
//! allowlist and the path policy, and only then touches the run directory.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    allowlist::{DEFAULT_SCAN_FAN_OUT, list_run_identifiers_with},
    descriptor::{RunDescriptor, load_descriptor},
    event_log::parse_event_log,
    grid::{GridIndex, build_grid},
    prelude::*,
    resolver::{PathCase, resolve_under_root},
    run_id::RunId,
};

/// One entry of the run listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub run_id: RunId,
    /// Time embedded in the identifier.
    pub timestamp: Option<DateTime<Utc>>,
    /// The following are `None` when the descriptor could not be loaded.
    pub created_at: Option<String>,
    pub dry_run: Option<bool>,
    pub x_count: Option<usize>,
    pub y_count: Option<usize>,
    pub total_cells: Option<usize>,
}

/// Descriptor and grid of one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunView {
    pub run_id: RunId,
    pub descriptor: RunDescriptor,
    pub grid: GridIndex,
}

/// Read-only access to the runs below a storage root.
#[derive(Debug, Clone)]
pub struct RunStore {
    root: PathBuf,
    path_case: PathCase,
    scan_fan_out: usize,
}

impl RunStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            path_case: PathCase::default(),
            scan_fan_out: DEFAULT_SCAN_FAN_OUT,
        }
    }

    pub fn with_path_case(mut self, path_case: PathCase) -> Self {
        self.path_case = path_case;
        self
    }

    pub fn with_scan_fan_out(mut self, scan_fan_out: usize) -> Self {
        self.scan_fan_out = scan_fan_out.max(1);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_case(&self) -> PathCase {
        self.path_case
    }

    /// The allowlist, most recent first.
    pub fn list_runs(&self) -> Result<Vec<RunId>> {
        list_run_identifiers_with(&self.root, self.scan_fan_out)
    }

    /// The allowlist with counts taken from each descriptor.
    pub fn summaries(&self) -> Result<Vec<RunSummary>> {
        let runs = self.list_runs()?;
        Ok(runs
            .into_iter()
            .map(|run_id| {
                let mut summary = RunSummary {
                    timestamp: run_id.timestamp(),
                    run_id,
                    created_at: None,
                    dry_run: None,
                    x_count: None,
                    y_count: None,
                    total_cells: None,
                };
                match load_descriptor(&self.root, &summary.run_id) {
                    Ok(descriptor) => {
                        summary.created_at = Some(descriptor.created_at);
                        summary.dry_run = Some(descriptor.provenance.dry_run);
                        summary.x_count = Some(descriptor.selection.x_count);
                        summary.y_count = Some(descriptor.selection.y_count);
                        summary.total_cells = Some(descriptor.selection.total_cells);
                    }
                    Err(err) => warn!("Listing {} without counts: {err}", summary.run_id),
                }
                summary
            })
            .collect())
    }

    /// Accept `candidate` only if it is a well-formed identifier present in the allowlist.
    pub fn resolve_run(&self, candidate: &str) -> Result<RunId> {
        let run_id = RunId::parse(candidate)?;
        if !self.list_runs()?.contains(&run_id) {
            debug!("Run {run_id} is not allowlisted");
            return Err(Error::IdentifierNotAllowlisted);
        }
        Ok(run_id)
    }

    pub fn descriptor(&self, candidate: &str) -> Result<RunDescriptor> {
        let run_id = self.resolve_run(candidate)?;
        load_descriptor(&self.root, &run_id)
    }

    /// Descriptor plus dense grid for `candidate`.
    pub fn grid(&self, candidate: &str) -> Result<RunView> {
        let run_id = self.resolve_run(candidate)?;
        let descriptor = load_descriptor(&self.root, &run_id)?;
        let records = parse_event_log(&self.root, &run_id)?;
        let grid = build_grid(&descriptor, &records);
        Ok(RunView {
            run_id,
            descriptor,
            grid,
        })
    }

    /// Absolute, root-confined location of `relative` inside run `candidate`.
    ///
    /// The file is not required to exist.
    pub fn resolve_file(&self, candidate: &str, relative: &str) -> Result<PathBuf> {
        let run_id = self.resolve_run(candidate)?;
        let run_dir = resolve_under_root(&self.root, run_id.as_str(), self.path_case)?;
        resolve_under_root(&run_dir, relative, self.path_case)
    }
}
