//! The run allowlist.
//!
//! A directory under the storage root counts as a run only if its name is a well-formed
//! [`RunId`] and it holds a regular descriptor file. This listing is the only authority on
//! which runs exist; lexical validity alone never is.

use std::{fs, io, path::Path, thread};

use tracing::{debug, error, warn};

use crate::{DESCRIPTOR_FILE, prelude::*, run_id::RunId};

/// Default number of threads checking candidate directories.
pub const DEFAULT_SCAN_FAN_OUT: usize = 8;

/// List run identifiers under `storage_root`, most recent first.
pub fn list_run_identifiers(storage_root: &Path) -> Result<Vec<RunId>> {
    list_run_identifiers_with(storage_root, DEFAULT_SCAN_FAN_OUT)
}

/// Same as [`list_run_identifiers`] with an explicit bound on parallel descriptor checks.
///
/// A storage root that does not exist yet lists no runs.
pub fn list_run_identifiers_with(storage_root: &Path, fan_out: usize) -> Result<Vec<RunId>> {
    let entries = match fs::read_dir(storage_root) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            warn!("Storage root {} does not exist", storage_root.display());
            return Ok(Vec::new());
        }
        Err(err) => return Err(err.into()),
    };

    let mut candidates = Vec::new();
    for entry in entries {
        let entry = entry?;
        // DirEntry::file_type does not follow symlinks.
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        match RunId::parse(name) {
            Ok(run_id) => candidates.push(run_id),
            Err(_) => debug!("Ignoring directory {name}"),
        }
    }

    let mut accepted = scan_descriptors(storage_root, &candidates, fan_out);
    accepted.sort_unstable_by(|a, b| b.cmp(a));
    accepted.dedup();
    Ok(accepted)
}

fn scan_descriptors(storage_root: &Path, candidates: &[RunId], fan_out: usize) -> Vec<RunId> {
    if candidates.is_empty() {
        return Vec::new();
    }
    let workers = fan_out.clamp(1, candidates.len());
    let chunk_size = candidates.len().div_ceil(workers);

    thread::scope(|scope| {
        let handles: Vec<_> = candidates
            .chunks(chunk_size)
            .map(|chunk| {
                scope.spawn(move || {
                    chunk
                        .iter()
                        .filter(|run_id| has_descriptor(storage_root, run_id))
                        .cloned()
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut accepted = Vec::with_capacity(candidates.len());
        for handle in handles {
            match handle.join() {
                Ok(found) => accepted.extend(found),
                Err(err) => error!("Descriptor scan worker panicked: {err:?}"),
            }
        }
        accepted
    })
}

fn has_descriptor(storage_root: &Path, run_id: &RunId) -> bool {
    let path = storage_root.join(run_id.as_str()).join(DESCRIPTOR_FILE);
    match fs::symlink_metadata(&path) {
        Ok(meta) => meta.file_type().is_file(),
        Err(_) => {
            debug!("Run {run_id} has no descriptor");
            false
        }
    }
}
