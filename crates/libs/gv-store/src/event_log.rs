//! Tolerant reader for the per-run event log.
//!
//! The log is JSON lines, append-only, and may be resumed: a later line for the same
//! coordinate supersedes earlier ones. Each line is handled on its own, so a corrupt line
//! costs only itself.

use std::{collections::BTreeMap, fs, io, path::Path};

use serde_json::Value;
use tracing::debug;

use crate::{
    EVENT_LOG_FILE, coerce,
    cell::{CellRecord, GridCoordinate},
    prelude::*,
    run_id::RunId,
};

/// Latest record per coordinate.
pub type CellRecords = BTreeMap<GridCoordinate, CellRecord>;

/// Why a line produced no record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    Blank,
    /// Not UTF-8 or not JSON.
    Syntax,
    NotAnObject,
    /// `x_index` or `y_index` absent, not an integer, or negative.
    NoCoordinate,
}

/// Result of parsing one log line.
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    Record(CellRecord),
    Discarded(DiscardReason),
}

/// Parse a single log line.
pub fn parse_line(line: &[u8]) -> LineOutcome {
    let Ok(text) = std::str::from_utf8(line) else {
        return LineOutcome::Discarded(DiscardReason::Syntax);
    };
    let text = text.trim();
    if text.is_empty() {
        return LineOutcome::Discarded(DiscardReason::Blank);
    }
    let Ok(value) = serde_json::from_str::<Value>(text) else {
        return LineOutcome::Discarded(DiscardReason::Syntax);
    };
    let Some(object) = value.as_object() else {
        return LineOutcome::Discarded(DiscardReason::NotAnObject);
    };
    let (Some(x_index), Some(y_index)) = (
        coerce::index(object.get("x_index")),
        coerce::index(object.get("y_index")),
    ) else {
        return LineOutcome::Discarded(DiscardReason::NoCoordinate);
    };
    LineOutcome::Record(CellRecord::from_object(
        GridCoordinate::new(x_index, y_index),
        object,
    ))
}

/// Fold log content into the latest record per coordinate.
pub fn parse_event_bytes(content: &[u8]) -> CellRecords {
    let mut records = CellRecords::new();
    let mut discarded = 0usize;
    for (number, line) in content.split(|byte| *byte == b'\n').enumerate() {
        match parse_line(line) {
            LineOutcome::Record(record) => {
                records.insert(record.coordinate, record);
            }
            LineOutcome::Discarded(DiscardReason::Blank) => {}
            LineOutcome::Discarded(reason) => {
                discarded += 1;
                debug!("Discarding log line {}: {reason:?}", number + 1);
            }
        }
    }
    if discarded > 0 {
        debug!("Discarded {discarded} malformed log lines");
    }
    records
}

/// Read the event log of `run_id`. A run without a log has no records.
pub fn parse_event_log(storage_root: &Path, run_id: &RunId) -> Result<CellRecords> {
    let path = storage_root.join(run_id.as_str()).join(EVENT_LOG_FILE);
    match fs::read(&path) {
        Ok(content) => Ok(parse_event_bytes(&content)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(CellRecords::new()),
        Err(err) => Err(err.into()),
    }
}
