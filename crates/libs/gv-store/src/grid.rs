//! Dense grid assembly.

use std::collections::BTreeMap;

use serde::{Serialize, Serializer, ser::SerializeStruct};

use crate::{
    cell::{CellRecord, CellStatus, GridCoordinate},
    descriptor::RunDescriptor,
    event_log::CellRecords,
};

/// Label of one axis position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AxisLabel {
    pub index: u32,
    pub label: String,
}

/// Per-status cell counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GridSummary {
    pub success: usize,
    pub failed: usize,
    pub skipped: usize,
    pub missing: usize,
    /// Skipped cells whose earlier result was reused.
    pub resume_hit: usize,
}

impl GridSummary {
    fn count(&mut self, record: &CellRecord) {
        match record.status {
            CellStatus::Success => self.success += 1,
            CellStatus::Failed => self.failed += 1,
            CellStatus::Skipped => self.skipped += 1,
            CellStatus::Missing => self.missing += 1,
        }
        if record.is_resume_hit() {
            self.resume_hit += 1;
        }
    }
}

/// Rectangular view of a run: one record for every declared coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct GridIndex {
    x_labels: Vec<AxisLabel>,
    y_labels: Vec<AxisLabel>,
    cells: BTreeMap<GridCoordinate, CellRecord>,
    summary: GridSummary,
}

impl GridIndex {
    pub fn x_labels(&self) -> &[AxisLabel] {
        &self.x_labels
    }

    pub fn y_labels(&self) -> &[AxisLabel] {
        &self.y_labels
    }

    pub fn summary(&self) -> &GridSummary {
        &self.summary
    }

    pub fn cell(&self, coordinate: GridCoordinate) -> Option<&CellRecord> {
        self.cells.get(&coordinate)
    }

    /// Number of cells, always `x_labels().len() * y_labels().len()`.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cells in declared order: X outer, Y inner.
    pub fn cells(&self) -> impl Iterator<Item = &CellRecord> {
        self.x_labels.iter().flat_map(move |x| {
            self.y_labels
                .iter()
                .filter_map(move |y| self.cells.get(&GridCoordinate::new(x.index, y.index)))
        })
    }
}

impl Serialize for GridIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        struct DeclaredCells<'a>(&'a GridIndex);

        impl Serialize for DeclaredCells<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_seq(self.0.cells())
            }
        }

        let mut state = serializer.serialize_struct("GridIndex", 4)?;
        state.serialize_field("x_labels", &self.x_labels)?;
        state.serialize_field("y_labels", &self.y_labels)?;
        state.serialize_field("summary", &self.summary)?;
        state.serialize_field("cells", &DeclaredCells(self))?;
        state.end()
    }
}

/// Build the dense grid declared by `descriptor` from the logged `records`.
///
/// Coordinates without a record get a [`CellStatus::Missing`] placeholder; records outside
/// the declared space are only used for labels.
///
/// An axis value is labelled by the record with the lowest complementary index that shares
/// it. When that record carries no label, or no record shares it, the index itself is used.
pub fn build_grid(descriptor: &RunDescriptor, records: &CellRecords) -> GridIndex {
    let selection = &descriptor.selection;

    // Records iterate by ascending (x, y): the first record seen for an x has the lowest y,
    // and the first seen for a y has the lowest x.
    let mut x_names: BTreeMap<u32, Option<String>> = BTreeMap::new();
    let mut y_names: BTreeMap<u32, Option<String>> = BTreeMap::new();
    for record in records.values() {
        let coordinate = record.coordinate;
        x_names
            .entry(coordinate.x_index)
            .or_insert_with(|| record.x_fields.label());
        y_names.entry(coordinate.y_index).or_insert_with(|| {
            let y_label = record.y_value.trim();
            (!y_label.is_empty()).then(|| y_label.to_string())
        });
    }

    let axis = |indexes: &[u32], names: &BTreeMap<u32, Option<String>>| -> Vec<AxisLabel> {
        indexes
            .iter()
            .map(|index| AxisLabel {
                index: *index,
                label: names
                    .get(index)
                    .cloned()
                    .flatten()
                    .unwrap_or_else(|| index.to_string()),
            })
            .collect()
    };
    let x_labels = axis(selection.x_indexes(), &x_names);
    let y_labels = axis(selection.y_indexes(), &y_names);

    let mut cells = BTreeMap::new();
    let mut summary = GridSummary::default();
    for x in selection.x_indexes() {
        for y in selection.y_indexes() {
            let coordinate = GridCoordinate::new(*x, *y);
            let record = records
                .get(&coordinate)
                .cloned()
                .unwrap_or_else(|| CellRecord::missing(coordinate));
            summary.count(&record);
            cells.insert(coordinate, record);
        }
    }

    GridIndex {
        x_labels,
        y_labels,
        cells,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{descriptor::Selection, event_log::parse_event_bytes};

    fn descriptor(x: Vec<u32>, y: Vec<u32>) -> RunDescriptor {
        let mut descriptor =
            RunDescriptor::from_value(&json!({"run_id": "r", "created_at": "t"})).unwrap();
        descriptor.selection = Selection::new(x, y);
        descriptor
    }

    fn log(lines: &[serde_json::Value]) -> CellRecords {
        let content: Vec<String> = lines.iter().map(ToString::to_string).collect();
        parse_event_bytes(content.join("\n").as_bytes())
    }

    #[test]
    fn synthesizes_missing_cells() {
        let records = log(&[json!({"x_index": 0, "y_index": 0, "status": "success"})]);
        let grid = build_grid(&descriptor(vec![0, 1], vec![0]), &records);

        assert_eq!(grid.len(), 2);
        assert_eq!(
            grid.cell(GridCoordinate::new(0, 0)).unwrap().status,
            CellStatus::Success
        );
        let missing = grid.cell(GridCoordinate::new(1, 0)).unwrap();
        assert_eq!(*missing, CellRecord::missing(GridCoordinate::new(1, 0)));
        assert_eq!(grid.summary().success, 1);
        assert_eq!(grid.summary().missing, 1);
    }

    #[test]
    fn complete_regardless_of_log_size() {
        let d = descriptor(vec![3, 1, 2], vec![5, 4]);
        let empty = build_grid(&d, &CellRecords::new());
        assert_eq!(empty.len(), 6);
        assert_eq!(empty.summary().missing, 6);

        let mut lines = Vec::new();
        for x in 0..10 {
            for y in 0..10 {
                lines.push(json!({"x_index": x, "y_index": y, "status": "success"}));
            }
        }
        let full = build_grid(&d, &log(&lines));
        assert_eq!(full.len(), 6);
        assert_eq!(full.summary().success, 6);
    }

    #[test]
    fn declared_order_is_kept() {
        let grid = build_grid(&descriptor(vec![2, 0], vec![1, 0]), &CellRecords::new());
        let order: Vec<(u32, u32)> = grid
            .cells()
            .map(|cell| (cell.coordinate.x_index, cell.coordinate.y_index))
            .collect();
        assert_eq!(order, vec![(2, 1), (2, 0), (0, 1), (0, 0)]);
        let x: Vec<&str> = grid.x_labels().iter().map(|l| l.label.as_str()).collect();
        assert_eq!(x, vec!["2", "0"]);
    }

    #[test]
    fn labels_use_lowest_complementary_index() {
        let records = log(&[
            json!({"x_index": 0, "y_index": 2, "y_value": "artist:late",
                   "x_fields": {"characters": "late", "series": ""}}),
            json!({"x_index": 0, "y_index": 1, "y_value": "artist:b",
                   "x_fields": {"characters": "miku", "series": "vocaloid", "gender": " "}}),
            json!({"x_index": 1, "y_index": 0, "y_value": "artist:a",
                   "x_fields": {"characters": "rin", "rating": "general"}}),
            json!({"x_index": 2, "y_index": 0, "y_value": "artist:other"}),
        ]);
        let grid = build_grid(&descriptor(vec![0, 1, 5], vec![0, 1, 2, 7]), &records);

        let x: Vec<&str> = grid.x_labels().iter().map(|l| l.label.as_str()).collect();
        assert_eq!(x, vec!["miku / vocaloid", "rin / general", "5"]);
        let y: Vec<&str> = grid.y_labels().iter().map(|l| l.label.as_str()).collect();
        assert_eq!(y, vec!["artist:a", "artist:b", "artist:late", "7"]);
    }

    #[test]
    fn unlabelled_first_match_falls_back_to_index() {
        let records = log(&[
            json!({"x_index": 0, "y_index": 0, "y_value": "  ",
                   "x_fields": {"characters": "", "rating": ""}}),
            json!({"x_index": 0, "y_index": 1, "y_value": "artist:b",
                   "x_fields": {"characters": "miku"}}),
            json!({"x_index": 1, "y_index": 0, "y_value": "artist:a"}),
        ]);
        let grid = build_grid(&descriptor(vec![0, 1], vec![0, 1]), &records);

        let x: Vec<&str> = grid.x_labels().iter().map(|l| l.label.as_str()).collect();
        assert_eq!(x, vec!["0", "1"]);
        let y: Vec<&str> = grid.y_labels().iter().map(|l| l.label.as_str()).collect();
        assert_eq!(y, vec!["0", "artist:b"]);
    }

    #[test]
    fn rebuilding_is_byte_identical() {
        let records = log(&[
            json!({"x_index": 1, "y_index": 0, "status": "failed", "error": {"code": "x", "context": {"b": 1, "a": 2}}}),
            json!({"x_index": 0, "y_index": 0, "status": "skipped", "skip_reason": "resume_hit"}),
        ]);
        let d = descriptor(vec![0, 1], vec![0, 1]);
        let first = build_grid(&d, &records);
        let second = build_grid(&d, &records);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
        assert_eq!(first.summary().resume_hit, 1);
    }

    #[test]
    fn serializes_cells_in_declared_order() {
        let grid = build_grid(&descriptor(vec![1, 0], vec![0]), &CellRecords::new());
        let value = serde_json::to_value(&grid).unwrap();
        assert_eq!(value["cells"][0]["x_index"], 1);
        assert_eq!(value["cells"][0]["status"], "missing");
        assert_eq!(value["cells"][1]["x_index"], 0);
        assert_eq!(value["summary"]["missing"], 2);
    }
}
