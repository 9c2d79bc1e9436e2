//! Run descriptor loading and normalization.
//!
//! Only the two identity fields (`run_id`, `created_at`) are mandatory. Every other field
//! falls back to zero, null or empty so that partially written or older descriptors still
//! produce a usable view.

use std::{fs, io, path::Path};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::{DESCRIPTOR_FILE, coerce, prelude::*, run_id::RunId};

/// Normalized `run.json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunDescriptor {
    /// Identifier written by the producer; not necessarily the directory name.
    pub run_id: String,
    /// Creation time as recorded.
    pub created_at: String,
    /// `created_at` parsed as RFC 3339, when it is.
    pub created_at_utc: Option<DateTime<Utc>>,
    pub provenance: Provenance,
    pub execution: ExecutionParams,
    pub selection: Selection,
    pub generation_overrides: GenerationSettings,
}

/// Where the run's inputs came from.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Provenance {
    pub dry_run: bool,
    pub run_dir: String,
    pub x_json_path: String,
    pub y_json_path: String,
    pub x_json_sha256: String,
    pub y_json_sha256: String,
    pub template: String,
    pub workflow_json_path: Option<String>,
    pub workflow_json_sha256: String,
    pub workflow_status: String,
    pub selected_ksampler_node_id: Option<String>,
    pub comfyui_base_url: String,
    pub client_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExecutionParams {
    pub request_timeout_s: f64,
    pub job_timeout_s: f64,
    pub concurrency: u64,
    pub base_seed: u64,
    pub seed_strategy: String,
}

/// Generation parameters; `None` means "use the workflow default".
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GenerationSettings {
    pub negative_prompt: Option<String>,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub batch_size: Option<i64>,
    pub steps: Option<i64>,
    pub cfg: Option<f64>,
    pub denoise: Option<f64>,
    pub sampler_name: Option<String>,
    pub scheduler: Option<String>,
}

impl GenerationSettings {
    pub(crate) fn from_object(object: &Map<String, Value>) -> Self {
        Self {
            negative_prompt: coerce::string(object.get("negative_prompt")),
            width: coerce::int(object.get("width")),
            height: coerce::int(object.get("height")),
            batch_size: coerce::int(object.get("batch_size")),
            steps: coerce::int(object.get("steps")),
            cfg: coerce::float(object.get("cfg")),
            denoise: coerce::float(object.get("denoise")),
            sampler_name: coerce::string(object.get("sampler_name")),
            scheduler: coerce::string(object.get("scheduler")),
        }
    }
}

/// Bilingual description of an X row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Description {
    pub zh: String,
    pub en: String,
}

impl Description {
    pub(crate) fn from_value(value: Option<&Value>) -> Self {
        match value.and_then(Value::as_object) {
            Some(object) => Self {
                zh: coerce::string_or_empty(object.get("zh")),
                en: coerce::string_or_empty(object.get("en")),
            },
            None => Self::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.zh.trim().is_empty() && self.en.trim().is_empty()
    }
}

/// Per-column information recorded for each selected X row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct XColumn {
    pub x_index: u32,
    pub info_type: Option<String>,
    pub description: Description,
}

/// The declared coordinate space of a run.
///
/// Index lists keep declared order and hold no duplicates, so the grid always has exactly
/// `x_count * y_count` cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Selection {
    x_indexes: Vec<u32>,
    y_indexes: Vec<u32>,
    pub x_count: usize,
    pub y_count: usize,
    pub total_cells: usize,
    pub x_columns: Vec<XColumn>,
    pub x_limit: Option<i64>,
    pub y_limit: Option<i64>,
    pub x_indexes_raw: Option<String>,
    pub y_indexes_raw: Option<String>,
}

impl Selection {
    /// Build a selection from index lists; duplicates after the first occurrence are dropped.
    pub fn new(x_indexes: Vec<u32>, y_indexes: Vec<u32>) -> Self {
        let x_indexes = dedup_in_order(x_indexes);
        let y_indexes = dedup_in_order(y_indexes);
        Self {
            x_count: x_indexes.len(),
            y_count: y_indexes.len(),
            total_cells: x_indexes.len() * y_indexes.len(),
            x_indexes,
            y_indexes,
            ..Default::default()
        }
    }

    pub fn x_indexes(&self) -> &[u32] {
        &self.x_indexes
    }

    pub fn y_indexes(&self) -> &[u32] {
        &self.y_indexes
    }

    fn from_value(value: Option<&Value>) -> Self {
        let empty = Map::new();
        let object = value.and_then(Value::as_object).unwrap_or(&empty);

        let mut selection = Self::new(
            index_list(object.get("x_indexes")),
            index_list(object.get("y_indexes")),
        );
        for (axis, key, derived) in [
            ("x", "x_count", selection.x_count),
            ("y", "y_count", selection.y_count),
        ] {
            match coerce::unsigned(object.get(key)) {
                Some(recorded) if recorded as usize == derived => {}
                recorded => debug!("Recorded {axis} count {recorded:?} replaced by {derived}"),
            }
        }

        selection.x_columns = object
            .get("x_columns")
            .and_then(Value::as_array)
            .map(|columns| columns.iter().filter_map(x_column).collect())
            .unwrap_or_default();
        selection.x_limit = coerce::int(object.get("x_limit"));
        selection.y_limit = coerce::int(object.get("y_limit"));
        selection.x_indexes_raw = coerce::string(object.get("x_indexes_raw"));
        selection.y_indexes_raw = coerce::string(object.get("y_indexes_raw"));
        selection
    }
}

fn dedup_in_order(indexes: Vec<u32>) -> Vec<u32> {
    let mut seen = std::collections::HashSet::with_capacity(indexes.len());
    indexes.into_iter().filter(|index| seen.insert(*index)).collect()
}

fn index_list(value: Option<&Value>) -> Vec<u32> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(|item| coerce::index(Some(item))).collect())
        .unwrap_or_default()
}

fn x_column(value: &Value) -> Option<XColumn> {
    let object = value.as_object()?;
    Some(XColumn {
        x_index: coerce::index(object.get("x_index"))?,
        info_type: coerce::text(object.get("type")),
        description: Description::from_value(object.get("description")),
    })
}

impl RunDescriptor {
    /// Normalize a descriptor from its JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(&value)
    }

    /// Normalize a descriptor from a parsed JSON value.
    pub fn from_value(value: &Value) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or(Error::DescriptorMalformed("descriptor is not an object"))?;
        let run_id = coerce::text(object.get("run_id"))
            .ok_or(Error::DescriptorMalformed("missing run_id"))?;
        let created_at = coerce::text(object.get("created_at"))
            .ok_or(Error::DescriptorMalformed("missing created_at"))?;

        let provenance = Provenance {
            dry_run: coerce::boolean(object.get("dry_run")).unwrap_or(false),
            run_dir: coerce::string_or_empty(object.get("run_dir")),
            x_json_path: coerce::string_or_empty(object.get("x_json_path")),
            y_json_path: coerce::string_or_empty(object.get("y_json_path")),
            x_json_sha256: coerce::string_or_empty(object.get("x_json_sha256")),
            y_json_sha256: coerce::string_or_empty(object.get("y_json_sha256")),
            template: coerce::string_or_empty(object.get("template")),
            workflow_json_path: coerce::text(object.get("workflow_json_path")),
            workflow_json_sha256: coerce::string_or_empty(object.get("workflow_json_sha256")),
            workflow_status: coerce::string_or_empty(object.get("workflow_status")),
            selected_ksampler_node_id: coerce::text(object.get("selected_ksampler_node_id")),
            comfyui_base_url: coerce::string_or_empty(object.get("comfyui_base_url")),
            client_id: coerce::string_or_empty(object.get("client_id")),
        };
        let execution = ExecutionParams {
            request_timeout_s: coerce::float(object.get("request_timeout_s")).unwrap_or(0.0),
            job_timeout_s: coerce::float(object.get("job_timeout_s")).unwrap_or(0.0),
            concurrency: coerce::unsigned(object.get("concurrency")).unwrap_or(0),
            base_seed: coerce::unsigned(object.get("base_seed")).unwrap_or(0),
            seed_strategy: coerce::string_or_empty(object.get("seed_strategy")),
        };
        let generation_overrides = object
            .get("generation_overrides")
            .and_then(Value::as_object)
            .map(GenerationSettings::from_object)
            .unwrap_or_default();

        Ok(Self {
            created_at_utc: coerce::timestamp(object.get("created_at")),
            run_id,
            created_at,
            provenance,
            execution,
            selection: Selection::from_value(object.get("selection")),
            generation_overrides,
        })
    }
}

/// Read and normalize the descriptor of `run_id` under `storage_root`.
///
/// A missing file is [`Error::DescriptorMissing`]; invalid JSON is
/// [`Error::DescriptorUnreadable`]; a non-object or missing identity field is
/// [`Error::DescriptorMalformed`].
pub fn load_descriptor(storage_root: &Path, run_id: &RunId) -> Result<RunDescriptor> {
    let path = storage_root.join(run_id.as_str()).join(DESCRIPTOR_FILE);
    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Err(Error::DescriptorMissing),
        Err(err) => return Err(err.into()),
    };
    let value: Value = serde_json::from_slice(&bytes)?;
    RunDescriptor::from_value(&value)
}
