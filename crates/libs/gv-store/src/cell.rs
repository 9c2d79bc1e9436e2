//! Cell records: one per grid coordinate.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::{
    coerce,
    descriptor::{Description, GenerationSettings},
};

/// Outcome of one grid cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CellStatus {
    Success,
    Failed,
    Skipped,
    /// Never attempted. Synthesized by the grid, never read from a log.
    #[default]
    Missing,
}

impl CellStatus {
    /// Status of a logged record.
    ///
    /// A logged record was attempted, so anything unrecognized, including a literal
    /// `"missing"`, is a failure.
    pub fn from_logged(value: Option<&str>) -> Self {
        match value {
            Some("success") => CellStatus::Success,
            Some("skipped") => CellStatus::Skipped,
            _ => CellStatus::Failed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CellStatus::Success => "success",
            CellStatus::Failed => "failed",
            CellStatus::Skipped => "skipped",
            CellStatus::Missing => "missing",
        }
    }
}

/// `(x_index, y_index)`; ordered by X, then Y.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct GridCoordinate {
    pub x_index: u32,
    pub y_index: u32,
}

impl GridCoordinate {
    pub fn new(x_index: u32, y_index: u32) -> Self {
        Self { x_index, y_index }
    }
}

/// Tag columns of an X row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct XFields {
    pub gender: String,
    pub characters: String,
    pub series: String,
    pub rating: String,
    pub general: String,
    pub quality: String,
}

impl XFields {
    const LABEL_SEPARATOR: &'static str = " / ";

    fn from_value(value: Option<&Value>) -> Self {
        let Some(object) = value.and_then(Value::as_object) else {
            return Self::default();
        };
        Self {
            gender: coerce::string_or_empty(object.get("gender")),
            characters: coerce::string_or_empty(object.get("characters")),
            series: coerce::string_or_empty(object.get("series")),
            rating: coerce::string_or_empty(object.get("rating")),
            general: coerce::string_or_empty(object.get("general")),
            quality: coerce::string_or_empty(object.get("quality")),
        }
    }

    /// Column label: characters, series, gender, rating; trimmed, empty ones skipped.
    pub fn label(&self) -> Option<String> {
        let parts: Vec<&str> = [&self.characters, &self.series, &self.gender, &self.rating]
            .into_iter()
            .map(|part| part.trim())
            .filter(|part| !part.is_empty())
            .collect();
        (!parts.is_empty()).then(|| parts.join(Self::LABEL_SEPARATOR))
    }
}

/// Error recorded for a failed cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ErrorPayload {
    /// Error class or code.
    pub kind: Option<String>,
    pub message: Option<String>,
    /// Remaining fields, non-string values rendered as compact JSON.
    pub context: BTreeMap<String, String>,
}

impl ErrorPayload {
    pub(crate) fn from_value(value: Option<&Value>) -> Option<Self> {
        match value? {
            Value::Null => None,
            Value::String(message) => Some(Self {
                message: Some(message.clone()),
                ..Default::default()
            }),
            Value::Object(object) => Some(Self::from_object(object)),
            other => Some(Self {
                message: Some(other.to_string()),
                ..Default::default()
            }),
        }
    }

    fn from_object(object: &Map<String, Value>) -> Self {
        let mut context = BTreeMap::new();
        if let Some(inner) = object.get("context").and_then(Value::as_object) {
            for (key, value) in inner {
                context.insert(key.clone(), render(value));
            }
        }
        for (key, value) in object {
            if matches!(key.as_str(), "type" | "code" | "message" | "context") {
                continue;
            }
            context.entry(key.clone()).or_insert_with(|| render(value));
        }
        Self {
            kind: coerce::text(object.get("type")).or_else(|| coerce::text(object.get("code"))),
            message: coerce::string(object.get("message")),
            context,
        }
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Generation parameters the cell was produced with.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GenerationParams {
    pub seed: Option<u64>,
    #[serde(flatten)]
    pub settings: GenerationSettings,
}

impl GenerationParams {
    pub(crate) fn from_value(value: Option<&Value>) -> Option<Self> {
        let object = value?.as_object()?;
        Some(Self {
            seed: coerce::unsigned(object.get("seed")),
            settings: GenerationSettings::from_object(object),
        })
    }
}

/// Typed record of one grid cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CellRecord {
    #[serde(flatten)]
    pub coordinate: GridCoordinate,
    pub status: CellStatus,
    pub x_fields: XFields,
    pub x_info_type: Option<String>,
    pub x_description: Description,
    pub y_value: String,
    pub positive_prompt: String,
    pub prompt_hash: String,
    /// `prompt_hash` equals the hash of the normalized `positive_prompt`.
    pub prompt_hash_verified: bool,
    pub seed: Option<u64>,
    pub generation_params: Option<GenerationParams>,
    pub workflow_hash: Option<String>,
    pub prompt_id: Option<String>,
    /// Image paths relative to the run directory.
    pub image_paths: Vec<String>,
    pub skip_reason: Option<String>,
    pub error: Option<ErrorPayload>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub elapsed_ms: Option<u64>,
}

impl CellRecord {
    /// Placeholder for a coordinate with no logged record.
    pub fn missing(coordinate: GridCoordinate) -> Self {
        Self {
            coordinate,
            ..Default::default()
        }
    }

    /// Whether this cell was skipped because an earlier attempt already succeeded.
    pub fn is_resume_hit(&self) -> bool {
        self.status == CellStatus::Skipped && self.skip_reason.as_deref() == Some("resume_hit")
    }

    pub(crate) fn from_object(coordinate: GridCoordinate, object: &Map<String, Value>) -> Self {
        let positive_prompt = coerce::string_or_empty(object.get("positive_prompt"));
        let prompt_hash = coerce::string_or_empty(object.get("prompt_hash"));
        let prompt_hash_verified =
            !prompt_hash.is_empty() && crate::prompt::prompt_hash(&positive_prompt) == prompt_hash;

        Self {
            coordinate,
            status: CellStatus::from_logged(object.get("status").and_then(Value::as_str)),
            x_fields: XFields::from_value(object.get("x_fields")),
            x_info_type: coerce::text(object.get("x_info_type")),
            x_description: Description::from_value(object.get("x_description")),
            y_value: coerce::string_or_empty(object.get("y_value")),
            positive_prompt,
            prompt_hash,
            prompt_hash_verified,
            seed: coerce::unsigned(object.get("seed")),
            generation_params: GenerationParams::from_value(object.get("generation_params")),
            workflow_hash: coerce::text(object.get("workflow_hash"))
                .or_else(|| coerce::text(object.get("workflow_json_sha256"))),
            prompt_id: coerce::text(object.get("comfyui_prompt_id")),
            image_paths: image_paths(object),
            skip_reason: coerce::text(object.get("skip_reason")),
            error: ErrorPayload::from_value(object.get("error")),
            started_at: coerce::timestamp(object.get("started_at")),
            finished_at: coerce::timestamp(object.get("finished_at")),
            elapsed_ms: coerce::unsigned(object.get("elapsed_ms")),
        }
    }
}

/// `local_image_paths` when it is a non-empty list of strings, else `local_image_path`.
fn image_paths(object: &Map<String, Value>) -> Vec<String> {
    if let Some(items) = object.get("local_image_paths").and_then(Value::as_array) {
        let paths: Option<Vec<&str>> = items.iter().map(Value::as_str).collect();
        let paths: Vec<String> = paths
            .unwrap_or_default()
            .into_iter()
            .map(str::trim)
            .filter(|path| !path.is_empty())
            .map(str::to_string)
            .collect();
        if !paths.is_empty() {
            return paths;
        }
    }
    coerce::text(object.get("local_image_path"))
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn status_never_becomes_missing() {
        assert_eq!(CellStatus::from_logged(Some("success")), CellStatus::Success);
        assert_eq!(CellStatus::from_logged(Some("skipped")), CellStatus::Skipped);
        assert_eq!(CellStatus::from_logged(Some("failed")), CellStatus::Failed);
        assert_eq!(CellStatus::from_logged(Some("bogus")), CellStatus::Failed);
        assert_eq!(CellStatus::from_logged(Some("missing")), CellStatus::Failed);
        assert_eq!(CellStatus::from_logged(None), CellStatus::Failed);
    }

    #[test]
    fn image_path_fallbacks() {
        let paths = |value| image_paths(&object(value));
        assert_eq!(
            paths(json!({"local_image_paths": [" images/x0-y0.png ", "", "images/x0-y0-1.png"]})),
            vec!["images/x0-y0.png", "images/x0-y0-1.png"]
        );
        assert_eq!(
            paths(json!({"local_image_paths": ["a.png", 3], "local_image_path": "b.png"})),
            vec!["b.png"]
        );
        assert_eq!(
            paths(json!({"local_image_paths": [], "local_image_path": "b.png"})),
            vec!["b.png"]
        );
        assert!(paths(json!({"local_image_paths": null, "local_image_path": "  "})).is_empty());
    }

    #[test]
    fn error_payload_shapes() {
        assert_eq!(ErrorPayload::from_value(Some(&json!(null))), None);
        let payload = ErrorPayload::from_value(Some(&json!({
            "code": "job_timeout",
            "message": "timed out",
            "context": {"prompt_id": "p1", "elapsed_s": 600}
        })))
        .unwrap();
        assert_eq!(payload.kind.as_deref(), Some("job_timeout"));
        assert_eq!(payload.message.as_deref(), Some("timed out"));
        assert_eq!(payload.context["prompt_id"], "p1");
        assert_eq!(payload.context["elapsed_s"], "600");

        let payload =
            ErrorPayload::from_value(Some(&json!({"type": "ValueError", "message": "bad"})))
                .unwrap();
        assert_eq!(payload.kind.as_deref(), Some("ValueError"));
        assert!(payload.context.is_empty());

        let payload = ErrorPayload::from_value(Some(&json!("boom"))).unwrap();
        assert_eq!(payload.message.as_deref(), Some("boom"));
    }

    #[test]
    fn record_from_producer_line() {
        let record = CellRecord::from_object(
            GridCoordinate::new(1, 2),
            &object(json!({
                "status": "skipped",
                "skip_reason": "resume_hit",
                "x_index": 1,
                "y_index": 2,
                "x_fields": {"gender": "1girl", "characters": "hatsune miku", "series": "vocaloid",
                             "rating": "", "general": "smile", "quality": "masterpiece"},
                "x_info_type": "character",
                "x_description": {"zh": "初音未来", "en": "Miku"},
                "y_value": "artist:foo",
                "positive_prompt": "1girl,  solo ,smile,",
                "prompt_hash": "95a7ca4cf6a1493d6512f48a9a7389d6d922a93e216f4701c53993d4feda8af0",
                "seed": 18446744073709519871u64,
                "generation_params": {"seed": 18446744073709519871u64, "steps": 28, "cfg": 5.0},
                "workflow_json_sha256": "legacy",
                "local_image_path": "images/x1-y2.png",
                "started_at": "2024-01-01T00:00:00+00:00",
                "elapsed_ms": 1234
            })),
        );
        assert!(record.is_resume_hit());
        assert!(record.prompt_hash_verified);
        assert_eq!(record.seed, Some(18446744073709519871));
        assert_eq!(record.workflow_hash.as_deref(), Some("legacy"));
        assert_eq!(record.image_paths, vec!["images/x1-y2.png"]);
        assert_eq!(record.x_fields.label().as_deref(), Some("hatsune miku / vocaloid / 1girl"));
        let params = record.generation_params.unwrap();
        assert_eq!(params.settings.steps, Some(28));
        assert_eq!(params.settings.cfg, Some(5.0));
        assert!(record.started_at.is_some());
        assert!(record.finished_at.is_none());
        assert_eq!(record.elapsed_ms, Some(1234));
    }

    #[test]
    fn missing_record_is_empty() {
        let record = CellRecord::missing(GridCoordinate::new(3, 4));
        assert_eq!(record.status, CellStatus::Missing);
        assert_eq!(record.coordinate, GridCoordinate::new(3, 4));
        assert!(record.image_paths.is_empty());
        assert!(record.error.is_none());
        assert!(!record.prompt_hash_verified);
    }
}
