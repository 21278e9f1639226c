//! Evaluation records and row normalization.
//!
//! Rows arrive from an ingestion collaborator (spreadsheet reader, CSV, JSON)
//! as loosely typed field maps. [`normalize_row`] coerces each one into the
//! fixed [`EvaluationRecord`] schema with explicit defaults instead of probing
//! fields dynamically at use sites.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Text fields of the record schema, in column order.
pub const TEXT_FIELDS: [&str; 6] = [
    "id",
    "prompt",
    "input",
    "output",
    "expected_output",
    "comments",
];

/// Score fields of the record schema, in column order.
pub const SCORE_FIELDS: [&str; 4] = ["llm_score", "human_score", "code_score", "benchmark_score"];

/// Mime types accepted for evaluation data uploads (xlsx, xls, csv).
pub const SUPPORTED_UPLOAD_TYPES: [&str; 3] = [
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.ms-excel",
    "text/csv",
];

/// Whether an uploaded resource of this mime type can be ingested.
pub fn is_supported_upload(mime: &str) -> bool {
    SUPPORTED_UPLOAD_TYPES.contains(&mime)
}

/// Source of a score for a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreChannel {
    Human,
    Llm,
    Code,
    /// The aggregated benchmark score.
    Composite,
}

impl ScoreChannel {
    pub const ALL: [ScoreChannel; 4] = [Self::Human, Self::Llm, Self::Code, Self::Composite];

    /// Record field holding this channel's global score.
    pub fn field_name(self) -> &'static str {
        match self {
            Self::Human => "human_score",
            Self::Llm => "llm_score",
            Self::Code => "code_score",
            Self::Composite => "benchmark_score",
        }
    }

    /// Prefix for channel-qualified per-criterion columns (`human_accuracy`).
    pub fn column_prefix(self) -> &'static str {
        match self {
            Self::Human => "human",
            Self::Llm => "llm",
            Self::Code => "code",
            Self::Composite => "benchmark",
        }
    }
}

impl std::fmt::Display for ScoreChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.column_prefix())
    }
}

impl std::str::FromStr for ScoreChannel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "human" => Ok(Self::Human),
            "llm" => Ok(Self::Llm),
            "code" => Ok(Self::Code),
            "composite" | "benchmark" => Ok(Self::Composite),
            other => Err(format!(
                "unknown score channel '{other}' (expected human, llm, code or composite)"
            )),
        }
    }
}

/// One evaluated sample.
///
/// Score fields are nominally in `[1, 4]` but are not checked against any
/// rubric at ingestion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct EvaluationRecord {
    pub id: String,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub expected_output: String,
    #[serde(default)]
    pub llm_score: f64,
    #[serde(default)]
    pub human_score: f64,
    #[serde(default)]
    pub code_score: f64,
    #[serde(default)]
    pub benchmark_score: f64,
    #[serde(default)]
    pub comments: String,

    /// Additional numeric columns carried by the source row, such as
    /// per-criterion scores (`accuracy`, `human_accuracy`).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub columns: BTreeMap<String, f64>,
}

impl EvaluationRecord {
    /// Global score for a channel.
    pub fn channel_score(&self, channel: ScoreChannel) -> f64 {
        match channel {
            ScoreChannel::Human => self.human_score,
            ScoreChannel::Llm => self.llm_score,
            ScoreChannel::Code => self.code_score,
            ScoreChannel::Composite => self.benchmark_score,
        }
    }

    /// Set the global score for a channel.
    pub fn set_channel_score(&mut self, channel: ScoreChannel, score: f64) {
        match channel {
            ScoreChannel::Human => self.human_score = score,
            ScoreChannel::Llm => self.llm_score = score,
            ScoreChannel::Code => self.code_score = score,
            ScoreChannel::Composite => self.benchmark_score = score,
        }
    }

    /// Whether every score and numeric column is finite.
    pub fn is_finite(&self) -> bool {
        ScoreChannel::ALL
            .iter()
            .all(|c| self.channel_score(*c).is_finite())
            && self.columns.values().all(|v| v.is_finite())
    }

    /// Resolve `field` for `channel`.
    ///
    /// Lookup order: the channel-qualified column `"{channel}_{field}"`, the
    /// bare column `field`, then the channel's own score when `field` names
    /// it. Returns `None` when nothing matches.
    pub fn field_score(&self, channel: ScoreChannel, field: &str) -> Option<f64> {
        let qualified = format!("{}_{}", channel.column_prefix(), field);
        if let Some(v) = self.columns.get(&qualified) {
            return Some(*v);
        }
        if let Some(v) = self.columns.get(field) {
            return Some(*v);
        }
        (field == channel.field_name()).then(|| self.channel_score(channel))
    }
}

fn coerce_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => other.to_string(),
    }
}

fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Normalize one raw row into an [`EvaluationRecord`].
///
/// `index` is the row's 0-based position; a missing or empty `id` becomes the
/// 1-based position. Absent or unparseable scores default to `0`, absent text
/// to `""`. Any other column holding a number (or numeric string) is kept in
/// [`EvaluationRecord::columns`].
pub fn normalize_row(index: usize, row: &Map<String, Value>) -> EvaluationRecord {
    let text = |field: &str| coerce_text(row.get(field));
    let score = |field: &str| row.get(field).and_then(coerce_number).unwrap_or(0.0);

    let id = match text("id") {
        s if s.trim().is_empty() => (index + 1).to_string(),
        s => s,
    };

    let columns = row
        .iter()
        .filter(|(k, _)| !TEXT_FIELDS.contains(&k.as_str()) && !SCORE_FIELDS.contains(&k.as_str()))
        .filter_map(|(k, v)| coerce_number(v).map(|n| (k.clone(), n)))
        .collect();

    EvaluationRecord {
        id,
        prompt: text("prompt"),
        input: text("input"),
        output: text("output"),
        expected_output: text("expected_output"),
        llm_score: score("llm_score"),
        human_score: score("human_score"),
        code_score: score("code_score"),
        benchmark_score: score("benchmark_score"),
        comments: text("comments"),
        columns,
    }
}

/// Normalize a sequence of rows, numbering missing ids by position.
pub fn normalize_rows(rows: &[Map<String, Value>]) -> Vec<EvaluationRecord> {
    rows.iter()
        .enumerate()
        .map(|(i, row)| normalize_row(i, row))
        .collect()
}
