//! Weighted scoring and aggregation.
//!
//! A composite score is Σ `score × weight` over the rubric's enabled criteria.
//! There is no renormalization and no rounding: a rubric whose weights do not
//! sum to 1.0 produces composites on a correspondingly scaled range.
//!
//! Diagnostics never fail a computation. They are returned as
//! [`AggregationWarning`] values and logged at `debug`.

use std::collections::{BTreeMap, HashMap};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::domain::error::{EvalmarkError, Result};
use crate::domain::record::{EvaluationRecord, ScoreChannel};
use crate::domain::rubric::Rubric;
use crate::metrics::METRICS;

/// Score range accepted from an uploaded per-criterion sheet.
pub const UPLOAD_SCORE_RANGE: std::ops::RangeInclusive<f64> = 0.0..=4.0;

/// Non-fatal diagnostic raised while aggregating.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AggregationWarning {
    /// An enabled criterion had no score; it contributed 0.
    UnscoredCriterion { criterion: String },
    /// A score was supplied for a name the rubric does not define.
    UnknownCriterion { name: String },
    /// A score was supplied for a disabled criterion and ignored.
    DisabledCriterion { criterion: String },
}

impl std::fmt::Display for AggregationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnscoredCriterion { criterion } => {
                write!(f, "criterion '{criterion}' was not scored")
            }
            Self::UnknownCriterion { name } => write!(f, "unknown criterion '{name}' ignored"),
            Self::DisabledCriterion { criterion } => {
                write!(f, "criterion '{criterion}' is disabled; score ignored")
            }
        }
    }
}

/// Composite score with its per-criterion parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub composite: f64,
    /// `score × weight` per scored enabled criterion, in rubric order.
    pub contributions: IndexMap<String, f64>,
    pub warnings: Vec<AggregationWarning>,
}

/// Weighted composite for one record's per-criterion scores.
///
/// Only enabled criteria present in both `rubric` and `scores` contribute.
/// Unknown names are ignored.
pub fn score_record(rubric: &Rubric, scores: &HashMap<String, f64>) -> f64 {
    rubric
        .enabled_criteria()
        .filter_map(|(name, c)| scores.get(name).map(|s| s * c.weight))
        .sum()
}

/// [`score_record`] plus contributions and warnings.
pub fn score_record_detailed(rubric: &Rubric, scores: &HashMap<String, f64>) -> ScoreBreakdown {
    let mut contributions = IndexMap::new();
    let mut warnings = Vec::new();

    for (name, criterion) in &rubric.criteria {
        match (criterion.enabled, scores.get(name)) {
            (true, Some(score)) => {
                contributions.insert(name.clone(), score * criterion.weight);
            }
            (true, None) => warnings.push(AggregationWarning::UnscoredCriterion {
                criterion: name.clone(),
            }),
            (false, Some(_)) => warnings.push(AggregationWarning::DisabledCriterion {
                criterion: name.clone(),
            }),
            (false, None) => {}
        }
    }

    let mut unknown: Vec<&String> = scores
        .keys()
        .filter(|name| !rubric.criteria.contains_key(name.as_str()))
        .collect();
    unknown.sort();
    warnings.extend(
        unknown
            .into_iter()
            .map(|name| AggregationWarning::UnknownCriterion { name: name.clone() }),
    );

    for warning in &warnings {
        debug!(rubric_id = %rubric.id, warning = %warning, "aggregation warning");
    }

    ScoreBreakdown {
        composite: contributions.values().sum(),
        contributions,
        warnings,
    }
}

// ---------------------------------------------------------------------------
// Field mapping
// ---------------------------------------------------------------------------

/// Binds one record field to one rubric criterion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldBinding {
    pub field: String,
    pub criterion: String,
}

/// Caller-supplied field → criterion bindings used to pull per-criterion
/// scores out of records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    bindings: Vec<FieldBinding>,
}

impl FieldMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a binding. Later bindings for the same criterion win when both
    /// resolve.
    pub fn bind(mut self, field: impl Into<String>, criterion: impl Into<String>) -> Self {
        self.bindings.push(FieldBinding {
            field: field.into(),
            criterion: criterion.into(),
        });
        self
    }

    /// Every enabled criterion reads the channel's own score field, so each
    /// record's composite is its channel score times the enabled weight sum.
    pub fn uniform(rubric: &Rubric, channel: ScoreChannel) -> Self {
        rubric
            .enabled_criteria()
            .fold(Self::new(), |m, (name, _)| m.bind(channel.field_name(), name.clone()))
    }

    /// Every enabled criterion reads the column of the same name.
    pub fn by_criterion_name(rubric: &Rubric) -> Self {
        rubric
            .enabled_criteria()
            .fold(Self::new(), |m, (name, _)| m.bind(name.clone(), name.clone()))
    }

    pub fn bindings(&self) -> &[FieldBinding] {
        &self.bindings
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Resolve per-criterion scores for one record.
    pub fn extract(&self, record: &EvaluationRecord, channel: ScoreChannel) -> HashMap<String, f64> {
        self.bindings
            .iter()
            .filter_map(|b| {
                record
                    .field_score(channel, &b.field)
                    .map(|v| (b.criterion.clone(), v))
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Batches
// ---------------------------------------------------------------------------

/// Composite scores for a batch of records, in input order.
pub fn score_batch(
    rubric: &Rubric,
    records: &[EvaluationRecord],
    channel: ScoreChannel,
    mapping: &FieldMapping,
) -> Vec<f64> {
    METRICS.add_records_scored(records.len() as u64);
    records
        .iter()
        .map(|r| score_record(rubric, &mapping.extract(r, channel)))
        .collect()
}

/// Batch aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchScore {
    /// One composite per record, in input order.
    pub composites: Vec<f64>,
    /// Mean of `composites`; 0 for an empty batch.
    pub mean_composite: f64,
    /// Mean score per criterion over the records where it was scored.
    pub criterion_means: BTreeMap<String, f64>,
    /// Distinct warnings across the batch, first occurrence order.
    pub warnings: Vec<AggregationWarning>,
}

/// [`score_batch`] plus per-criterion means and merged warnings.
pub fn score_batch_detailed(
    rubric: &Rubric,
    records: &[EvaluationRecord],
    channel: ScoreChannel,
    mapping: &FieldMapping,
) -> BatchScore {
    let mut composites = Vec::with_capacity(records.len());
    let mut sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    let mut warnings: Vec<AggregationWarning> = Vec::new();

    for record in records {
        let scores = mapping.extract(record, channel);
        for (name, _) in rubric.enabled_criteria() {
            if let Some(score) = scores.get(name) {
                let entry = sums.entry(name.clone()).or_insert((0.0, 0));
                entry.0 += score;
                entry.1 += 1;
            }
        }

        let breakdown = score_record_detailed(rubric, &scores);
        composites.push(breakdown.composite);
        for w in breakdown.warnings {
            if !warnings.contains(&w) {
                warnings.push(w);
            }
        }
    }
    METRICS.add_records_scored(records.len() as u64);

    let mean_composite = if composites.is_empty() {
        0.0
    } else {
        composites.iter().sum::<f64>() / composites.len() as f64
    };
    let criterion_means = sums
        .into_iter()
        .map(|(name, (sum, n))| (name, sum / n as f64))
        .collect();

    BatchScore {
        composites,
        mean_composite,
        criterion_means,
        warnings,
    }
}

// ---------------------------------------------------------------------------
// Uploaded per-criterion sheets
// ---------------------------------------------------------------------------

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Read per-criterion scores from the first row of an uploaded sheet.
///
/// Only columns named after a rubric criterion with a numeric value in
/// `[0, 4]` are taken.
///
/// # Errors
///
/// - `EvalmarkError::EmptySheet`: `rows` is empty.
/// - `EvalmarkError::NoValidScores`: no column qualified.
pub fn extract_criterion_scores(
    rubric: &Rubric,
    rows: &[Map<String, Value>],
) -> Result<HashMap<String, f64>> {
    let first = rows.first().ok_or(EvalmarkError::EmptySheet)?;

    let scores: HashMap<String, f64> = rubric
        .criteria
        .keys()
        .filter_map(|name| {
            first
                .get(name)
                .and_then(numeric)
                .filter(|v| UPLOAD_SCORE_RANGE.contains(v))
                .map(|v| (name.clone(), v))
        })
        .collect();

    if scores.is_empty() {
        return Err(EvalmarkError::NoValidScores);
    }
    Ok(scores)
}
