//! Evaluation snapshots: one immutable history entry.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::digest::rubric_digest;
use super::error::{EvalmarkError, Result};
use super::record::EvaluationRecord;
use super::rubric::Rubric;

/// A rubric-in-effect plus the records and per-criterion scores computed
/// under it at a point in time.
///
/// The rubric is captured by value: later edits to (or deletion of) the live
/// rubric never alter history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    /// When the evaluation was recorded.
    pub date: DateTime<Utc>,

    /// Value copy of the rubric used for scoring.
    #[serde(alias = "benchmark")]
    pub rubric: Rubric,

    /// Digest of `rubric` at capture time.
    pub rubric_digest: String,

    /// Evaluated samples.
    #[serde(alias = "data")]
    pub records: Vec<EvaluationRecord>,

    /// Aggregated score per criterion name.
    pub scores: BTreeMap<String, f64>,
}

impl Snapshot {
    /// Capture a snapshot dated now.
    pub fn capture(
        rubric: &Rubric,
        records: Vec<EvaluationRecord>,
        scores: BTreeMap<String, f64>,
    ) -> Result<Self> {
        Self::capture_at(Utc::now(), rubric, records, scores)
    }

    /// Capture a snapshot with an explicit date.
    ///
    /// Fails with `EvalmarkError::NonFiniteNumber` when a score or a record
    /// value is NaN or infinite, since JSON cannot carry it back.
    pub fn capture_at(
        date: DateTime<Utc>,
        rubric: &Rubric,
        records: Vec<EvaluationRecord>,
        scores: BTreeMap<String, f64>,
    ) -> Result<Self> {
        if !scores.values().all(|v| v.is_finite()) || !records.iter().all(|r| r.is_finite()) {
            return Err(EvalmarkError::NonFiniteNumber);
        }
        Ok(Self {
            date,
            rubric_digest: rubric_digest(rubric)?,
            rubric: rubric.clone(),
            records,
            scores,
        })
    }

    /// Score for a criterion, `0` when absent.
    pub fn score(&self, criterion: &str) -> f64 {
        self.scores.get(criterion).copied().unwrap_or(0.0)
    }
}
