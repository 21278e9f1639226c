//! Owned application stores.
//!
//! [`BenchmarkStore`] holds the rubric collection and the active pointer;
//! [`EvaluationStore`] holds evaluation history, the current evaluation and
//! recent reports. Both are plain values: load with `from_json`, mutate with
//! the command methods, save with `to_json`. Callers needing shared access
//! wrap them in a `Mutex`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::config::{EngineConfig, DEFAULT_HISTORY_CAP, DEFAULT_RECENT_REPORTS_CAP};
use crate::domain::error::{EvalmarkError, Result};
use crate::domain::record::{EvaluationRecord, ScoreChannel};
use crate::domain::rubric::{Rubric, RubricId};
use crate::domain::snapshot::Snapshot;
use crate::metrics::METRICS;
use crate::obs::{self, EvaluationSpan};
use crate::scoring::{score_batch_detailed, BatchScore, FieldMapping};
use crate::validation::{ensure_savable, RubricFinding};

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Rubric collection plus the active rubric id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkStore {
    #[serde(default)]
    benchmarks: Vec<Rubric>,
    #[serde(default)]
    active_benchmark_id: Option<RubricId>,
}

impl BenchmarkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rubric after the save-time gate.
    pub fn add(&mut self, rubric: Rubric, config: &EngineConfig) -> Result<Vec<RubricFinding>> {
        if self.get(&rubric.id).is_some() {
            return Err(EvalmarkError::DuplicateRubric(rubric.id.to_string()));
        }
        let findings = ensure_savable(&rubric, config)?;
        obs::emit_rubric_saved(rubric.id.as_str(), rubric.criteria.len(), findings.len());
        self.benchmarks.push(rubric);
        Ok(findings)
    }

    /// Edit a rubric in place.
    ///
    /// The edit is applied to a copy and only stored if it passes the
    /// save-time gate. `updated_at` is refreshed and the id is preserved.
    pub fn update<F>(
        &mut self,
        id: &RubricId,
        config: &EngineConfig,
        edit: F,
    ) -> Result<Vec<RubricFinding>>
    where
        F: FnOnce(&mut Rubric),
    {
        let slot = self
            .benchmarks
            .iter_mut()
            .find(|r| &r.id == id)
            .ok_or_else(|| EvalmarkError::RubricNotFound(id.to_string()))?;

        let mut edited = slot.clone();
        edit(&mut edited);
        edited.id = id.clone();
        edited.updated_at = Utc::now();

        let findings = ensure_savable(&edited, config)?;
        obs::emit_rubric_saved(id.as_str(), edited.criteria.len(), findings.len());
        *slot = edited;
        Ok(findings)
    }

    /// Remove a rubric, clearing the active pointer if it pointed there.
    pub fn delete(&mut self, id: &RubricId) -> Result<Rubric> {
        let index = self
            .benchmarks
            .iter()
            .position(|r| &r.id == id)
            .ok_or_else(|| EvalmarkError::RubricNotFound(id.to_string()))?;
        let removed = self.benchmarks.remove(index);

        let was_active = self.active_benchmark_id.as_ref() == Some(id);
        if was_active {
            self.active_benchmark_id = None;
        }
        obs::emit_rubric_deleted(id.as_str(), was_active);
        Ok(removed)
    }

    /// Point at a stored rubric, or clear the pointer with `None`.
    pub fn set_active(&mut self, id: Option<&RubricId>) -> Result<()> {
        if let Some(id) = id {
            self.require(id)?;
        }
        self.active_benchmark_id = id.cloned();
        Ok(())
    }

    pub fn get(&self, id: &RubricId) -> Option<&Rubric> {
        self.benchmarks.iter().find(|r| &r.id == id)
    }

    /// Like [`get`](Self::get) but fails with `RubricNotFound`.
    pub fn require(&self, id: &RubricId) -> Result<&Rubric> {
        self.get(id)
            .ok_or_else(|| EvalmarkError::RubricNotFound(id.to_string()))
    }

    pub fn active_id(&self) -> Option<&RubricId> {
        self.active_benchmark_id.as_ref()
    }

    /// The active rubric, if one is selected and still stored.
    pub fn active(&self) -> Option<&Rubric> {
        self.active_benchmark_id.as_ref().and_then(|id| self.get(id))
    }

    /// Resolve an explicit id, falling back to the active rubric.
    pub fn resolve(&self, id: Option<&RubricId>) -> Result<&Rubric> {
        match id {
            Some(id) => self.require(id),
            None => self.active().ok_or(EvalmarkError::NoActiveRubric),
        }
    }

    /// Rubrics in insertion order.
    pub fn list(&self) -> &[Rubric] {
        &self.benchmarks
    }

    pub fn len(&self) -> usize {
        self.benchmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.benchmarks.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

// ---------------------------------------------------------------------------
// Evaluations
// ---------------------------------------------------------------------------

/// A lightweight pointer to a viewed report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentReport {
    /// Short random id (9 hex chars).
    pub id: String,
    pub benchmark_id: RubricId,
    pub date: DateTime<Utc>,
    pub scores: BTreeMap<String, f64>,
}

fn short_id() -> String {
    Uuid::new_v4().simple().to_string().chars().take(9).collect()
}

fn default_history_cap() -> usize {
    DEFAULT_HISTORY_CAP
}

fn default_recent_reports_cap() -> usize {
    DEFAULT_RECENT_REPORTS_CAP
}

/// Result of [`EvaluationStore::record_evaluation`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvaluation {
    pub batch: BatchScore,
    /// The scored records as stored in the snapshot.
    pub records: Vec<EvaluationRecord>,
    /// Snapshots dropped from history to stay within the cap.
    pub evicted: Vec<Snapshot>,
}

/// Evaluation history with FIFO eviction, plus current evaluation and
/// recent reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationStore {
    #[serde(default)]
    current_evaluation: Option<Vec<EvaluationRecord>>,
    /// Append order. Eviction removes the oldest `date`, not the first entry.
    #[serde(default)]
    evaluation_history: Vec<Snapshot>,
    /// Newest first.
    #[serde(default)]
    recent_reports: Vec<RecentReport>,
    #[serde(skip, default = "default_history_cap")]
    history_cap: usize,
    #[serde(skip, default = "default_recent_reports_cap")]
    recent_reports_cap: usize,
}

impl Default for EvaluationStore {
    fn default() -> Self {
        Self {
            current_evaluation: None,
            evaluation_history: Vec::new(),
            recent_reports: Vec::new(),
            history_cap: DEFAULT_HISTORY_CAP,
            recent_reports_cap: DEFAULT_RECENT_REPORTS_CAP,
        }
    }
}

impl EvaluationStore {
    /// Empty store with caps taken from `config`.
    pub fn with_config(config: &EngineConfig) -> Self {
        let mut store = Self::default();
        store.apply_config(config);
        store
    }

    /// Adopt new caps, trimming immediately. Returns evicted snapshots.
    pub fn apply_config(&mut self, config: &EngineConfig) -> Vec<Snapshot> {
        self.history_cap = config.history_cap.max(1);
        self.recent_reports_cap = config.recent_reports_cap.max(1);
        self.recent_reports.truncate(self.recent_reports_cap);
        self.evict_over_cap()
    }

    pub fn history_cap(&self) -> usize {
        self.history_cap
    }

    fn evict_over_cap(&mut self) -> Vec<Snapshot> {
        let mut evicted = Vec::new();
        while self.evaluation_history.len() > self.history_cap {
            // min_by_key keeps the first of equal dates, so ties go in
            // append order.
            let Some(oldest) = self
                .evaluation_history
                .iter()
                .enumerate()
                .min_by_key(|(_, s)| s.date)
                .map(|(i, _)| i)
            else {
                break;
            };
            evicted.push(self.evaluation_history.remove(oldest));
        }
        if !evicted.is_empty() {
            METRICS.add_snapshots_evicted(evicted.len() as u64);
            obs::emit_history_evicted(evicted.len(), self.history_cap);
        }
        evicted
    }

    /// Append a snapshot, evicting the oldest beyond the cap.
    pub fn append_snapshot(&mut self, snapshot: Snapshot) -> Vec<Snapshot> {
        debug!(rubric_id = %snapshot.rubric.id, date = %snapshot.date, "appending snapshot");
        self.evaluation_history.push(snapshot);
        METRICS.inc_snapshots_appended();
        self.evict_over_cap()
    }

    /// Score `records` under `rubric` and append the result to history.
    ///
    /// Each record's `benchmark_score` is set to its composite, and the
    /// snapshot's scores are the per-criterion means. Non-finite results
    /// fail with `EvalmarkError::NonFiniteNumber` and leave history untouched.
    pub fn record_evaluation(
        &mut self,
        rubric: &Rubric,
        mut records: Vec<EvaluationRecord>,
        channel: ScoreChannel,
        mapping: &FieldMapping,
    ) -> Result<RecordedEvaluation> {
        let _span = EvaluationSpan::enter(rubric.id.as_str());

        let batch = score_batch_detailed(rubric, &records, channel, mapping);
        if !batch.mean_composite.is_finite() || !batch.composites.iter().all(|c| c.is_finite()) {
            return Err(EvalmarkError::NonFiniteNumber);
        }
        for (record, composite) in records.iter_mut().zip(&batch.composites) {
            record.set_channel_score(ScoreChannel::Composite, *composite);
        }

        let count = records.len();
        let snapshot = Snapshot::capture(rubric, records.clone(), batch.criterion_means.clone())?;
        let evicted = self.append_snapshot(snapshot);
        obs::emit_evaluation_recorded(rubric.id.as_str(), count, batch.mean_composite);

        Ok(RecordedEvaluation {
            batch,
            records,
            evicted,
        })
    }

    /// History in append order.
    pub fn history(&self) -> &[Snapshot] {
        &self.evaluation_history
    }

    /// Snapshots of one rubric, oldest first.
    pub fn history_for(&self, rubric_id: &RubricId) -> Vec<&Snapshot> {
        let mut matching: Vec<&Snapshot> = self
            .evaluation_history
            .iter()
            .filter(|s| &s.rubric.id == rubric_id)
            .collect();
        matching.sort_by_key(|s| s.date);
        matching
    }

    /// Most recent snapshot of one rubric.
    pub fn latest_for(&self, rubric_id: &RubricId) -> Option<&Snapshot> {
        self.history_for(rubric_id).pop()
    }

    pub fn current_evaluation(&self) -> Option<&[EvaluationRecord]> {
        self.current_evaluation.as_deref()
    }

    pub fn set_current_evaluation(&mut self, records: Vec<EvaluationRecord>) {
        self.current_evaluation = Some(records);
    }

    pub fn clear_current_evaluation(&mut self) {
        self.current_evaluation = None;
    }

    /// Record a viewed report, keeping the newest `recent_reports_cap`.
    pub fn add_recent_report(
        &mut self,
        benchmark_id: RubricId,
        scores: BTreeMap<String, f64>,
    ) -> &RecentReport {
        self.recent_reports.insert(
            0,
            RecentReport {
                id: short_id(),
                benchmark_id,
                date: Utc::now(),
                scores,
            },
        );
        self.recent_reports.truncate(self.recent_reports_cap);
        &self.recent_reports[0]
    }

    /// Recent reports, newest first.
    pub fn recent_reports(&self) -> &[RecentReport] {
        &self.recent_reports
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a saved store and apply `config` caps (trimming if needed).
    pub fn from_json(text: &str, config: &EngineConfig) -> Result<Self> {
        let mut store: Self = serde_json::from_str(text)?;
        store.apply_config(config);
        Ok(store)
    }
}
