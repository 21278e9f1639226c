//! Trend analysis over evaluation history.
//!
//! Works on any slice of snapshots. Only snapshots of the requested rubric
//! are considered, ordered by date (ties keep their input order).

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::domain::rubric::RubricId;
use crate::domain::snapshot::Snapshot;
use crate::obs;

/// Improvement (percent) below which a criterion needs focus.
pub const FOCUS_THRESHOLD_PCT: f64 = 10.0;

/// Improvement (percent) above which a practice is worth propagating.
pub const SIGNIFICANT_THRESHOLD_PCT: f64 = 30.0;

/// Advice derived from a criterion's improvement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Suggestion {
    NeedsFocus,
    SteadyMaintain,
    SignificantPropagate,
}

impl Suggestion {
    pub fn label(self) -> &'static str {
        match self {
            Self::NeedsFocus => "needs focus",
            Self::SteadyMaintain => "steady, maintain",
            Self::SignificantPropagate => "significant, propagate practice",
        }
    }
}

impl std::fmt::Display for Suggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Classify an improvement percentage.
///
/// `< 10` needs focus, `10..=30` is steady, `> 30` is significant.
pub fn classify_suggestion(pct: f64) -> Suggestion {
    if pct < FOCUS_THRESHOLD_PCT {
        Suggestion::NeedsFocus
    } else if pct <= SIGNIFICANT_THRESHOLD_PCT {
        Suggestion::SteadyMaintain
    } else {
        Suggestion::SignificantPropagate
    }
}

/// `(last - first) / first × 100`, or exactly `0.0` when `first` is zero.
pub fn improvement_percentage(first: f64, last: f64) -> f64 {
    if first == 0.0 {
        return 0.0;
    }
    (last - first) / first * 100.0
}

fn matching_sorted<'a>(snapshots: &'a [Snapshot], rubric_id: &RubricId) -> Vec<&'a Snapshot> {
    let mut matching: Vec<&Snapshot> = snapshots
        .iter()
        .filter(|s| &s.rubric.id == rubric_id)
        .collect();
    matching.sort_by_key(|s| s.date);
    matching
}

fn series_for(sorted: &[&Snapshot]) -> IndexMap<String, Vec<f64>> {
    let Some(latest) = sorted.last() else {
        return IndexMap::new();
    };
    latest
        .rubric
        .criteria
        .keys()
        .map(|name| (name.clone(), sorted.iter().map(|s| s.score(name)).collect()))
        .collect()
}

/// Per-criterion score series, oldest first.
///
/// Criteria come from the latest matching snapshot's rubric; a criterion
/// absent from an older snapshot reads as 0 there.
pub fn trajectories(snapshots: &[Snapshot], rubric_id: &RubricId) -> IndexMap<String, Vec<f64>> {
    series_for(&matching_sorted(snapshots, rubric_id))
}

/// One criterion's movement between the first and last snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionTrend {
    pub criterion: String,
    pub first: f64,
    pub last: f64,
    pub improvement_pct: f64,
    pub suggestion: Suggestion,
}

impl CriterionTrend {
    fn from_series(criterion: &str, series: &[f64]) -> Self {
        let first = series.first().copied().unwrap_or(0.0);
        let last = series.last().copied().unwrap_or(0.0);
        let improvement_pct = improvement_percentage(first, last);
        Self {
            criterion: criterion.to_string(),
            first,
            last,
            improvement_pct,
            suggestion: classify_suggestion(improvement_pct),
        }
    }
}

/// Rank criteria by improvement, highest first. Ties keep trajectory order.
pub fn rank_by_improvement(trajectories: &IndexMap<String, Vec<f64>>) -> Vec<CriterionTrend> {
    let mut ranking: Vec<CriterionTrend> = trajectories
        .iter()
        .map(|(name, series)| CriterionTrend::from_series(name, series))
        .collect();
    ranking.sort_by(|a, b| b.improvement_pct.total_cmp(&a.improvement_pct));
    ranking
}

/// A snapshot's composite: its scores weighted by its own rubric.
pub fn snapshot_composite(snapshot: &Snapshot) -> f64 {
    snapshot
        .rubric
        .enabled_criteria()
        .map(|(name, c)| snapshot.score(name) * c.weight)
        .sum()
}

/// Everything the trend view needs for one rubric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendReport {
    pub rubric_id: RubricId,
    /// Dates of the analysed snapshots, oldest first.
    pub dates: Vec<DateTime<Utc>>,
    pub trajectories: IndexMap<String, Vec<f64>>,
    pub ranking: Vec<CriterionTrend>,
    pub composite_series: Vec<f64>,
    /// Whether the rubric digest differs anywhere in the series.
    pub rubric_changed: bool,
}

impl TrendReport {
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// Build a [`TrendReport`]. Empty or non-matching input yields an empty
/// report, never an error.
pub fn analyze(snapshots: &[Snapshot], rubric_id: &RubricId) -> TrendReport {
    let sorted = matching_sorted(snapshots, rubric_id);
    let trajectories = series_for(&sorted);
    let ranking = rank_by_improvement(&trajectories);
    let rubric_changed = sorted
        .windows(2)
        .any(|w| w[0].rubric_digest != w[1].rubric_digest);

    obs::emit_trend_analyzed(rubric_id.as_str(), sorted.len(), rubric_changed);

    TrendReport {
        rubric_id: rubric_id.clone(),
        dates: sorted.iter().map(|s| s.date).collect(),
        composite_series: sorted.iter().map(|s| snapshot_composite(s)).collect(),
        trajectories,
        ranking,
        rubric_changed,
    }
}
