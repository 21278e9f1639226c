//! Structured observability hooks for rubric and evaluation lifecycle events.
//!
//! Provides an evaluation-scoped span guard and one emit function per
//! lifecycle event. Everything is logged at `info!` except where noted.

use tracing::info;

/// RAII guard that enters a span tagged with the rubric being evaluated.
///
/// ```ignore
/// let _span = EvaluationSpan::enter("benchmark-1a2b");
/// // tracing calls here carry rubric_id = "benchmark-1a2b"
/// ```
pub struct EvaluationSpan {
    _span: tracing::span::EnteredSpan,
}

impl EvaluationSpan {
    pub fn enter(rubric_id: &str) -> Self {
        let span = tracing::info_span!("evalmark.evaluation", rubric_id = %rubric_id);
        Self {
            _span: span.entered(),
        }
    }
}

/// Emit event: rubric added to or updated in the benchmark store.
pub fn emit_rubric_saved(rubric_id: &str, criteria: usize, findings: usize) {
    info!(
        event = "rubric.saved",
        rubric_id = %rubric_id,
        criteria = criteria,
        findings = findings,
    );
}

pub fn emit_rubric_deleted(rubric_id: &str, was_active: bool) {
    info!(event = "rubric.deleted", rubric_id = %rubric_id, was_active = was_active);
}

pub fn emit_rubric_imported(rubric_id: &str, name: &str, criteria: usize) {
    info!(
        event = "rubric.imported",
        rubric_id = %rubric_id,
        name = %name,
        criteria = criteria,
    );
}

/// Emit event: a batch was scored and appended to history.
pub fn emit_evaluation_recorded(rubric_id: &str, records: usize, mean_composite: f64) {
    info!(
        event = "evaluation.recorded",
        rubric_id = %rubric_id,
        records = records,
        mean_composite = mean_composite,
    );
}

/// Emit event: history hit its cap and dropped the oldest snapshots.
pub fn emit_history_evicted(evicted: usize, cap: usize) {
    info!(event = "history.evicted", evicted = evicted, cap = cap);
}

pub fn emit_trend_analyzed(rubric_id: &str, snapshots: usize, rubric_changed: bool) {
    info!(
        event = "trend.analyzed",
        rubric_id = %rubric_id,
        snapshots = snapshots,
        rubric_changed = rubric_changed,
    );
}

/// Emit event: persisted workspace could not be read (warning level).
pub fn emit_workspace_load_error(key: &str, error: &dyn std::fmt::Display) {
    tracing::warn!(event = "workspace.load_error", key = %key, error = %error);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluation_span_create() {
        let _span = EvaluationSpan::enter("benchmark-test");
        emit_evaluation_recorded("benchmark-test", 3, 2.5);
    }
}
