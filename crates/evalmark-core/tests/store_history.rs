use std::collections::BTreeMap;

use chrono::{Duration, TimeZone, Utc};
use evalmark_core::{
    analyze, find_template, normalize_rows, EngineConfig, EvaluationStore, FieldMapping, Rubric,
    ScoreChannel, Snapshot,
};
use serde_json::json;

fn rubric() -> Rubric {
    Rubric::from_template(find_template("text-generation").expect("template"), "", "")
}

fn dated(rubric: &Rubric, day: i64) -> Snapshot {
    let date = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap() + Duration::days(day);
    Snapshot::capture_at(
        date,
        rubric,
        vec![],
        BTreeMap::from([("accuracy".to_string(), day as f64)]),
    )
    .expect("capture")
}

#[test]
fn eleventh_append_evicts_oldest() {
    let r = rubric();
    let mut store = EvaluationStore::with_config(&EngineConfig::default());
    for day in 1..=10 {
        assert!(store.append_snapshot(dated(&r, day)).is_empty());
    }
    assert_eq!(store.history().len(), 10);

    let evicted = store.append_snapshot(dated(&r, 11));
    assert_eq!(evicted.len(), 1);
    assert_eq!(evicted[0].date, dated(&r, 1).date);
    assert_eq!(store.history().len(), 10);
    assert!(store.history().iter().all(|s| s.date != evicted[0].date));
}

#[test]
fn history_never_exceeds_cap() {
    let r = rubric();
    let mut store = EvaluationStore::with_config(&EngineConfig::default().with_history_cap(4));
    for day in (0..25).rev() {
        store.append_snapshot(dated(&r, day));
        assert!(store.history().len() <= 4);
    }
}

#[test]
fn history_is_immune_to_later_rubric_edits() {
    let mut r = rubric();
    let mut store = EvaluationStore::default();
    store.append_snapshot(dated(&r, 0));

    r.set_weight("accuracy", 0.9).expect("known criterion");
    r.rename("edited");

    let snap = &store.history()[0];
    assert_eq!(snap.rubric.criteria["accuracy"].weight, 0.4);
    assert_ne!(snap.rubric.name, "edited");
}

#[test]
fn recorded_evaluations_feed_trends() {
    let r = rubric();
    let mapping = FieldMapping::by_criterion_name(&r);
    let mut store = EvaluationStore::default();

    for accuracy in [2, 3] {
        let rows = vec![json!({"accuracy": accuracy, "completeness": 3, "efficiency": 3})
            .as_object()
            .cloned()
            .expect("object")];
        let out = store
            .record_evaluation(&r, normalize_rows(&rows), ScoreChannel::Human, &mapping)
            .expect("record");
        assert!(out.evicted.is_empty());
        // Dates must differ for ordering.
        std::thread::sleep(std::time::Duration::from_millis(2));
    }

    let report = analyze(store.history(), &r.id);
    assert_eq!(report.trajectories["accuracy"], vec![2.0, 3.0]);
    assert_eq!(report.ranking[0].criterion, "accuracy");
    assert!(!report.rubric_changed);
}
