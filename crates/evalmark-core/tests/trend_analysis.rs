use std::collections::BTreeMap;

use chrono::{Duration, TimeZone, Utc};
use evalmark_core::{
    analyze, classify_suggestion, improvement_percentage, trajectories, find_template, Rubric,
    RubricId, Snapshot, Suggestion,
};

fn rubric() -> Rubric {
    Rubric::from_template(find_template("text-generation").expect("template"), "", "")
}

fn snapshot(rubric: &Rubric, day: i64, accuracy: f64) -> Snapshot {
    let date = Utc.with_ymd_and_hms(2026, 2, 1, 8, 0, 0).unwrap() + Duration::days(day);
    Snapshot::capture_at(
        date,
        rubric,
        vec![],
        BTreeMap::from([
            ("accuracy".to_string(), accuracy),
            ("completeness".to_string(), 3.0),
        ]),
    )
    .expect("capture")
}

#[test]
fn accuracy_two_to_three_is_significant() {
    let r = rubric();
    let history = vec![snapshot(&r, 0, 2.0), snapshot(&r, 7, 3.0)];
    let report = analyze(&history, &r.id);

    let accuracy = report
        .ranking
        .iter()
        .find(|c| c.criterion == "accuracy")
        .expect("ranked");
    assert_eq!(accuracy.improvement_pct, 50.0);
    assert_eq!(accuracy.suggestion, Suggestion::SignificantPropagate);
    assert_eq!(report.ranking[0].criterion, "accuracy");
}

#[test]
fn zero_baseline_reads_zero_improvement() {
    assert_eq!(improvement_percentage(0.0, 4.0), 0.0);

    // efficiency never scored: series of zeros, 0% and needs focus
    let r = rubric();
    let report = analyze(&[snapshot(&r, 0, 2.0), snapshot(&r, 1, 2.0)], &r.id);
    let efficiency = report
        .ranking
        .iter()
        .find(|c| c.criterion == "efficiency")
        .expect("ranked");
    assert_eq!(efficiency.improvement_pct, 0.0);
    assert_eq!(efficiency.suggestion, Suggestion::NeedsFocus);
}

#[test]
fn classification_boundaries() {
    let cases = [
        (9.9, Suggestion::NeedsFocus),
        (10.0, Suggestion::SteadyMaintain),
        (30.0, Suggestion::SteadyMaintain),
        (30.1, Suggestion::SignificantPropagate),
    ];
    for (pct, expected) in cases {
        assert_eq!(classify_suggestion(pct), expected, "pct {pct}");
    }
}

#[test]
fn snapshots_are_ordered_by_date_not_input() {
    let r = rubric();
    let history = vec![
        snapshot(&r, 3, 4.0),
        snapshot(&r, 1, 2.0),
        snapshot(&r, 2, 3.0),
    ];
    let t = trajectories(&history, &r.id);
    assert_eq!(t["accuracy"], vec![2.0, 3.0, 4.0]);
}

#[test]
fn empty_and_unknown_inputs_are_not_errors() {
    let report = analyze(&[], &RubricId::from("anything"));
    assert!(report.trajectories.is_empty());
    assert!(report.composite_series.is_empty());

    let r = rubric();
    let report = analyze(&[snapshot(&r, 0, 2.0)], &RubricId::from("other"));
    assert!(report.is_empty());
}

#[test]
fn single_snapshot_has_no_improvement() {
    let r = rubric();
    let report = analyze(&[snapshot(&r, 0, 3.0)], &r.id);
    assert_eq!(report.dates.len(), 1);
    assert!(report.ranking.iter().all(|c| c.improvement_pct == 0.0));
    assert!(!report.rubric_changed);
}
