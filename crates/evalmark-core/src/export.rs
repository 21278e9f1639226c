//! Tabular export and CSV I/O.
//!
//! Tables are plain row structs so any sheet writer can consume them; CSV is
//! provided directly through the `csv` crate.

use std::collections::HashMap;
use std::io;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::domain::error::{EvalmarkError, ImportFormatError, Result};
use crate::domain::record::{EvaluationRecord, ScoreChannel};
use crate::domain::rubric::Rubric;
use crate::scoring::{score_record, FieldMapping};
use crate::validation::from_imported_file;

/// Dimension label of the trailing summary row.
pub const TOTAL_ROW: &str = "Total";

/// One line of a score sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRow {
    pub dimension: String,
    pub score: f64,
    pub weight: f64,
    pub weighted_score: f64,
}

impl ScoreRow {
    fn total(composite: f64) -> Self {
        Self {
            dimension: TOTAL_ROW.to_string(),
            score: composite,
            weight: 1.0,
            weighted_score: composite,
        }
    }
}

fn scored_rows(rubric: &Rubric, scores: &HashMap<String, f64>) -> Vec<ScoreRow> {
    rubric
        .enabled_criteria()
        .filter_map(|(name, c)| {
            scores.get(name).map(|s| ScoreRow {
                dimension: name.clone(),
                score: *s,
                weight: c.weight,
                weighted_score: s * c.weight,
            })
        })
        .collect()
}

/// One row per scored enabled criterion, in rubric order, then a `Total` row
/// carrying the composite with weight 1.
pub fn score_table(rubric: &Rubric, scores: &HashMap<String, f64>) -> Vec<ScoreRow> {
    let mut rows = scored_rows(rubric, scores);
    rows.push(ScoreRow::total(score_record(rubric, scores)));
    rows
}

/// A score-sheet line attributed to one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordRow {
    pub record_id: String,
    pub dimension: String,
    pub score: f64,
    pub weight: f64,
    pub weighted_score: f64,
}

/// [`score_table`] for every record, flattened and tagged with the record id.
pub fn record_table(
    rubric: &Rubric,
    records: &[EvaluationRecord],
    channel: ScoreChannel,
    mapping: &FieldMapping,
) -> Vec<RecordRow> {
    records
        .iter()
        .flat_map(|record| {
            let scores = mapping.extract(record, channel);
            score_table(rubric, &scores)
                .into_iter()
                .map(|row| RecordRow {
                    record_id: record.id.clone(),
                    dimension: row.dimension,
                    score: row.score,
                    weight: row.weight,
                    weighted_score: row.weighted_score,
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

/// One line of the criteria sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriteriaRow {
    pub dimension: String,
    pub description: String,
    pub weight: f64,
}

/// Criteria sheet for a rubric, in display order. Level text is not
/// exported.
pub fn criteria_table(rubric: &Rubric) -> Vec<CriteriaRow> {
    rubric
        .criteria
        .iter()
        .map(|(name, c)| CriteriaRow {
            dimension: name.clone(),
            description: c.description.clone(),
            weight: c.weight,
        })
        .collect()
}

/// Rebuild a rubric from a criteria sheet through the import path.
///
/// Levels revert to the default scale.
pub fn rubric_from_criteria_table(
    name: &str,
    description: &str,
    rows: &[CriteriaRow],
) -> std::result::Result<Rubric, ImportFormatError> {
    let criteria: Map<String, Value> = rows
        .iter()
        .map(|row| {
            (
                row.dimension.clone(),
                json!({ "weight": row.weight, "description": row.description }),
            )
        })
        .collect();
    from_imported_file(&json!({
        "name": name,
        "description": description,
        "criteria": criteria,
    }))
}

/// Blank row users fill in to supply evaluation data.
pub fn evaluation_template_row() -> Map<String, Value> {
    let row = json!({
        "id": "template_1",
        "prompt": "example prompt",
        "input": "example input",
        "output": "example actual output",
        "expected_output": "example expected output",
        "llm_score": 0,
        "human_score": 0,
        "code_score": 0,
        "benchmark_score": 0,
        "comments": "",
    });
    match row {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

/// Serialize rows as CSV with a header line.
pub fn write_csv<W: io::Write, T: Serialize>(writer: W, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Serialize rows to a CSV string.
pub fn to_csv_string<T: Serialize>(rows: &[T]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for row in rows {
        wtr.serialize(row)?;
    }
    let data = wtr
        .into_inner()
        .map_err(|e| EvalmarkError::Io(e.into_error()))?;
    String::from_utf8(data)
        .map_err(|e| EvalmarkError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))
}

/// Deserialize typed rows from headed CSV.
pub fn read_csv<R: io::Read, T: DeserializeOwned>(reader: R) -> Result<Vec<T>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut rows = Vec::new();
    for row in rdr.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

/// Read headed CSV into raw field maps for [`crate::domain::normalize_row`].
///
/// Every cell is kept as a string; normalization coerces numbers.
pub fn read_csv_rows<R: io::Read>(reader: R) -> Result<Vec<Map<String, Value>>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers()?.clone();
    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let row: Map<String, Value> = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.to_string(), Value::String(v.to_string())))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::normalize_row;
    use crate::domain::rubric::{Criterion, RubricSource};
    use indexmap::IndexMap;

    fn rubric() -> Rubric {
        Rubric::new("text", "d", IndexMap::new(), RubricSource::Template)
            .with_criterion("accuracy", Criterion::with_default_levels(0.4, "a"))
            .with_criterion("completeness", Criterion::with_default_levels(0.3, "c"))
            .with_criterion("efficiency", Criterion::with_default_levels(0.3, "e"))
    }

    fn scores(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_score_table_has_total_row() {
        let rows = score_table(
            &rubric(),
            &scores(&[("accuracy", 4.0), ("completeness", 3.0), ("efficiency", 2.0)]),
        );
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].dimension, "accuracy");
        assert!((rows[0].weighted_score - 1.6).abs() < 1e-9);

        let total = rows.last().expect("total row");
        assert_eq!(total.dimension, TOTAL_ROW);
        assert_eq!(total.weight, 1.0);
        assert!((total.score - 3.1).abs() < 1e-9);
        assert_eq!(total.score, total.weighted_score);
    }

    #[test]
    fn test_score_table_skips_unscored() {
        let rows = score_table(&rubric(), &scores(&[("efficiency", 4.0)]));
        let dims: Vec<&str> = rows.iter().map(|r| r.dimension.as_str()).collect();
        assert_eq!(dims, vec!["efficiency", "Total"]);
    }

    #[test]
    fn test_record_table_per_record_totals() {
        let r = rubric();
        let records = vec![
            EvaluationRecord {
                id: "a".into(),
                human_score: 4.0,
                ..Default::default()
            },
            EvaluationRecord {
                id: "b".into(),
                human_score: 2.0,
                ..Default::default()
            },
        ];
        let rows = record_table(
            &r,
            &records,
            ScoreChannel::Human,
            &FieldMapping::uniform(&r, ScoreChannel::Human),
        );
        assert_eq!(rows.len(), 8);
        let totals: Vec<(&str, f64)> = rows
            .iter()
            .filter(|row| row.dimension == TOTAL_ROW)
            .map(|row| (row.record_id.as_str(), row.score))
            .collect();
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].0, "a");
        assert!((totals[0].1 - 4.0).abs() < 1e-9);
        assert!((totals[1].1 - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_criteria_table_roundtrip() {
        let original = rubric();
        let rows = criteria_table(&original);
        let rebuilt = rubric_from_criteria_table(&original.name, &original.description, &rows)
            .expect("import");
        assert_eq!(rebuilt.name, original.name);
        assert_eq!(rebuilt.description, original.description);
        for (name, c) in &original.criteria {
            let back = rebuilt.criterion(name).expect("criterion kept");
            assert_eq!(back.weight, c.weight);
            assert_eq!(back.description, c.description);
        }
    }

    #[test]
    fn test_template_row_normalizes() {
        let record = normalize_row(0, &evaluation_template_row());
        assert_eq!(record.id, "template_1");
        assert_eq!(record.human_score, 0.0);
        assert!(record.columns.is_empty());
    }

    #[test]
    fn test_csv_export_has_header() {
        let rows = score_table(&rubric(), &scores(&[("accuracy", 4.0)]));
        let text = to_csv_string(&rows).expect("csv");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "dimension,score,weight,weighted_score");
        assert!(lines[2].starts_with("Total,"));
    }

    #[test]
    fn test_criteria_csv_roundtrip() {
        let rows = criteria_table(&rubric());
        let mut buf = Vec::new();
        write_csv(&mut buf, &rows).expect("write");
        let back: Vec<CriteriaRow> = read_csv(buf.as_slice()).expect("read");
        assert_eq!(back, rows);
    }

    #[test]
    fn test_read_csv_rows_feeds_normalization() {
        let data = "id,human_score,accuracy,comments\n,3.5,4,fine\nx,bad,,\n";
        let rows = read_csv_rows(data.as_bytes()).expect("rows");
        assert_eq!(rows.len(), 2);
        let first = normalize_row(0, &rows[0]);
        assert_eq!(first.id, "1");
        assert_eq!(first.human_score, 3.5);
        assert_eq!(first.columns.get("accuracy"), Some(&4.0));
        let second = normalize_row(1, &rows[1]);
        assert_eq!(second.id, "x");
        assert_eq!(second.human_score, 0.0);
        assert!(second.columns.is_empty());
    }
}
