use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::domain::digest::rubric_digest;
use crate::domain::rubric::{Rubric, RubricId, RubricSource};
use crate::domain::snapshot::Snapshot;
use crate::export::{criteria_table, score_table, CriteriaRow, ScoreRow, TOTAL_ROW};
use crate::trend::TrendReport;

/// Report schema version written into every artifact.
pub const REPORT_SCHEMA_VERSION: &str = "1.0";

/// Rubric identity section of the report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RubricInfoArtifact {
    pub id: RubricId,
    pub name: String,
    pub description: String,
    pub source: RubricSource,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub digest: String,
}

/// Exported evaluation report: rubric, criteria sheet, latest scores and an
/// optional trend section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvaluationReportArtifact {
    pub schema_version: String,
    pub generated_at: DateTime<Utc>,
    pub rubric: RubricInfoArtifact,
    pub criteria: Vec<CriteriaRow>,
    /// Score sheet of the latest evaluation, `Total` row last. Empty when the
    /// rubric has never been evaluated.
    pub scores: Vec<ScoreRow>,
    pub composite: Option<f64>,
    pub evaluated_at: Option<DateTime<Utc>>,
    pub records_evaluated: usize,
    pub trend: Option<TrendReport>,
}

/// Assemble a report for `rubric`.
///
/// Scores are weighted by the rubric captured in `latest`, so an edited
/// rubric does not reinterpret old results.
pub fn build_report(
    rubric: &Rubric,
    latest: Option<&Snapshot>,
    trend: Option<TrendReport>,
) -> Result<EvaluationReportArtifact> {
    let scores = latest
        .map(|snap| {
            let by_name: HashMap<String, f64> =
                snap.scores.iter().map(|(k, v)| (k.clone(), *v)).collect();
            score_table(&snap.rubric, &by_name)
        })
        .unwrap_or_default();
    let composite = scores
        .iter()
        .find(|row| row.dimension == TOTAL_ROW)
        .map(|row| row.score);

    Ok(EvaluationReportArtifact {
        schema_version: REPORT_SCHEMA_VERSION.to_string(),
        generated_at: Utc::now(),
        rubric: RubricInfoArtifact {
            id: rubric.id.clone(),
            name: rubric.name.clone(),
            description: rubric.description.clone(),
            source: rubric.source,
            created_at: rubric.created_at,
            updated_at: rubric.updated_at,
            digest: rubric_digest(rubric).context("digest rubric")?,
        },
        criteria: criteria_table(rubric),
        scores,
        composite,
        evaluated_at: latest.map(|s| s.date),
        records_evaluated: latest.map(|s| s.records.len()).unwrap_or(0),
        trend,
    })
}

/// Write the report as pretty JSON.
pub fn write_report_json(path: &Path, artifact: &EvaluationReportArtifact) -> Result<()> {
    let content = serde_json::to_string_pretty(artifact).context("serialize report artifact")?;
    std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
    Ok(())
}

/// Render the report as markdown.
pub fn render_report_md(artifact: &EvaluationReportArtifact) -> String {
    let mut out = String::new();
    out.push_str(&format!("# {}\n\n", artifact.rubric.name));
    if !artifact.rubric.description.is_empty() {
        out.push_str(&format!("{}\n\n", artifact.rubric.description));
    }
    out.push_str(&format!(
        "- id: `{}`\n- source: {}\n- updated: {}\n\n",
        artifact.rubric.id,
        artifact.rubric.source,
        artifact.rubric.updated_at.format("%Y-%m-%d %H:%M UTC")
    ));

    out.push_str("## Criteria\n\n| Dimension | Weight | Description |\n|---|---|---|\n");
    for row in &artifact.criteria {
        out.push_str(&format!(
            "| {} | {:.0}% | {} |\n",
            row.dimension,
            row.weight * 100.0,
            row.description
        ));
    }
    out.push('\n');

    out.push_str("## Scores\n\n");
    match (artifact.evaluated_at, artifact.composite) {
        (Some(at), Some(composite)) => {
            out.push_str(&format!(
                "Evaluated {} over {} records. Composite: **{:.2}**\n\n",
                at.format("%Y-%m-%d %H:%M UTC"),
                artifact.records_evaluated,
                composite
            ));
            out.push_str("| Dimension | Score | Weight | Weighted |\n|---|---|---|---|\n");
            for row in &artifact.scores {
                out.push_str(&format!(
                    "| {} | {:.2} | {:.2} | {:.2} |\n",
                    row.dimension, row.score, row.weight, row.weighted_score
                ));
            }
            out.push('\n');
        }
        _ => out.push_str("No evaluations recorded.\n\n"),
    }

    if let Some(trend) = artifact.trend.as_ref().filter(|t| !t.is_empty()) {
        out.push_str(&format!(
            "## Trend\n\n{} evaluations analysed.\n",
            trend.dates.len()
        ));
        if trend.rubric_changed {
            out.push_str("The rubric changed during this period.\n");
        }
        out.push_str("\n| Dimension | First | Last | Change | Suggestion |\n|---|---|---|---|---|\n");
        for c in &trend.ranking {
            out.push_str(&format!(
                "| {} | {:.2} | {:.2} | {:+.1}% | {} |\n",
                c.criterion, c.first, c.last, c.improvement_pct, c.suggestion
            ));
        }
    }
    out
}

/// Write the markdown rendering.
pub fn write_report_md(path: &Path, artifact: &EvaluationReportArtifact) -> Result<()> {
    let md = render_report_md(artifact);
    std::fs::write(path, md).with_context(|| format!("write {:?}", path))?;
    Ok(())
}
