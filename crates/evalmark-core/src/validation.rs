//! Rubric validation and normalization.
//!
//! Turns raw criteria definitions (AI-generated dimensions, imported JSON,
//! manual entry) into normalized rubrics, and audits rubrics before they are
//! saved.
//!
//! Weight reconciliation is advisory by default: nothing here rescales
//! weights unless [`normalize_weights`] is called explicitly, and
//! [`ensure_savable`] only rejects under [`WeightPolicy::Strict`].

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::config::{EngineConfig, WeightPolicy, DEFAULT_WEIGHT_TOLERANCE};
use crate::domain::error::{ImportFormatError, ValidationError};
use crate::domain::rubric::{default_levels, Criterion, Dimension, Level, Rubric, RubricSource};

// ---------------------------------------------------------------------------
// Dimensions → criteria
// ---------------------------------------------------------------------------

/// Map dimensions onto enabled criteria with the fixed four-level scale.
///
/// Only name, weight and description are carried over.
///
/// # Errors
///
/// - `ValidationError::EmptyDimensionName`: a name is empty or whitespace.
/// - `ValidationError::DuplicateDimension`: a (trimmed) name repeats.
pub fn from_dimensions(
    dimensions: &[Dimension],
) -> Result<IndexMap<String, Criterion>, ValidationError> {
    let mut criteria = IndexMap::with_capacity(dimensions.len());
    for (index, dim) in dimensions.iter().enumerate() {
        let name = dim.name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyDimensionName { index });
        }
        if criteria.contains_key(name) {
            return Err(ValidationError::DuplicateDimension {
                name: name.to_string(),
            });
        }
        criteria.insert(
            name.to_string(),
            Criterion::with_default_levels(dim.weight, dim.description.clone()),
        );
    }
    Ok(criteria)
}

impl Rubric {
    /// Build a rubric from custom or AI-generated dimensions.
    pub fn from_dimensions(
        name: impl Into<String>,
        description: impl Into<String>,
        dimensions: &[Dimension],
        source: RubricSource,
    ) -> Result<Self, ValidationError> {
        Ok(Self::new(name, description, from_dimensions(dimensions)?, source))
    }
}

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

/// Criterion shape accepted on import; levels are optional.
#[derive(Debug, Deserialize)]
struct ImportedCriterion {
    weight: f64,
    #[serde(default)]
    description: String,
    #[serde(default)]
    levels: Vec<Level>,
    #[serde(default)]
    enabled: Option<bool>,
}

/// Repair a level list: empty → default scale; otherwise sorted by score
/// with duplicate scores dropped (first wins).
pub fn normalize_levels(mut levels: Vec<Level>) -> Vec<Level> {
    if levels.is_empty() {
        return default_levels();
    }
    levels.sort_by_key(|l| l.score);
    let mut seen = HashSet::new();
    levels.retain(|l| seen.insert(l.score));
    levels
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Object(m) => m.is_empty(),
        _ => false,
    }
}

fn required<'a>(raw: &'a Value, field: &'static str) -> Result<&'a Value, ImportFormatError> {
    match raw.get(field) {
        Some(v) if !is_blank(v) => Ok(v),
        _ => Err(ImportFormatError::MissingField { field }),
    }
}

fn required_str<'a>(raw: &'a Value, field: &'static str) -> Result<&'a str, ImportFormatError> {
    required(raw, field)?
        .as_str()
        .ok_or_else(|| ImportFormatError::InvalidField {
            field,
            reason: "expected a string".to_string(),
        })
}

/// Build a rubric from an imported JSON document.
///
/// Requires `name`, `description` and `criteria` to be present and
/// non-empty, checked in that order; the error names the first failure.
/// Criteria without levels get the default scale. No weight-sum check is
/// performed.
pub fn from_imported_file(raw: &Value) -> Result<Rubric, ImportFormatError> {
    let name = required_str(raw, "name")?;
    let description = required_str(raw, "description")?;
    let criteria_raw = required(raw, "criteria")?.as_object().ok_or_else(|| {
        ImportFormatError::InvalidField {
            field: "criteria",
            reason: "expected an object keyed by criterion name".to_string(),
        }
    })?;

    let mut criteria = IndexMap::with_capacity(criteria_raw.len());
    for (key, value) in criteria_raw {
        let imported: ImportedCriterion =
            serde_json::from_value(value.clone()).map_err(|e| ImportFormatError::InvalidField {
                field: "criteria",
                reason: format!("{key}: {e}"),
            })?;
        criteria.insert(
            key.clone(),
            Criterion {
                weight: imported.weight,
                description: imported.description,
                levels: normalize_levels(imported.levels),
                enabled: imported.enabled.unwrap_or(true),
            },
        );
    }

    Ok(Rubric::new(name, description, criteria, RubricSource::Import))
}

/// Parse and import a JSON document from text.
pub fn from_imported_str(text: &str) -> Result<Rubric, ImportFormatError> {
    let raw: Value = serde_json::from_str(text)?;
    from_imported_file(&raw)
}

// ---------------------------------------------------------------------------
// Weights
// ---------------------------------------------------------------------------

fn enabled_sum(criteria: &IndexMap<String, Criterion>) -> f64 {
    criteria.values().filter(|c| c.enabled).map(|c| c.weight).sum()
}

/// Whether enabled weights sum to 1.0 within `1e-6`. Never corrects.
pub fn reconcile_weights(criteria: &IndexMap<String, Criterion>) -> bool {
    reconcile_weights_with(criteria, DEFAULT_WEIGHT_TOLERANCE)
}

/// [`reconcile_weights`] with an explicit tolerance.
pub fn reconcile_weights_with(criteria: &IndexMap<String, Criterion>, tolerance: f64) -> bool {
    (enabled_sum(criteria) - 1.0).abs() <= tolerance
}

/// Rescale enabled weights proportionally so they sum to 1.0.
///
/// Disabled criteria are left untouched.
pub fn normalize_weights(criteria: &mut IndexMap<String, Criterion>) -> Result<(), ValidationError> {
    let sum = enabled_sum(criteria);
    if sum <= 0.0 || !sum.is_finite() {
        return Err(ValidationError::ZeroWeightSum);
    }
    for c in criteria.values_mut().filter(|c| c.enabled) {
        c.weight /= sum;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Audit
// ---------------------------------------------------------------------------

/// A problem found while auditing a rubric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RubricFinding {
    /// Enabled weights do not sum to 1.0.
    WeightSumMismatch { sum: f64 },
    /// A weight lies outside `[0, 1]`.
    WeightOutOfRange { criterion: String, weight: f64 },
    /// A criterion has no levels.
    EmptyLevels { criterion: String },
    /// Level scores are not strictly ascending, or a score is 0.
    NonAscendingLevels { criterion: String },
    /// Level scores do not cover `1..=max` without gaps.
    NonContiguousLevels { criterion: String },
    /// No criterion is enabled.
    NoEnabledCriteria,
}

impl RubricFinding {
    /// Whether the finding blocks a save under [`WeightPolicy::Strict`].
    /// Gaps in level scores are advisory only.
    pub fn is_blocking(&self) -> bool {
        !matches!(self, Self::NonContiguousLevels { .. })
    }
}

impl std::fmt::Display for RubricFinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WeightSumMismatch { sum } => {
                write!(f, "enabled weights sum to {sum:.4}, expected 1.0")
            }
            Self::WeightOutOfRange { criterion, weight } => {
                write!(f, "criterion '{criterion}' weight {weight} outside [0, 1]")
            }
            Self::EmptyLevels { criterion } => write!(f, "criterion '{criterion}' has no levels"),
            Self::NonAscendingLevels { criterion } => write!(
                f,
                "criterion '{criterion}' levels are not strictly ascending from 1"
            ),
            Self::NonContiguousLevels { criterion } => {
                write!(f, "criterion '{criterion}' level scores have gaps")
            }
            Self::NoEnabledCriteria => write!(f, "rubric has no enabled criteria"),
        }
    }
}

fn level_findings(name: &str, criterion: &Criterion, out: &mut Vec<RubricFinding>) {
    if criterion.levels.is_empty() {
        out.push(RubricFinding::EmptyLevels {
            criterion: name.to_string(),
        });
        return;
    }
    let scores: Vec<u32> = criterion.levels.iter().map(|l| l.score).collect();
    let ascending = scores[0] >= 1 && scores.windows(2).all(|w| w[0] < w[1]);
    if !ascending {
        out.push(RubricFinding::NonAscendingLevels {
            criterion: name.to_string(),
        });
        return;
    }
    let contiguous = scores.iter().zip(1u32..).all(|(s, expected)| *s == expected);
    if !contiguous {
        out.push(RubricFinding::NonContiguousLevels {
            criterion: name.to_string(),
        });
    }
}

/// Audit a rubric. Never fails; returns every finding in criteria order.
pub fn validate_rubric(rubric: &Rubric, tolerance: f64) -> Vec<RubricFinding> {
    let mut findings = Vec::new();

    for (name, criterion) in &rubric.criteria {
        if !(0.0..=1.0).contains(&criterion.weight) {
            findings.push(RubricFinding::WeightOutOfRange {
                criterion: name.clone(),
                weight: criterion.weight,
            });
        }
        level_findings(name, criterion, &mut findings);
    }

    if rubric.enabled_criteria().next().is_none() {
        findings.push(RubricFinding::NoEnabledCriteria);
    } else if !reconcile_weights_with(&rubric.criteria, tolerance) {
        findings.push(RubricFinding::WeightSumMismatch {
            sum: rubric.enabled_weight_sum(),
        });
    }

    findings
}

/// Save-time gate.
///
/// Under [`WeightPolicy::Lenient`] every finding is logged at `warn` and the
/// rubric is accepted. Under [`WeightPolicy::Strict`] any blocking finding
/// rejects the rubric.
pub fn ensure_savable(
    rubric: &Rubric,
    config: &EngineConfig,
) -> Result<Vec<RubricFinding>, ValidationError> {
    let findings = validate_rubric(rubric, config.weight_tolerance);

    if config.weight_policy == WeightPolicy::Strict {
        let reasons: Vec<String> = findings
            .iter()
            .filter(|f| f.is_blocking())
            .map(ToString::to_string)
            .collect();
        if !reasons.is_empty() {
            return Err(ValidationError::RubricRejected { reasons });
        }
    }

    for finding in &findings {
        warn!(rubric_id = %rubric.id, finding = %finding, "rubric saved with finding");
    }
    Ok(findings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dims(names: &[&str]) -> Vec<Dimension> {
        names
            .iter()
            .map(|n| Dimension::new(*n, format!("{n} desc"), 0.5))
            .collect()
    }

    #[test]
    fn test_from_dimensions_uses_fixed_scale() {
        let criteria = from_dimensions(&dims(&["clarity", "tone"])).expect("valid");
        assert_eq!(criteria.len(), 2);
        let clarity = &criteria["clarity"];
        assert!(clarity.enabled);
        assert_eq!(clarity.weight, 0.5);
        assert_eq!(clarity.description, "clarity desc");
        assert_eq!(clarity.levels, default_levels());
    }

    #[test]
    fn test_from_dimensions_rejects_empty_name() {
        let err = from_dimensions(&dims(&["ok", "  "])).unwrap_err();
        assert_eq!(err, ValidationError::EmptyDimensionName { index: 1 });
    }

    #[test]
    fn test_from_dimensions_rejects_duplicate() {
        let err = from_dimensions(&dims(&["tone", "clarity", "tone"])).unwrap_err();
        assert_eq!(
            err,
            ValidationError::DuplicateDimension {
                name: "tone".to_string()
            }
        );
    }

    #[test]
    fn test_from_dimensions_empty_input_is_empty_rubric() {
        assert!(from_dimensions(&[]).expect("valid").is_empty());
    }

    #[test]
    fn test_import_checks_fields_in_order() {
        let err = from_imported_file(&json!({})).unwrap_err();
        assert!(matches!(err, ImportFormatError::MissingField { field: "name" }));

        let err = from_imported_file(&json!({"name": "n", "criteria": {}})).unwrap_err();
        assert!(matches!(
            err,
            ImportFormatError::MissingField {
                field: "description"
            }
        ));

        let err = from_imported_file(&json!({"name": "n", "description": "d"})).unwrap_err();
        assert!(matches!(err, ImportFormatError::MissingField { field: "criteria" }));

        let err = from_imported_file(&json!({"name": "n", "description": "d", "criteria": {}}))
            .unwrap_err();
        assert!(matches!(err, ImportFormatError::MissingField { field: "criteria" }));
    }

    #[test]
    fn test_import_empty_name_counts_as_missing() {
        let err = from_imported_file(&json!({"name": "", "description": ""})).unwrap_err();
        assert!(matches!(err, ImportFormatError::MissingField { field: "name" }));
    }

    #[test]
    fn test_import_boolean_name_is_invalid_not_missing() {
        for flag in [false, true] {
            let err = from_imported_file(&json!({"name": flag, "description": "d"})).unwrap_err();
            assert!(
                matches!(err, ImportFormatError::InvalidField { field: "name", .. }),
                "name = {flag}: {err:?}"
            );
        }
    }

    #[test]
    fn test_import_accepts_unbalanced_weights() {
        let rubric = from_imported_file(&json!({
            "name": "n",
            "description": "d",
            "criteria": {
                "a": {"weight": 0.2, "description": "A"},
                "b": {"weight": 0.4, "description": "B", "levels": [
                    {"score": 2, "description": "two"},
                    {"score": 1, "description": "one"}
                ]}
            }
        }))
        .expect("import");
        assert_eq!(rubric.source, RubricSource::Import);
        assert_eq!(rubric.criteria["a"].levels, default_levels());
        let b_scores: Vec<u32> = rubric.criteria["b"].levels.iter().map(|l| l.score).collect();
        assert_eq!(b_scores, vec![1, 2]);
        assert!(!reconcile_weights(&rubric.criteria));
    }

    #[test]
    fn test_import_rejects_malformed_criterion() {
        let err = from_imported_file(&json!({
            "name": "n",
            "description": "d",
            "criteria": {"a": {"description": "no weight"}}
        }))
        .unwrap_err();
        assert!(matches!(err, ImportFormatError::InvalidField { field: "criteria", .. }));
    }

    #[test]
    fn test_import_from_str_malformed_json() {
        assert!(matches!(
            from_imported_str("{not json").unwrap_err(),
            ImportFormatError::Malformed(_)
        ));
    }

    #[test]
    fn test_reconcile_weights_tolerance() {
        let mut criteria = from_dimensions(&[
            Dimension::new("a", "", 0.1),
            Dimension::new("b", "", 0.2),
            Dimension::new("c", "", 0.7),
        ])
        .expect("valid");
        assert!(reconcile_weights(&criteria));

        criteria["c"].weight = 0.7 + 1e-5;
        assert!(!reconcile_weights(&criteria));
        assert!(reconcile_weights_with(&criteria, 1e-4));
    }

    #[test]
    fn test_reconcile_ignores_disabled() {
        let mut criteria = from_dimensions(&[
            Dimension::new("a", "", 1.0),
            Dimension::new("b", "", 0.5),
        ])
        .expect("valid");
        criteria["b"].enabled = false;
        assert!(reconcile_weights(&criteria));
    }

    #[test]
    fn test_normalize_weights() {
        let mut criteria = from_dimensions(&[
            Dimension::new("a", "", 0.2),
            Dimension::new("b", "", 0.6),
        ])
        .expect("valid");
        normalize_weights(&mut criteria).expect("non-zero sum");
        assert!((criteria["a"].weight - 0.25).abs() < 1e-12);
        assert!((criteria["b"].weight - 0.75).abs() < 1e-12);
        assert!(reconcile_weights(&criteria));
    }

    #[test]
    fn test_normalize_weights_zero_sum() {
        let mut criteria = from_dimensions(&[Dimension::new("a", "", 0.0)]).expect("valid");
        assert_eq!(
            normalize_weights(&mut criteria).unwrap_err(),
            ValidationError::ZeroWeightSum
        );
    }

    fn rubric_with(criteria: IndexMap<String, Criterion>) -> Rubric {
        Rubric::new("r", "d", criteria, RubricSource::Custom)
    }

    #[test]
    fn test_validate_reports_level_problems() {
        let mut criteria = IndexMap::new();
        criteria.insert("empty".to_string(), Criterion::new(0.5, "", vec![]));
        criteria.insert(
            "gappy".to_string(),
            Criterion::new(0.25, "", vec![Level::new(1, "a"), Level::new(3, "c")]),
        );
        criteria.insert(
            "unsorted".to_string(),
            Criterion::new(0.25, "", vec![Level::new(2, "b"), Level::new(1, "a")]),
        );
        let findings = validate_rubric(&rubric_with(criteria), 1e-6);
        assert_eq!(
            findings,
            vec![
                RubricFinding::EmptyLevels {
                    criterion: "empty".to_string()
                },
                RubricFinding::NonContiguousLevels {
                    criterion: "gappy".to_string()
                },
                RubricFinding::NonAscendingLevels {
                    criterion: "unsorted".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_validate_reports_weight_problems() {
        let criteria = from_dimensions(&[
            Dimension::new("a", "", 1.5),
            Dimension::new("b", "", 0.1),
        ])
        .expect("valid");
        let findings = validate_rubric(&rubric_with(criteria), 1e-6);
        assert!(findings.contains(&RubricFinding::WeightOutOfRange {
            criterion: "a".to_string(),
            weight: 1.5
        }));
        assert!(findings
            .iter()
            .any(|f| matches!(f, RubricFinding::WeightSumMismatch { .. })));
    }

    #[test]
    fn test_validate_no_enabled_criteria() {
        let findings = validate_rubric(&rubric_with(IndexMap::new()), 1e-6);
        assert_eq!(findings, vec![RubricFinding::NoEnabledCriteria]);
    }

    #[test]
    fn test_ensure_savable_lenient_accepts() {
        let criteria = from_dimensions(&[Dimension::new("a", "", 0.6)]).expect("valid");
        let findings =
            ensure_savable(&rubric_with(criteria), &EngineConfig::default()).expect("lenient");
        assert_eq!(findings.len(), 1);
    }

    #[test]
    fn test_ensure_savable_strict_rejects_weight_mismatch() {
        let criteria = from_dimensions(&[Dimension::new("a", "", 0.6)]).expect("valid");
        let config = EngineConfig::default().with_weight_policy(WeightPolicy::Strict);
        let err = ensure_savable(&rubric_with(criteria), &config).unwrap_err();
        assert!(err.to_string().contains("sum to 0.6000"));
    }

    #[test]
    fn test_ensure_savable_strict_allows_level_gaps() {
        let mut criteria = IndexMap::new();
        criteria.insert(
            "gappy".to_string(),
            Criterion::new(1.0, "", vec![Level::new(1, "a"), Level::new(4, "d")]),
        );
        let config = EngineConfig::default().with_weight_policy(WeightPolicy::Strict);
        let findings = ensure_savable(&rubric_with(criteria), &config).expect("advisory only");
        assert_eq!(findings.len(), 1);
    }
}
