//! Canonical JSON normalization and rubric digests.
//!
//! Snapshots record a digest of the rubric they were scored under so that
//! trend consumers can tell when the rubric changed between evaluations.
//! The digest covers the rubric's identity and scoring content (id, name,
//! description, criteria) but not its timestamps or source.

use sha2::{Digest, Sha256};

use super::error::{EvalmarkError, Result};
use super::rubric::Rubric;

/// Recursively sort JSON object keys using UTF-16 code unit ordering.
fn sort_keys_utf16(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().collect();
            keys.sort_by(|a, b| a.encode_utf16().cmp(b.encode_utf16()));

            let mut sorted = serde_json::Map::new();
            for key in keys {
                if let Some(v) = map.get(key) {
                    sorted.insert(key.to_string(), sort_keys_utf16(v));
                }
            }
            serde_json::Value::Object(sorted)
        }
        serde_json::Value::Array(arr) => {
            serde_json::Value::Array(arr.iter().map(sort_keys_utf16).collect())
        }
        other => other.clone(),
    }
}

/// Normalize numbers: integer-valued floats → integer repr; reject NaN/Infinity.
fn normalize_value(value: &serde_json::Value) -> Result<serde_json::Value> {
    match value {
        serde_json::Value::Object(map) => {
            let mut normalized = serde_json::Map::new();
            for (k, v) in map {
                normalized.insert(k.clone(), normalize_value(v)?);
            }
            Ok(serde_json::Value::Object(normalized))
        }
        serde_json::Value::Array(arr) => Ok(serde_json::Value::Array(
            arr.iter().map(normalize_value).collect::<Result<Vec<_>>>()?,
        )),
        serde_json::Value::Number(n) if !(n.is_i64() || n.is_u64()) => match n.as_f64() {
            Some(f) if !f.is_finite() => Err(EvalmarkError::NonFiniteNumber),
            Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 => {
                Ok(serde_json::Value::Number(serde_json::Number::from(f as i64)))
            }
            _ => Ok(serde_json::Value::Number(n.clone())),
        },
        other => Ok(other.clone()),
    }
}

/// Convert a JSON value to canonical form: normalize numbers → sort keys →
/// compact JSON.
pub fn canonical_json(value: &serde_json::Value) -> Result<String> {
    let normalized = normalize_value(value)?;
    let sorted = sort_keys_utf16(&normalized);
    Ok(serde_json::to_string(&sorted)?)
}

/// SHA-256 hex digest of canonical JSON.
pub fn compute_digest(value: &serde_json::Value) -> Result<String> {
    let canonical = canonical_json(value)?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Digest of a rubric's identity and scoring content.
pub fn rubric_digest(rubric: &Rubric) -> Result<String> {
    let content = serde_json::json!({
        "id": rubric.id,
        "name": rubric.name,
        "description": rubric.description,
        "criteria": rubric.criteria,
    });
    compute_digest(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rubric::{Criterion, RubricSource};
    use indexmap::IndexMap;

    fn rubric() -> Rubric {
        Rubric::new("r", "d", IndexMap::new(), RubricSource::Custom)
            .with_id("fixed")
            .with_criterion("accuracy", Criterion::with_default_levels(0.5, "a"))
            .with_criterion("speed", Criterion::with_default_levels(0.5, "s"))
    }

    #[test]
    fn test_canonical_json_sorts_keys() {
        let input = serde_json::json!({"b": 1, "a": {"d": 2, "c": 3}});
        assert_eq!(
            canonical_json(&input).expect("canonical"),
            r#"{"a":{"c":3,"d":2},"b":1}"#
        );
    }

    #[test]
    fn test_canonical_json_integer_float() {
        let input = serde_json::json!({ "value": 1.0 });
        assert_eq!(canonical_json(&input).expect("canonical"), r#"{"value":1}"#);
    }

    #[test]
    fn test_digest_is_hex_sha256() {
        let d = compute_digest(&serde_json::json!({"x": 1})).expect("digest");
        assert_eq!(d.len(), 64);
        assert!(d.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_rubric_digest_ignores_timestamps() {
        let a = rubric();
        let mut b = a.clone();
        b.updated_at += chrono::Duration::days(3);
        assert_eq!(rubric_digest(&a).unwrap(), rubric_digest(&b).unwrap());
    }

    #[test]
    fn test_rubric_digest_ignores_criteria_order() {
        let a = rubric();
        let mut reordered = a.clone();
        reordered.criteria.reverse();
        assert_eq!(rubric_digest(&a).unwrap(), rubric_digest(&reordered).unwrap());
    }

    #[test]
    fn test_rubric_digest_changes_with_weights() {
        let a = rubric();
        let mut b = a.clone();
        b.set_weight("accuracy", 0.7).expect("known");
        assert_ne!(rubric_digest(&a).unwrap(), rubric_digest(&b).unwrap());
    }
}
