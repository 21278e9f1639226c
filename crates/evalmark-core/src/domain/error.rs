//! Domain-level error taxonomy for evalmark.

/// Malformed rubric input.
///
/// Surfaced synchronously to the caller and never retried.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ValidationError {
    #[error("dimension #{index} has an empty name")]
    EmptyDimensionName { index: usize },

    #[error("duplicate dimension name: {name}")]
    DuplicateDimension { name: String },

    #[error("enabled criterion weights sum to zero; cannot normalize")]
    ZeroWeightSum,

    #[error("rubric rejected: {}", .reasons.join("; "))]
    RubricRejected { reasons: Vec<String> },
}

/// An imported rubric file does not have the required shape.
#[derive(Debug, thiserror::Error)]
pub enum ImportFormatError {
    /// Required top-level field is absent or empty. Fields are checked in the
    /// fixed order `name → description → criteria`.
    #[error("import file missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("import field {field} is invalid: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("import file is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Invalid engine configuration value.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("{var} has invalid value {value:?}: {reason}")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// evalmark domain errors.
#[derive(Debug, thiserror::Error)]
pub enum EvalmarkError {
    #[error("rubric not found: {0}")]
    RubricNotFound(String),

    #[error("rubric already exists: {0}")]
    DuplicateRubric(String),

    #[error("criterion not found: {0}")]
    CriterionNotFound(String),

    #[error("criterion {criterion} has no level with score {score}")]
    LevelNotFound { criterion: String, score: u32 },

    #[error("no active rubric selected")]
    NoActiveRubric,

    #[error("template not found: {0}")]
    TemplateNotFound(String),

    #[error("no valid criterion scores found in uploaded row")]
    NoValidScores,

    #[error("uploaded sheet is empty")]
    EmptySheet,

    #[error("NaN/Infinity not permitted in canonical JSON")]
    NonFiniteNumber,

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("import error: {0}")]
    Import(#[from] ImportFormatError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("storage error: {0}")]
    Storage(#[from] evalmark_state::StorageError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for evalmark domain operations.
pub type Result<T> = std::result::Result<T, EvalmarkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_names_field() {
        let err = ImportFormatError::MissingField {
            field: "description",
        };
        assert_eq!(
            err.to_string(),
            "import file missing required field: description"
        );
    }

    #[test]
    fn test_rubric_rejected_joins_reasons() {
        let err = ValidationError::RubricRejected {
            reasons: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(err.to_string(), "rubric rejected: a; b");
    }

    #[test]
    fn test_validation_converts_into_domain_error() {
        let err: EvalmarkError = ValidationError::DuplicateDimension {
            name: "accuracy".to_string(),
        }
        .into();
        assert!(err.to_string().contains("duplicate dimension name: accuracy"));
    }

    #[test]
    fn test_rubric_not_found_display() {
        let err = EvalmarkError::RubricNotFound("abc".to_string());
        assert!(err.to_string().contains("rubric not found"));
        assert!(err.to_string().contains("abc"));
    }
}
