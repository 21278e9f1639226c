//! Domain models for evalmark.
//!
//! Canonical definitions for the core entities:
//! - `Rubric`: a named, weighted set of criteria with level scales
//! - `EvaluationRecord`: one evaluated sample with per-channel scores
//! - `Snapshot`: an immutable history entry (rubric by value + scores)

pub mod digest;
pub mod error;
pub mod record;
pub mod rubric;
pub mod snapshot;

// Re-export main types and errors
pub use digest::{canonical_json, compute_digest, rubric_digest};
pub use error::{ConfigError, EvalmarkError, ImportFormatError, Result, ValidationError};
pub use record::{
    is_supported_upload, normalize_row, normalize_rows, EvaluationRecord, ScoreChannel,
};
pub use rubric::{
    default_levels, Criterion, Dimension, Level, Rubric, RubricId, RubricSource,
    DEFAULT_LEVEL_DESCRIPTIONS,
};
pub use snapshot::Snapshot;
