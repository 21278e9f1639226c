//! evalmark Core Library
//!
//! Weighted rubric definition, validation, scoring and trend analysis for
//! evaluating AI products, plus the stores and reports built on top.

pub mod config;
pub mod domain;
pub mod export;
pub mod metrics;
pub mod obs;
pub mod persistence;
pub mod prompt;
pub mod reporting;
pub mod scoring;
pub mod store;
pub mod telemetry;
pub mod templates;
pub mod trend;
pub mod validation;

pub use config::{EngineConfig, WeightPolicy};

pub use domain::{
    is_supported_upload, normalize_row, normalize_rows, rubric_digest, ConfigError, Criterion,
    Dimension, EvaluationRecord, EvalmarkError, ImportFormatError, Level, Result, Rubric, RubricId,
    RubricSource, ScoreChannel, Snapshot, ValidationError,
};

pub use validation::{
    ensure_savable, from_dimensions, from_imported_file, from_imported_str, normalize_weights,
    reconcile_weights, validate_rubric, RubricFinding,
};

pub use scoring::{
    extract_criterion_scores, score_batch, score_batch_detailed, score_record,
    score_record_detailed, AggregationWarning, BatchScore, FieldBinding, FieldMapping,
    ScoreBreakdown,
};

pub use trend::{
    analyze, classify_suggestion, improvement_percentage, rank_by_improvement, trajectories,
    CriterionTrend, Suggestion, TrendReport,
};

pub use templates::{builtin_templates, find_template, RubricTemplate};

pub use store::{BenchmarkStore, EvaluationStore, RecentReport, RecordedEvaluation};

pub use persistence::{load_workspace, save_workspace, Workspace};

pub use reporting::{build_report, render_report_md, EvaluationReportArtifact};

/// evalmark version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
