//! Engine configuration.
//!
//! Defaults keep 10 snapshots of history and five recent reports, with
//! lenient weight handling. Every value can be overridden through
//! `EVALMARK_*` environment variables or the builder methods.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;

/// Default number of snapshots retained in history.
pub const DEFAULT_HISTORY_CAP: usize = 10;

/// Default number of recent reports retained.
pub const DEFAULT_RECENT_REPORTS_CAP: usize = 5;

/// Default tolerance when checking that enabled weights sum to 1.0.
pub const DEFAULT_WEIGHT_TOLERANCE: f64 = 1e-6;

/// What to do with a rubric whose enabled weights do not sum to 1.0 when it
/// is saved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightPolicy {
    /// Accept and log a warning.
    #[default]
    Lenient,
    /// Reject with `ValidationError::RubricRejected`.
    Strict,
}

impl std::str::FromStr for WeightPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lenient" => Ok(Self::Lenient),
            "strict" => Ok(Self::Strict),
            other => Err(format!("expected 'lenient' or 'strict', got '{other}'")),
        }
    }
}

/// Configuration shared by the stores and the CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum snapshots kept in history (FIFO eviction).
    pub history_cap: usize,
    /// Maximum recent reports kept.
    pub recent_reports_cap: usize,
    /// Tolerance for weight reconciliation.
    pub weight_tolerance: f64,
    /// Save-time handling of unreconciled weights.
    pub weight_policy: WeightPolicy,
    /// Directory used by the filesystem key-value store.
    pub data_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_cap: DEFAULT_HISTORY_CAP,
            recent_reports_cap: DEFAULT_RECENT_REPORTS_CAP,
            weight_tolerance: DEFAULT_WEIGHT_TOLERANCE,
            weight_policy: WeightPolicy::Lenient,
            data_dir: PathBuf::from(".evalmark"),
        }
    }
}

fn invalid(var: &'static str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        var,
        value: value.to_string(),
        reason: reason.into(),
    }
}

fn parse_cap(var: &'static str, raw: &str) -> Result<usize, ConfigError> {
    match raw.trim().parse::<usize>() {
        Ok(0) => Err(invalid(var, raw, "must be at least 1")),
        Ok(n) => Ok(n),
        Err(e) => Err(invalid(var, raw, e.to_string())),
    }
}

impl EngineConfig {
    pub fn with_history_cap(mut self, cap: usize) -> Self {
        self.history_cap = cap;
        self
    }

    pub fn with_recent_reports_cap(mut self, cap: usize) -> Self {
        self.recent_reports_cap = cap;
        self
    }

    pub fn with_weight_tolerance(mut self, tolerance: f64) -> Self {
        self.weight_tolerance = tolerance;
        self
    }

    pub fn with_weight_policy(mut self, policy: WeightPolicy) -> Self {
        self.weight_policy = policy;
        self
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Create from environment variables
    ///
    /// Reads (all optional, defaults otherwise):
    /// - EVALMARK_HISTORY_CAP
    /// - EVALMARK_RECENT_REPORTS_CAP
    /// - EVALMARK_WEIGHT_TOLERANCE
    /// - EVALMARK_WEIGHT_POLICY (`lenient` | `strict`)
    /// - EVALMARK_DATA_DIR
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup. Used by `from_env` and tests.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup("EVALMARK_HISTORY_CAP") {
            config.history_cap = parse_cap("EVALMARK_HISTORY_CAP", &raw)?;
        }
        if let Some(raw) = lookup("EVALMARK_RECENT_REPORTS_CAP") {
            config.recent_reports_cap = parse_cap("EVALMARK_RECENT_REPORTS_CAP", &raw)?;
        }
        if let Some(raw) = lookup("EVALMARK_WEIGHT_TOLERANCE") {
            config.weight_tolerance = match raw.trim().parse::<f64>() {
                Ok(t) if t.is_finite() && t >= 0.0 => t,
                Ok(_) => {
                    return Err(invalid(
                        "EVALMARK_WEIGHT_TOLERANCE",
                        &raw,
                        "must be a finite non-negative number",
                    ))
                }
                Err(e) => return Err(invalid("EVALMARK_WEIGHT_TOLERANCE", &raw, e.to_string())),
            };
        }
        if let Some(raw) = lookup("EVALMARK_WEIGHT_POLICY") {
            config.weight_policy = raw
                .parse()
                .map_err(|reason: String| invalid("EVALMARK_WEIGHT_POLICY", &raw, reason))?;
        }
        if let Some(raw) = lookup("EVALMARK_DATA_DIR") {
            if !raw.trim().is_empty() {
                config.data_dir = PathBuf::from(raw);
            }
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.history_cap, 10);
        assert_eq!(config.recent_reports_cap, 5);
        assert_eq!(config.weight_tolerance, 1e-6);
        assert_eq!(config.weight_policy, WeightPolicy::Lenient);
    }

    #[test]
    fn test_empty_environment_gives_defaults() {
        let config = EngineConfig::from_lookup(lookup(&[])).expect("config");
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_overrides_from_lookup() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("EVALMARK_HISTORY_CAP", "3"),
            ("EVALMARK_RECENT_REPORTS_CAP", "2"),
            ("EVALMARK_WEIGHT_TOLERANCE", "0.01"),
            ("EVALMARK_WEIGHT_POLICY", "Strict"),
            ("EVALMARK_DATA_DIR", "/tmp/evalmark"),
        ]))
        .expect("config");
        assert_eq!(config.history_cap, 3);
        assert_eq!(config.recent_reports_cap, 2);
        assert_eq!(config.weight_tolerance, 0.01);
        assert_eq!(config.weight_policy, WeightPolicy::Strict);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/evalmark"));
    }

    #[test]
    fn test_zero_cap_rejected() {
        let err = EngineConfig::from_lookup(lookup(&[("EVALMARK_HISTORY_CAP", "0")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { var: "EVALMARK_HISTORY_CAP", .. }
        ));
    }

    #[test]
    fn test_bad_policy_rejected() {
        let err =
            EngineConfig::from_lookup(lookup(&[("EVALMARK_WEIGHT_POLICY", "maybe")])).unwrap_err();
        assert!(err.to_string().contains("EVALMARK_WEIGHT_POLICY"));
    }

    #[test]
    fn test_negative_tolerance_rejected() {
        assert!(
            EngineConfig::from_lookup(lookup(&[("EVALMARK_WEIGHT_TOLERANCE", "-1")])).is_err()
        );
    }
}
