//! Rubric (benchmark) definitions: criteria, weights and level scales.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::{EvalmarkError, Result};

/// Level text used whenever a criterion is generated without its own scale.
pub const DEFAULT_LEVEL_DESCRIPTIONS: [&str; 4] = [
    "does not meet requirements",
    "meets requirements minimally",
    "good",
    "excellent",
];

/// One discrete score value and what it means.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Level {
    /// Score value, starting at 1.
    pub score: u32,

    /// Human-readable meaning of this score.
    pub description: String,
}

impl Level {
    pub fn new(score: u32, description: impl Into<String>) -> Self {
        Self {
            score,
            description: description.into(),
        }
    }
}

/// The default four-level scale (1–4).
pub fn default_levels() -> Vec<Level> {
    DEFAULT_LEVEL_DESCRIPTIONS
        .iter()
        .zip(1u32..)
        .map(|(description, score)| Level::new(score, *description))
        .collect()
}

fn enabled_by_default() -> bool {
    true
}

/// One named axis of evaluation. The name is the key in [`Rubric::criteria`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Criterion {
    /// Relative weight in `[0, 1]`.
    pub weight: f64,

    /// What this criterion measures.
    pub description: String,

    /// Discrete scoring levels, ascending by score.
    pub levels: Vec<Level>,

    /// Disabled criteria are kept for display but excluded from scoring.
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

impl Criterion {
    /// Create an enabled criterion with explicit levels.
    pub fn new(weight: f64, description: impl Into<String>, levels: Vec<Level>) -> Self {
        Self {
            weight,
            description: description.into(),
            levels,
            enabled: true,
        }
    }

    /// Create an enabled criterion on the default four-level scale.
    pub fn with_default_levels(weight: f64, description: impl Into<String>) -> Self {
        Self::new(weight, description, default_levels())
    }

    /// Mark this criterion as disabled.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Highest defined level score, if any levels exist.
    pub fn max_score(&self) -> Option<u32> {
        self.levels.iter().map(|l| l.score).max()
    }

    /// Look up the level for a score.
    pub fn level(&self, score: u32) -> Option<&Level> {
        self.levels.iter().find(|l| l.score == score)
    }
}

/// A candidate dimension: the output shape of AI generation and manual
/// custom authoring. Carries no level text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Dimension {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub weight: f64,
}

impl Dimension {
    pub fn new(name: impl Into<String>, description: impl Into<String>, weight: f64) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            weight,
        }
    }
}

/// How a rubric came into existence.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum RubricSource {
    Template,
    Custom,
    AiGenerated,
    Import,
}

impl std::fmt::Display for RubricSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Template => write!(f, "template"),
            Self::Custom => write!(f, "custom"),
            Self::AiGenerated => write!(f, "ai-generated"),
            Self::Import => write!(f, "import"),
        }
    }
}

/// Opaque rubric identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RubricId(String);

impl RubricId {
    /// Generate a fresh identifier.
    pub fn generate() -> Self {
        RubricId(format!("benchmark-{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RubricId {
    fn from(s: &str) -> Self {
        RubricId(s.to_string())
    }
}

impl From<String> for RubricId {
    fn from(s: String) -> Self {
        RubricId(s)
    }
}

impl std::fmt::Display for RubricId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named, weighted collection of scoring criteria.
///
/// # Invariants
///
/// The enabled weights *should* sum to 1.0. Construction does not enforce
/// this; see [`crate::validation::reconcile_weights`] and
/// [`crate::validation::ensure_savable`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Rubric {
    pub id: RubricId,
    pub name: String,
    pub description: String,

    /// Criteria keyed by name. Order is kept for display only.
    pub criteria: IndexMap<String, Criterion>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(default = "default_source")]
    pub source: RubricSource,
}

fn default_source() -> RubricSource {
    RubricSource::Custom
}

impl Rubric {
    /// Create a rubric with a fresh id and timestamps.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        criteria: IndexMap<String, Criterion>,
        source: RubricSource,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: RubricId::generate(),
            name: name.into(),
            description: description.into(),
            criteria,
            created_at: now,
            updated_at: now,
            source,
        }
    }

    /// Replace the generated id.
    pub fn with_id(mut self, id: impl Into<RubricId>) -> Self {
        self.id = id.into();
        self
    }

    /// Add a criterion while building.
    pub fn with_criterion(mut self, name: impl Into<String>, criterion: Criterion) -> Self {
        self.criteria.insert(name.into(), criterion);
        self
    }

    /// Look up a criterion by name.
    pub fn criterion(&self, name: &str) -> Option<&Criterion> {
        self.criteria.get(name)
    }

    /// Enabled criteria in display order.
    pub fn enabled_criteria(&self) -> impl Iterator<Item = (&String, &Criterion)> {
        self.criteria.iter().filter(|(_, c)| c.enabled)
    }

    /// Sum of enabled weights.
    pub fn enabled_weight_sum(&self) -> f64 {
        self.enabled_criteria().map(|(_, c)| c.weight).sum()
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    fn criterion_mut(&mut self, name: &str) -> Result<&mut Criterion> {
        self.criteria
            .get_mut(name)
            .ok_or_else(|| EvalmarkError::CriterionNotFound(name.to_string()))
    }

    // -----------------------------------------------------------------------
    // Edit operations. Each refreshes `updated_at`.
    // -----------------------------------------------------------------------

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.touch();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
        self.touch();
    }

    /// Insert or replace a criterion. A replaced criterion keeps its position.
    pub fn upsert_criterion(&mut self, name: impl Into<String>, criterion: Criterion) {
        self.criteria.insert(name.into(), criterion);
        self.touch();
    }

    /// Remove a criterion, keeping the order of the rest.
    pub fn remove_criterion(&mut self, name: &str) -> Option<Criterion> {
        let removed = self.criteria.shift_remove(name);
        if removed.is_some() {
            self.touch();
        }
        removed
    }

    pub fn set_weight(&mut self, name: &str, weight: f64) -> Result<()> {
        self.criterion_mut(name)?.weight = weight;
        self.touch();
        Ok(())
    }

    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> Result<()> {
        self.criterion_mut(name)?.enabled = enabled;
        self.touch();
        Ok(())
    }

    /// Replace one level's description. Levels are otherwise immutable.
    pub fn set_level_description(
        &mut self,
        name: &str,
        score: u32,
        description: impl Into<String>,
    ) -> Result<()> {
        let criterion = self.criterion_mut(name)?;
        let level = criterion
            .levels
            .iter_mut()
            .find(|l| l.score == score)
            .ok_or_else(|| EvalmarkError::LevelNotFound {
                criterion: name.to_string(),
                score,
            })?;
        *level = Level::new(score, description);
        self.touch();
        Ok(())
    }

    /// Replace the whole criteria mapping.
    pub fn replace_criteria(&mut self, criteria: IndexMap<String, Criterion>) {
        self.criteria = criteria;
        self.touch();
    }
}
