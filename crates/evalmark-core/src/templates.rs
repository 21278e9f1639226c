//! Built-in rubric templates.

use indexmap::IndexMap;

use crate::domain::error::{EvalmarkError, Result};
use crate::domain::rubric::{Criterion, Level, Rubric, RubricSource};

/// One criterion of a template with its four level texts (scores 1–4).
#[derive(Debug, Clone, Copy)]
pub struct TemplateCriterion {
    pub name: &'static str,
    pub weight: f64,
    pub description: &'static str,
    pub levels: [&'static str; 4],
}

impl TemplateCriterion {
    fn to_criterion(self) -> Criterion {
        let levels = self
            .levels
            .iter()
            .zip(1u32..)
            .map(|(text, score)| Level::new(score, *text))
            .collect();
        Criterion::new(self.weight, self.description, levels)
    }
}

/// A predefined rubric users can start from.
#[derive(Debug, Clone, Copy)]
pub struct RubricTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub criteria: &'static [TemplateCriterion],
}

impl RubricTemplate {
    /// Fresh criteria mapping in template order.
    pub fn criteria(&self) -> IndexMap<String, Criterion> {
        self.criteria
            .iter()
            .map(|c| (c.name.to_string(), c.to_criterion()))
            .collect()
    }
}

static TEMPLATES: [RubricTemplate; 3] = [
    RubricTemplate {
        id: "text-generation",
        name: "Text generation benchmark",
        description: "Evaluates the quality of AI text generation tasks",
        criteria: &[
            TemplateCriterion {
                name: "accuracy",
                weight: 0.4,
                description: "How closely the output matches the expected result",
                levels: [
                    "does not match the expected result",
                    "partially matches with major deviations",
                    "mostly matches with minor deviations",
                    "fully matches the expected result",
                ],
            },
            TemplateCriterion {
                name: "completeness",
                weight: 0.3,
                description: "Whether the output fully solves the problem",
                levels: [
                    "core problem not addressed",
                    "core problem partially addressed",
                    "core problem solved but details missing",
                    "problem fully solved with all necessary details",
                ],
            },
            TemplateCriterion {
                name: "efficiency",
                weight: 0.3,
                description: "Efficiency and resource use of the solution",
                levels: [
                    "very inefficient, excessive resource use",
                    "average efficiency, heavy resource use",
                    "good efficiency, reasonable resource use",
                    "highly efficient, optimized resource use",
                ],
            },
        ],
    },
    RubricTemplate {
        id: "code-generation",
        name: "Code generation benchmark",
        description: "Evaluates the quality of AI code generation tasks",
        criteria: &[
            TemplateCriterion {
                name: "functionality",
                weight: 0.35,
                description: "Functional correctness of the code",
                levels: [
                    "does not run or is functionally wrong",
                    "runs but has major functional problems",
                    "mostly correct with small problems",
                    "fully correct",
                ],
            },
            TemplateCriterion {
                name: "readability",
                weight: 0.25,
                description: "Readability and maintainability of the code",
                levels: [
                    "chaotic and hard to follow",
                    "poorly structured, hard to read",
                    "clear structure, readable",
                    "elegant, easy to understand and maintain",
                ],
            },
            TemplateCriterion {
                name: "efficiency",
                weight: 0.25,
                description: "Runtime efficiency of the code",
                levels: [
                    "very poor performance with obvious inefficiencies",
                    "average performance with room to optimize",
                    "good performance, basic optimization",
                    "excellent performance, highly optimized",
                ],
            },
            TemplateCriterion {
                name: "security",
                weight: 0.15,
                description: "Security of the code",
                levels: [
                    "serious security vulnerabilities",
                    "potential security risks",
                    "mostly secure with small improvements possible",
                    "follows security best practice",
                ],
            },
        ],
    },
    RubricTemplate {
        id: "ai-system",
        name: "AI system benchmark",
        description: "Evaluates overall performance and quality of an AI system",
        criteria: &[
            TemplateCriterion {
                name: "performance",
                weight: 0.2,
                description: "Response speed and resource utilization",
                levels: [
                    "slow responses, poor utilization",
                    "average responses, moderate utilization",
                    "fast responses, good utilization",
                    "very fast responses, excellent utilization",
                ],
            },
            TemplateCriterion {
                name: "accuracy",
                weight: 0.25,
                description: "Accuracy and dependability of results",
                levels: [
                    "frequently wrong, low dependability",
                    "occasionally wrong, average dependability",
                    "mostly accurate, good dependability",
                    "highly accurate, high dependability",
                ],
            },
            TemplateCriterion {
                name: "user-experience",
                weight: 0.15,
                description: "Ease of use and interaction design",
                levels: [
                    "complex interaction, hard to use",
                    "average interaction, needs learning",
                    "friendly interaction, fairly simple",
                    "excellent interaction, very simple",
                ],
            },
            TemplateCriterion {
                name: "reliability",
                weight: 0.2,
                description: "Stability and error handling",
                levels: [
                    "frequent failures, poor error handling",
                    "occasional failures, average error handling",
                    "fairly stable, good error handling",
                    "very stable, strong error handling",
                ],
            },
            TemplateCriterion {
                name: "innovation",
                weight: 0.2,
                description: "Novel features and technical advancement",
                levels: [
                    "outdated technology, no innovation",
                    "ordinary technology, little innovation",
                    "advanced technology, innovative",
                    "leading technology, outstanding innovation",
                ],
            },
        ],
    },
];

/// All built-in templates, in display order.
pub fn builtin_templates() -> &'static [RubricTemplate] {
    &TEMPLATES
}

/// Look up a built-in template by id.
pub fn find_template(id: &str) -> Result<&'static RubricTemplate> {
    TEMPLATES
        .iter()
        .find(|t| t.id == id)
        .ok_or_else(|| EvalmarkError::TemplateNotFound(id.to_string()))
}

impl Rubric {
    /// Instantiate a template. Empty overrides fall back to the template's
    /// own name and description. The rubric gets a fresh id.
    pub fn from_template(template: &RubricTemplate, name: &str, description: &str) -> Self {
        let pick = |value: &str, fallback: &str| {
            if value.trim().is_empty() {
                fallback.to_string()
            } else {
                value.to_string()
            }
        };
        Self::new(
            pick(name, template.name),
            pick(description, template.description),
            template.criteria(),
            RubricSource::Template,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::{reconcile_weights, validate_rubric};

    #[test]
    fn test_templates_are_balanced_and_valid() {
        for template in builtin_templates() {
            let rubric = Rubric::from_template(template, "", "");
            assert!(reconcile_weights(&rubric.criteria), "{} unbalanced", template.id);
            assert!(validate_rubric(&rubric, 1e-6).is_empty(), "{} has findings", template.id);
        }
    }

    #[test]
    fn test_template_lookup() {
        let t = find_template("code-generation").expect("exists");
        let names: Vec<String> = t.criteria().keys().cloned().collect();
        assert_eq!(names, vec!["functionality", "readability", "efficiency", "security"]);
        assert!(matches!(
            find_template("nope").unwrap_err(),
            EvalmarkError::TemplateNotFound(id) if id == "nope"
        ));
    }

    #[test]
    fn test_from_template_overrides() {
        let t = find_template("text-generation").expect("exists");
        let defaulted = Rubric::from_template(t, "  ", "");
        assert_eq!(defaulted.name, t.name);
        assert_eq!(defaulted.description, t.description);
        assert_eq!(defaulted.source, RubricSource::Template);

        let named = Rubric::from_template(t, "Support bot", "Weekly run");
        assert_eq!(named.name, "Support bot");
        assert_eq!(named.description, "Weekly run");
        assert_ne!(named.id, defaulted.id);
    }
}
