//! Prompt and scorer-skeleton generation for the LLM and code channels.
//!
//! Both scorers are opaque to the engine; these helpers only produce the
//! text a user hands to them. Disabled criteria are left out.

use crate::domain::record::EvaluationRecord;
use crate::domain::rubric::Rubric;

pub const INPUT_PLACEHOLDER: &str = "{{input}}";
pub const OUTPUT_PLACEHOLDER: &str = "{{output}}";
pub const EXPECTED_OUTPUT_PLACEHOLDER: &str = "{{expected_output}}";

/// Weight as a percentage without trailing zeros (`0.35` → `35`).
fn percent(weight: f64) -> String {
    let pct = (weight * 100.0 * 100.0).round() / 100.0;
    format!("{pct}")
}

/// Judging prompt for an LLM scorer, with record placeholders.
pub fn llm_judge_prompt(rubric: &Rubric) -> String {
    let criteria = rubric
        .enabled_criteria()
        .map(|(name, c)| format!("- {name} ({}%): {}", percent(c.weight), c.description))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Evaluate the quality of the following AI-generated output. \
         Score it from 1 to 4 against these criteria:\n\
         {criteria}\n\
         \n\
         Input: {INPUT_PLACEHOLDER}\n\
         Actual output: {OUTPUT_PLACEHOLDER}\n\
         Expected output: {EXPECTED_OUTPUT_PLACEHOLDER}\n\
         \n\
         Give a score from 1 to 4 and a short explanation:"
    )
}

/// Substitute a record into a prompt produced by [`llm_judge_prompt`].
pub fn render_llm_prompt(template: &str, record: &EvaluationRecord) -> String {
    template
        .replace(INPUT_PLACEHOLDER, &record.input)
        .replace(OUTPUT_PLACEHOLDER, &record.output)
        .replace(EXPECTED_OUTPUT_PLACEHOLDER, &record.expected_output)
}

/// Criterion name as a snake_case identifier.
fn ident(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// Scorer skeleton for the code channel: one helper call and one weighted
/// term per criterion.
pub fn code_scorer_template(rubric: &Rubric) -> String {
    let enabled: Vec<(String, String, f64)> = rubric
        .enabled_criteria()
        .map(|(name, c)| (ident(name), c.description.clone(), c.weight))
        .collect();

    let mut out = String::from(
        "fn evaluate_output(input: &str, output: &str, expected_output: &str) -> Evaluation {\n",
    );
    for (id, description, weight) in &enabled {
        out.push_str(&format!(
            "    // {description} ({}%)\n    let {id}_score = score_{id}(input, output, expected_output);\n\n",
            percent(*weight)
        ));
    }

    let terms = if enabled.is_empty() {
        "0.0".to_string()
    } else {
        enabled
            .iter()
            .map(|(id, _, weight)| format!("{id}_score * {weight:?}"))
            .collect::<Vec<_>>()
            .join("\n        + ")
    };
    out.push_str(&format!("    let total_score =\n        {terms};\n\n"));

    out.push_str("    Evaluation {\n        score: total_score,\n");
    for (id, _, _) in &enabled {
        out.push_str(&format!("        {id}: {id}_score,\n"));
    }
    out.push_str("    }\n}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rubric::{Criterion, RubricSource};
    use indexmap::IndexMap;

    fn rubric() -> Rubric {
        Rubric::new("text", "d", IndexMap::new(), RubricSource::Template)
            .with_criterion("accuracy", Criterion::with_default_levels(0.4, "Match with expected"))
            .with_criterion("user-experience", Criterion::with_default_levels(0.35, "Ease of use"))
            .with_criterion("legacy", Criterion::with_default_levels(0.25, "Old").disabled())
    }

    #[test]
    fn test_llm_prompt_lists_enabled_criteria() {
        let prompt = llm_judge_prompt(&rubric());
        assert!(prompt.contains("- accuracy (40%): Match with expected"));
        assert!(prompt.contains("- user-experience (35%): Ease of use"));
        assert!(!prompt.contains("legacy"));
        assert!(prompt.contains("{{input}}"));
        assert!(prompt.contains("{{expected_output}}"));
    }

    #[test]
    fn test_render_substitutes_record() {
        let record = EvaluationRecord {
            id: "1".into(),
            input: "2+2".into(),
            output: "4".into(),
            expected_output: "four".into(),
            ..Default::default()
        };
        let rendered = render_llm_prompt(&llm_judge_prompt(&rubric()), &record);
        assert!(rendered.contains("Input: 2+2"));
        assert!(rendered.contains("Actual output: 4"));
        assert!(rendered.contains("Expected output: four"));
        assert!(!rendered.contains("{{"));
    }

    #[test]
    fn test_code_template_weights() {
        let code = code_scorer_template(&rubric());
        assert!(code.contains("let accuracy_score = score_accuracy("));
        assert!(code.contains("let user_experience_score"));
        assert!(code.contains("accuracy_score * 0.4"));
        assert!(code.contains("user_experience_score * 0.35"));
        assert!(code.contains("user_experience: user_experience_score,"));
        assert!(!code.contains("legacy"));
    }

    #[test]
    fn test_ident_sanitizes() {
        assert_eq!(ident("User Experience"), "user_experience");
        assert_eq!(ident("3d"), "_3d");
        assert_eq!(ident(""), "_");
    }
}
