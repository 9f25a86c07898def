//! Pattern analyzer stage
//!
//! Consumes only the attribution digest, never the full upstream outputs,
//! so its prompt stays small and its coupling explicit.

use serde_json::json;

use crate::llm::TextGenerator;
use crate::schema::{
    CognitiveAnalysis, DecisionProblem, Frequency, InvestorCharacter, PatternAnalysis,
    PatternInput, PrimaryBias, ProfileMetric, ProfileMetrics, StageOutput, Uncertainty,
};

use super::run_guarded;

const SYSTEM_PROMPT: &str = "You are a behavioral finance analyst reviewing one \
losing trade. From the cause digest, profile the investor's decision pattern: \
character type, six profile axes scored 0-100, the primary cognitive bias and \
any secondary biases, concrete decision problems, and BOTH strengths and \
weaknesses of the pattern. Be descriptive, never prescriptive; no investment \
advice. Respond with a single JSON object with keys: investor_character {type, \
description, behavioral_bias}, profile_metrics {information_sensitivity, \
analysis_depth, risk_management, decisiveness, emotional_control, \
learning_adaptability} each {score, label, bias_detected}, cognitive_analysis \
{primary_bias {name, english, description, impact}, secondary_biases}, \
decision_problems [{problem_type, psychological_trigger, situation, \
thought_pattern, consequence, frequency}], pattern_strengths, \
pattern_weaknesses, uncertainty (low|medium|high).";

pub async fn run(
    generator: &dyn TextGenerator,
    digest: &PatternInput,
) -> StageOutput<PatternAnalysis> {
    let payload = json!({ "pattern_input": digest });

    run_guarded(
        "pattern",
        generator,
        SYSTEM_PROMPT,
        &payload,
        |analysis| analysis,
        PatternAnalysis::validate,
        |reason| fallback(digest, reason),
    )
    .await
}

fn neutral_metric() -> ProfileMetric {
    ProfileMetric {
        score: 50.0,
        label: "insufficient data".to_string(),
        bias_detected: None,
    }
}

fn fallback(digest: &PatternInput, reason: &str) -> PatternAnalysis {
    PatternAnalysis {
        investor_character: InvestorCharacter {
            kind: "unprofiled".to_string(),
            description: format!(
                "A behavioral profile could not be generated ({}).",
                reason
            ),
            behavioral_bias: "undetermined".to_string(),
        },
        profile_metrics: ProfileMetrics {
            information_sensitivity: neutral_metric(),
            analysis_depth: neutral_metric(),
            risk_management: neutral_metric(),
            decisiveness: neutral_metric(),
            emotional_control: neutral_metric(),
            learning_adaptability: neutral_metric(),
        },
        cognitive_analysis: CognitiveAnalysis {
            primary_bias: PrimaryBias {
                name: "확증 편향".to_string(),
                english: "confirmation_bias".to_string(),
                description: "Assumed by default when no profile is available; the \
                    most common bias in self-reported loss reviews."
                    .to_string(),
                impact: "undetermined for this trade".to_string(),
            },
            secondary_biases: Vec::new(),
        },
        decision_problems: vec![DecisionProblem {
            problem_type: "unverified thesis".to_string(),
            psychological_trigger: "undetermined".to_string(),
            situation: digest.investment_reason.clone(),
            thought_pattern: digest.loss_cause_summary.clone(),
            consequence: "the trade closed at a loss".to_string(),
            frequency: Frequency::Medium,
        }],
        pattern_strengths: vec![
            "stated an explicit reason for the trade before entry".to_string(),
        ],
        pattern_weaknesses: vec![
            "the stated reason was not cross-checked against independent data".to_string(),
        ],
        uncertainty: Uncertainty::High,
    }
}
