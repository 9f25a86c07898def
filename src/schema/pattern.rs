//! Pattern analyzer stage output: behavioral profile and cognitive biases

use serde::{Deserialize, Serialize};

use super::{in_range, non_empty_list, require, Uncertainty};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestorCharacter {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub behavioral_bias: String,
}

impl InvestorCharacter {
    pub fn validate(&self) -> Result<(), String> {
        require("investor_character.type", &self.kind)?;
        require("investor_character.description", &self.description)?;
        require("investor_character.behavioral_bias", &self.behavioral_bias)
    }
}

/// One scored axis of the behavioral profile. `bias_detected` stays `None`
/// when the axis showed no bias in this trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileMetric {
    pub score: f64,
    pub label: String,
    #[serde(default)]
    pub bias_detected: Option<String>,
}

impl ProfileMetric {
    fn validate(&self, field: &str) -> Result<(), String> {
        in_range(field, self.score, 0.0, 100.0)?;
        require(field, &self.label)
    }
}

/// The six-axis profile is a fixed shape, not an open map: a generator
/// inventing a seventh axis or dropping one fails deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileMetrics {
    pub information_sensitivity: ProfileMetric,
    pub analysis_depth: ProfileMetric,
    pub risk_management: ProfileMetric,
    pub decisiveness: ProfileMetric,
    pub emotional_control: ProfileMetric,
    pub learning_adaptability: ProfileMetric,
}

impl ProfileMetrics {
    pub fn validate(&self) -> Result<(), String> {
        self.information_sensitivity
            .validate("profile_metrics.information_sensitivity")?;
        self.analysis_depth.validate("profile_metrics.analysis_depth")?;
        self.risk_management.validate("profile_metrics.risk_management")?;
        self.decisiveness.validate("profile_metrics.decisiveness")?;
        self.emotional_control
            .validate("profile_metrics.emotional_control")?;
        self.learning_adaptability
            .validate("profile_metrics.learning_adaptability")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimaryBias {
    pub name: String,
    pub english: String,
    pub description: String,
    pub impact: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecondaryBias {
    pub name: String,
    pub english: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CognitiveAnalysis {
    pub primary_bias: PrimaryBias,
    #[serde(default)]
    pub secondary_biases: Vec<SecondaryBias>,
}

impl CognitiveAnalysis {
    pub fn validate(&self) -> Result<(), String> {
        require("primary_bias.name", &self.primary_bias.name)?;
        require("primary_bias.english", &self.primary_bias.english)?;
        require("primary_bias.description", &self.primary_bias.description)?;
        require("primary_bias.impact", &self.primary_bias.impact)?;
        for bias in &self.secondary_biases {
            require("secondary_bias.name", &bias.name)?;
            require("secondary_bias.english", &bias.english)?;
            require("secondary_bias.description", &bias.description)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionProblem {
    pub problem_type: String,
    pub psychological_trigger: String,
    pub situation: String,
    pub thought_pattern: String,
    pub consequence: String,
    pub frequency: Frequency,
}

impl DecisionProblem {
    pub fn validate(&self) -> Result<(), String> {
        require("decision_problem.problem_type", &self.problem_type)?;
        require(
            "decision_problem.psychological_trigger",
            &self.psychological_trigger,
        )?;
        require("decision_problem.situation", &self.situation)?;
        require("decision_problem.thought_pattern", &self.thought_pattern)?;
        require("decision_problem.consequence", &self.consequence)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternAnalysis {
    pub investor_character: InvestorCharacter,
    pub profile_metrics: ProfileMetrics,
    pub cognitive_analysis: CognitiveAnalysis,
    pub decision_problems: Vec<DecisionProblem>,
    pub pattern_strengths: Vec<String>,
    pub pattern_weaknesses: Vec<String>,
    pub uncertainty: Uncertainty,
}

impl PatternAnalysis {
    pub fn validate(&self) -> Result<(), String> {
        self.investor_character.validate()?;
        self.profile_metrics.validate()?;
        self.cognitive_analysis.validate()?;
        non_empty_list("decision_problems", &self.decision_problems)?;
        for problem in &self.decision_problems {
            problem.validate()?;
        }
        // Both sides of the pattern are required: a weaknesses-only profile
        // reads as a verdict, not a review.
        non_empty_list("pattern_strengths", &self.pattern_strengths)?;
        non_empty_list("pattern_weaknesses", &self.pattern_weaknesses)?;
        for item in self.pattern_strengths.iter().chain(&self.pattern_weaknesses) {
            require("pattern list member", item)?;
        }
        Ok(())
    }
}
