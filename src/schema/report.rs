//! Tutor stage output: learning path, advisor message, reframes, missions
//!
//! `IfThenPlan` and `LearningFrame` validate standalone because the tutor's
//! repair pass replaces just the invalid piece instead of discarding the
//! whole report.

use serde::{Deserialize, Serialize};

use super::{non_empty_list, require, Uncertainty};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimatedImpact {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningPath {
    pub path_summary: String,
    #[serde(default)]
    pub learning_materials: Vec<String>,
    #[serde(default)]
    pub practice_steps: Vec<String>,
    #[serde(default)]
    pub recommended_topics: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentAdvisor {
    pub advisor_message: String,
    #[serde(default)]
    pub recommended_questions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossReframe {
    pub original: String,
    pub reframed: String,
    pub learning_value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MistakeReframe {
    pub original: String,
    pub reframed: String,
    pub strength_focus: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressFrame {
    pub message: String,
    pub comparison_anchor: String,
}

/// Cognitive reframing block: the same loss restated three ways.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningFrame {
    pub loss_reframe: LossReframe,
    pub mistake_reframe: MistakeReframe,
    pub progress_frame: ProgressFrame,
}

impl LearningFrame {
    pub fn validate(&self) -> Result<(), String> {
        require("loss_reframe.original", &self.loss_reframe.original)?;
        require("loss_reframe.reframed", &self.loss_reframe.reframed)?;
        require("loss_reframe.learning_value", &self.loss_reframe.learning_value)?;
        require("mistake_reframe.original", &self.mistake_reframe.original)?;
        require("mistake_reframe.reframed", &self.mistake_reframe.reframed)?;
        require(
            "mistake_reframe.strength_focus",
            &self.mistake_reframe.strength_focus,
        )?;
        require("progress_frame.message", &self.progress_frame.message)?;
        require(
            "progress_frame.comparison_anchor",
            &self.progress_frame.comparison_anchor,
        )
    }
}

/// Implementation-intention plan attached to a mission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfThenPlan {
    pub trigger_situation: String,
    pub trigger_emotion: String,
    pub then_action: String,
    pub commitment_phrase: String,
}

impl IfThenPlan {
    pub fn validate(&self) -> Result<(), String> {
        require("if_then_plan.trigger_situation", &self.trigger_situation)?;
        require("if_then_plan.trigger_emotion", &self.trigger_emotion)?;
        require("if_then_plan.then_action", &self.then_action)?;
        require("if_then_plan.commitment_phrase", &self.commitment_phrase)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionMission {
    pub mission_id: String,
    pub priority: u8,
    pub title: String,
    pub description: String,
    pub behavioral_target: String,
    pub expected_outcome: String,
    pub difficulty: Difficulty,
    pub estimated_impact: EstimatedImpact,
    /// Optional at deserialization time; the tutor's repair pass fills it
    /// from the per-bias lookup when absent or invalid.
    #[serde(default)]
    pub if_then_plan: Option<IfThenPlan>,
}

impl ActionMission {
    pub fn validate(&self) -> Result<(), String> {
        require("mission.mission_id", &self.mission_id)?;
        if !(1..=3).contains(&self.priority) {
            return Err(format!(
                "mission.priority {} out of range [1, 3]",
                self.priority
            ));
        }
        require("mission.title", &self.title)?;
        require("mission.description", &self.description)?;
        require("mission.behavioral_target", &self.behavioral_target)?;
        require("mission.expected_outcome", &self.expected_outcome)?;
        if let Some(plan) = &self.if_then_plan {
            plan.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TutorReport {
    pub custom_learning_path: LearningPath,
    pub investment_advisor: InvestmentAdvisor,
    /// Optional at deserialization time so the tutor's repair pass can
    /// synthesize a missing frame; required by `validate`.
    #[serde(default)]
    pub learning_frame: Option<LearningFrame>,
    pub action_missions: Vec<ActionMission>,
    pub uncertainty: Uncertainty,
}

impl TutorReport {
    pub fn validate(&self) -> Result<(), String> {
        require(
            "custom_learning_path.path_summary",
            &self.custom_learning_path.path_summary,
        )?;
        require(
            "investment_advisor.advisor_message",
            &self.investment_advisor.advisor_message,
        )?;
        match &self.learning_frame {
            Some(frame) => frame.validate()?,
            None => return Err("learning_frame is missing".to_string()),
        }
        non_empty_list("action_missions", &self.action_missions)?;
        for mission in &self.action_missions {
            mission.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TutorReport {
        TutorReport {
            custom_learning_path: LearningPath {
                path_summary: "Start with position sizing, then exit rules".to_string(),
                learning_materials: vec!["risk management primer".to_string()],
                practice_steps: vec!["write the exit rule before entry".to_string()],
                recommended_topics: vec!["implementation intentions".to_string()],
            },
            investment_advisor: InvestmentAdvisor {
                advisor_message: "This trade taught more than it cost".to_string(),
                recommended_questions: vec!["what was my exit rule?".to_string()],
            },
            learning_frame: Some(LearningFrame {
                loss_reframe: LossReframe {
                    original: "I lost 9.8%".to_string(),
                    reframed: "I paid 9.8% for a lesson in verification".to_string(),
                    learning_value: "cross-check the thesis".to_string(),
                },
                mistake_reframe: MistakeReframe {
                    original: "I ignored the guidance risk".to_string(),
                    reframed: "I now know which risk to check first".to_string(),
                    strength_focus: "clear entry thesis".to_string(),
                },
                progress_frame: ProgressFrame {
                    message: "You already name your reasons before entry".to_string(),
                    comparison_anchor: "most first reviews have no stated thesis".to_string(),
                },
            }),
            action_missions: vec![ActionMission {
                mission_id: "M001".to_string(),
                priority: 1,
                title: "Pre-entry checklist".to_string(),
                description: "Write the exit condition before buying".to_string(),
                behavioral_target: "confirmation_bias".to_string(),
                expected_outcome: "earlier exits on broken theses".to_string(),
                difficulty: Difficulty::Easy,
                estimated_impact: EstimatedImpact::High,
                if_then_plan: Some(IfThenPlan {
                    trigger_situation: "about to buy on a single headline".to_string(),
                    trigger_emotion: "urgency".to_string(),
                    then_action: "find one disconfirming source first".to_string(),
                    commitment_phrase: "two sources or no trade".to_string(),
                }),
            }],
            uncertainty: Uncertainty::Medium,
        }
    }

    #[test]
    fn test_valid_report_passes() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_priority_out_of_range_fails() {
        let mut report = sample();
        report.action_missions[0].priority = 4;
        assert!(report.validate().is_err());
    }

    #[test]
    fn test_mission_without_plan_is_valid() {
        let mut report = sample();
        report.action_missions[0].if_then_plan = None;
        assert!(report.validate().is_ok());
    }

    #[test]
    fn test_present_but_empty_plan_fails() {
        let mut report = sample();
        if let Some(plan) = report.action_missions[0].if_then_plan.as_mut() {
            plan.then_action = String::new();
        }
        assert!(report.validate().is_err());
    }

    #[test]
    fn test_learning_frame_validates_standalone() {
        let mut frame = sample().learning_frame.unwrap();
        assert!(frame.validate().is_ok());
        frame.progress_frame.message = " ".to_string();
        assert!(frame.validate().is_err());
    }

    #[test]
    fn test_missing_learning_frame_fails() {
        let mut report = sample();
        report.learning_frame = None;
        assert!(report.validate().is_err());
    }

    #[test]
    fn test_no_missions_fails() {
        let mut report = sample();
        report.action_missions.clear();
        assert!(report.validate().is_err());
    }
}
