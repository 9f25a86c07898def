//! Tutor stage: the learning report with behavioral nudges
//!
//! The emotional register of the advisor message is not left to the
//! generator: a rule table over the trade's pnl and position status picks
//! it, and the prompt carries the chosen register. The repair pass fills
//! missing if-then plans from a fixed per-bias lookup, synthesizes a
//! missing learning frame from the loss summary, and rewrites an advisor
//! message that frames the loss in negative-valence terms.

use serde_json::json;

use crate::llm::TextGenerator;
use crate::schema::{
    ActionMission, Difficulty, EstimatedImpact, IfThenPlan, InvestmentAdvisor, LearningFrame,
    LearningPath, LossAttribution, LossReframe, MistakeReframe, PatternAnalysis, PositionStatus,
    ProgressFrame, StageOutput, TradeInput, TutorReport, Uncertainty,
};

use super::run_guarded;

const SYSTEM_PROMPT: &str = "You are an investment learning tutor and behavior \
coach reviewing one closed trade. Design nudges that change behavior: a \
custom learning path, an empathetic advisor message in the requested tone \
register, a learning frame that reframes the loss as tuition and the mistake \
as a strength with a missing step, and 1-3 action missions each with an \
if-then implementation plan. Never give buy/sell advice, target prices, or \
forecasts. In loss situations avoid words like 'failure' or 'fault'; reframe \
as tuition and experience. Respond with a single JSON object with keys: \
custom_learning_path {path_summary, learning_materials, practice_steps, \
recommended_topics}, investment_advisor {advisor_message, \
recommended_questions}, learning_frame {loss_reframe {original, reframed, \
learning_value}, mistake_reframe {original, reframed, strength_focus}, \
progress_frame {message, comparison_anchor}}, action_missions [{mission_id, \
priority (1-3), title, description, behavioral_target, expected_outcome, \
difficulty, estimated_impact, if_then_plan {trigger_situation, \
trigger_emotion, then_action, commitment_phrase}}], uncertainty.";

/// Emotional register of the advisor message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToneRegister {
    Celebratory,
    Balanced,
    Reassuring,
    DeeplyEmpathetic,
}

impl ToneRegister {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToneRegister::Celebratory => "celebratory",
            ToneRegister::Balanced => "balanced",
            ToneRegister::Reassuring => "reassuring",
            ToneRegister::DeeplyEmpathetic => "deeply_empathetic",
        }
    }
}

/// Deterministic tone rule table. Open positions get the balanced register
/// regardless of paper pnl; closed trades scale with the realized outcome.
pub fn tone_for(pnl_pct: Option<f64>, status: PositionStatus) -> ToneRegister {
    if status == PositionStatus::Holding {
        return ToneRegister::Balanced;
    }
    match pnl_pct {
        Some(pnl) if pnl > 0.0 => ToneRegister::Celebratory,
        Some(pnl) if pnl >= -15.0 => ToneRegister::Reassuring,
        Some(_) => ToneRegister::DeeplyEmpathetic,
        None => ToneRegister::Balanced,
    }
}

/// Parse "-15.3%" / "+5.2%" style strings; anything unparseable is None.
pub fn parse_pnl_pct(raw: &str) -> Option<f64> {
    raw.trim().trim_end_matches('%').parse().ok()
}

/// Words that frame a loss as personal failure. One hit in the advisor
/// message of a losing trade triggers the message repair.
const NEGATIVE_VALENCE: [&str; 6] = ["실패", "잘못", "failure", "failed", "fault", "stupid"];

fn frames_loss_negatively(message: &str) -> bool {
    let lowered = message.to_lowercase();
    NEGATIVE_VALENCE.iter().any(|word| lowered.contains(word))
}

/// Fixed if-then templates per bias, from behavior-change coaching practice.
fn if_then_for(bias: &str) -> IfThenPlan {
    let (situation, emotion, action) = match bias {
        b if b.contains("loss_aversion") => (
            "the position reaches a -5% drawdown",
            "reluctance to realize the loss",
            "re-read the trade journal entry written at entry",
        ),
        b if b.contains("fomo") => (
            "a surging-price headline appears",
            "urgency to get in now",
            "set a 24-hour timer before any order",
        ),
        b if b.contains("herding") => (
            "the thought 'everyone is buying this' comes up",
            "fear of being left out",
            "write one sentence of my own analysis first",
        ),
        b if b.contains("anchoring") => (
            "comparing the price to its previous high",
            "conviction that it must recover",
            "check the current valuation multiples instead",
        ),
        b if b.contains("overconfidence") => (
            "the thought 'my gut is right' comes up",
            "strong conviction",
            "review the outcome of my most recent trade",
        ),
        // confirmation_bias and any unrecognized bias
        _ => (
            "about to press the buy button",
            "feeling certain",
            "search for one opposing opinion first",
        ),
    };
    IfThenPlan {
        trigger_situation: situation.to_string(),
        trigger_emotion: emotion.to_string(),
        then_action: action.to_string(),
        commitment_phrase: format!("If {}, then I will {}.", situation, action),
    }
}

fn synthesized_frame(loss_summary: &str, pnl_label: &str) -> LearningFrame {
    LearningFrame {
        loss_reframe: LossReframe {
            original: format!("a {} outcome", pnl_label),
            reframed: format!(
                "tuition of {} paid for a concrete lesson: {}",
                pnl_label, loss_summary
            ),
            learning_value: "insight that prevents a larger loss later".to_string(),
        },
        mistake_reframe: MistakeReframe {
            original: loss_summary.to_string(),
            reframed: "acting on a clear thesis is a strength; it needs a verification \
                step before execution"
                .to_string(),
            strength_focus: "willingness to commit to a stated thesis".to_string(),
        },
        progress_frame: ProgressFrame {
            message: "Recognizing this pattern is itself progress.".to_string(),
            comparison_anchor: "most investors never examine a losing trade".to_string(),
        },
    }
}

struct RepairContext {
    primary_bias: String,
    loss_summary: String,
    pnl_label: String,
    is_loss: bool,
}

fn repair(mut report: TutorReport, ctx: &RepairContext) -> TutorReport {
    for mission in &mut report.action_missions {
        let plan_ok = mission
            .if_then_plan
            .as_ref()
            .map(|plan| plan.validate().is_ok())
            .unwrap_or(false);
        if !plan_ok {
            // Prefer the mission's own target bias, fall back to the primary.
            let bias = if mission.behavioral_target.trim().is_empty() {
                &ctx.primary_bias
            } else {
                &mission.behavioral_target
            };
            mission.if_then_plan = Some(if_then_for(bias));
        }
    }

    let frame_ok = report
        .learning_frame
        .as_ref()
        .map(|frame| frame.validate().is_ok())
        .unwrap_or(false);
    if !frame_ok {
        report.learning_frame = Some(synthesized_frame(&ctx.loss_summary, &ctx.pnl_label));
    }

    if ctx.is_loss && frames_loss_negatively(&report.investment_advisor.advisor_message) {
        report.investment_advisor.advisor_message = format!(
            "This trade was tuition, not a verdict. The lesson it paid for: {}. \
             The next step is one small change, not a different person.",
            ctx.loss_summary
        );
    }

    report
}

pub async fn run(
    generator: &dyn TextGenerator,
    input: &TradeInput,
    attribution: &LossAttribution,
    pattern: &PatternAnalysis,
) -> StageOutput<TutorReport> {
    let pnl_pct = parse_pnl_pct(&attribution.loss_amount_pct);
    let tone = tone_for(pnl_pct, input.trade_period.position_status);

    let weak_metrics: Vec<&str> = {
        let metrics = &pattern.profile_metrics;
        [
            ("information_sensitivity", metrics.information_sensitivity.score),
            ("analysis_depth", metrics.analysis_depth.score),
            ("risk_management", metrics.risk_management.score),
            ("decisiveness", metrics.decisiveness.score),
            ("emotional_control", metrics.emotional_control.score),
            ("learning_adaptability", metrics.learning_adaptability.score),
        ]
        .into_iter()
        .filter(|(_, score)| *score <= 40.0)
        .map(|(name, _)| name)
        .collect()
    };

    let payload = json!({
        "tone_register": tone.as_str(),
        "primary_bias": pattern.cognitive_analysis.primary_bias,
        "weak_metrics": weak_metrics,
        "top_decision_problem": pattern.decision_problems.first(),
        "loss_summary": attribution.pattern_input.loss_cause_summary,
        "loss_amount_pct": attribution.loss_amount_pct,
        "position_status": input.trade_period.position_status,
        "investor_character": pattern.investor_character.kind,
    });

    let ctx = RepairContext {
        primary_bias: pattern.cognitive_analysis.primary_bias.english.clone(),
        loss_summary: attribution.pattern_input.loss_cause_summary.clone(),
        pnl_label: attribution.loss_amount_pct.clone(),
        is_loss: pnl_pct.map(|pnl| pnl < 0.0).unwrap_or(false),
    };

    run_guarded(
        "tutor",
        generator,
        SYSTEM_PROMPT,
        &payload,
        |report| repair(report, &ctx),
        TutorReport::validate,
        |reason| fallback(&ctx, reason),
    )
    .await
}

fn fallback(ctx: &RepairContext, reason: &str) -> TutorReport {
    TutorReport {
        custom_learning_path: LearningPath {
            path_summary: format!(
                "A personalized learning path could not be generated ({}). Start \
                 from the evidenced causes of this trade.",
                reason
            ),
            learning_materials: Vec::new(),
            practice_steps: vec![
                "write down the entry thesis and its exit condition before the next trade"
                    .to_string(),
            ],
            recommended_topics: vec!["verifying a thesis with a second source".to_string()],
        },
        investment_advisor: InvestmentAdvisor {
            advisor_message: format!(
                "This trade was tuition, not a verdict. The lesson it paid for: {}.",
                ctx.loss_summary
            ),
            recommended_questions: vec![
                "what would have disconfirmed my thesis before I bought?".to_string(),
            ],
        },
        learning_frame: Some(synthesized_frame(&ctx.loss_summary, &ctx.pnl_label)),
        action_missions: vec![ActionMission {
            mission_id: "M001".to_string(),
            priority: 1,
            title: "Find one opposing opinion".to_string(),
            description: "Before the next entry, find exactly one credible source that \
                disagrees with the thesis and write down its argument."
                .to_string(),
            behavioral_target: ctx.primary_bias.clone(),
            expected_outcome: "a felt sense of how one-sided the inputs were".to_string(),
            difficulty: Difficulty::Easy,
            estimated_impact: EstimatedImpact::Medium,
            if_then_plan: Some(if_then_for(&ctx.primary_bias)),
        }],
        uncertainty: Uncertainty::High,
    }
}
