//! End-to-end pipeline tests with deterministic generators.
//!
//! Market data and news retrieval are pointed at unreachable endpoints, so
//! the two analyst stages exercise their data-unavailable fallbacks while
//! the downstream stages run against scripted generator output.

use anyhow::Result;
use async_trait::async_trait;

use losscoach::data::MarketDataClient;
use losscoach::llm::{LlmResponse, TextGenerator};
use losscoach::pipeline::Pipeline;
use losscoach::schema::{CauseCategory, TradeRequest};
use losscoach::search::NewsSearchClient;

const ATTRIBUTION_REPLY: &str = r#"{
  "loss_check": "confirmed loss",
  "loss_amount_pct": "-9.80%",
  "one_line_summary": "The earnings thesis was never verified and the position drifted down",
  "root_causes": [
    {
      "id": "RC001",
      "category": "internal",
      "subcategory": "judgment_error",
      "title": "Unverified earnings thesis",
      "description": "The entry rested on an expected earnings beat with no second source",
      "impact_score": 7.0,
      "impact_level": "high",
      "evidence": [
        {
          "source": "user_input",
          "kind": "user_decision",
          "data_point": "earnings would beat",
          "interpretation": "the investor's stated entry reasoning"
        }
      ],
      "timeline_relevance": "before_buy"
    },
    {
      "id": "RC002",
      "category": "external",
      "subcategory": "market_condition",
      "title": "Broad risk-off drift",
      "description": "The wider market drifted lower across the holding window",
      "impact_score": 3.0,
      "impact_level": "medium",
      "evidence": [
        {
          "source": "technical",
          "kind": "price",
          "data_point": "sideways-to-down tape",
          "interpretation": "no confirming momentum during the hold"
        }
      ],
      "timeline_relevance": "during_hold"
    }
  ],
  "cause_breakdown": { "internal_ratio": 70.0, "external_ratio": 30.0 },
  "detailed_explanation": "The dominant contributor was process-side: the thesis was acted on without verification. Market drift added a smaller external component.",
  "confidence": "medium",
  "market_context": {
    "market_situation": "quiet tape with a mild downward drift",
    "news_at_loss_time": [],
    "related_news": []
  },
  "pattern_input": {
    "investment_reason": "earnings would beat",
    "loss_cause_summary": "thesis acted on without verification",
    "loss_cause_details": ["no second source consulted before entry"],
    "objective_signals": {
      "price_trend": "sideways",
      "volatility_level": "unknown",
      "technical_indicators": [],
      "news_facts": []
    },
    "uncertainty": "medium"
  }
}"#;

const PATTERN_REPLY: &str = r#"{
  "investor_character": {
    "type": "conviction-driven entrant",
    "description": "Commits quickly to a clear thesis and holds through drawdown",
    "behavioral_bias": "confirmation_bias"
  },
  "profile_metrics": {
    "information_sensitivity": { "score": 35.0, "label": "reads one source", "bias_detected": "confirmation_bias" },
    "analysis_depth": { "score": 40.0, "label": "headline-level", "bias_detected": null },
    "risk_management": { "score": 30.0, "label": "no exit rule", "bias_detected": null },
    "decisiveness": { "score": 75.0, "label": "acts fast on conviction", "bias_detected": null },
    "emotional_control": { "score": 55.0, "label": "held without panic", "bias_detected": null },
    "learning_adaptability": { "score": 60.0, "label": "reviews losing trades", "bias_detected": null }
  },
  "cognitive_analysis": {
    "primary_bias": {
      "name": "확증 편향",
      "english": "confirmation_bias",
      "description": "Weighs confirming information more than disconfirming information",
      "impact": "the earnings thesis was never stress-tested"
    },
    "secondary_biases": []
  },
  "decision_problems": [
    {
      "problem_type": "unverified thesis",
      "psychological_trigger": "conviction after one confirming article",
      "situation": "entered on an expected earnings beat",
      "thought_pattern": "one source agreeing felt like enough",
      "consequence": "the position was built on a single unchecked claim",
      "frequency": "medium"
    }
  ],
  "pattern_strengths": ["states an explicit thesis before entering"],
  "pattern_weaknesses": ["no verification step between thesis and order"],
  "uncertainty": "medium"
}"#;

const TUTOR_REPLY: &str = r#"{
  "custom_learning_path": {
    "path_summary": "Start with thesis verification, then add a written exit rule",
    "learning_materials": ["a primer on base rates in earnings surprises"],
    "practice_steps": ["write the exit condition before the next entry"],
    "recommended_topics": ["implementation intentions"]
  },
  "investment_advisor": {
    "advisor_message": "This trade paid for a clear lesson: a thesis needs one verification step before money follows it.",
    "recommended_questions": ["what would have disconfirmed my thesis before I bought?"]
  },
  "learning_frame": {
    "loss_reframe": {
      "original": "a -9.8% outcome",
      "reframed": "tuition paid for learning that conviction is not verification",
      "learning_value": "a checkable thesis beats a confident one"
    },
    "mistake_reframe": {
      "original": "acted on one confirming source",
      "reframed": "committing to a stated thesis is a strength that needs one added step",
      "strength_focus": "willingness to state a thesis before entry"
    },
    "progress_frame": {
      "message": "You already write down why you enter; most investors never do.",
      "comparison_anchor": "most losing trades are never reviewed at all"
    }
  },
  "action_missions": [
    {
      "mission_id": "M001",
      "priority": 1,
      "title": "Find one opposing view",
      "description": "Before the next entry, locate one credible source that disagrees with the thesis and write down its argument.",
      "behavioral_target": "confirmation_bias",
      "expected_outcome": "a felt sense of how one-sided the inputs were",
      "difficulty": "easy",
      "estimated_impact": "high",
      "if_then_plan": {
        "trigger_situation": "about to place the order",
        "trigger_emotion": "feeling certain",
        "then_action": "search for one opposing opinion first",
        "commitment_phrase": "If I am about to place the order, then I will search for one opposing opinion first."
      }
    }
  ],
  "uncertainty": "medium"
}"#;

const QUIZ_REPLY: &str = r#"{
  "purpose": "check retention of this trade's loss review",
  "quizzes": [
    {
      "quiz_id": "Q1",
      "kind": "multiple_choice",
      "question": "What was the dominant cause of this loss?",
      "options": [
        { "text": "the thesis was acted on without verification" },
        { "text": "a sudden macro shock" },
        { "text": "an exchange outage" },
        { "text": "a dividend cut" }
      ],
      "correct_answer_index": 0
    },
    {
      "quiz_id": "Q2",
      "kind": "multiple_choice",
      "question": "What share of the loss was attributed to the investor's own process?",
      "options": [
        { "text": "about 10%" },
        { "text": "about 30%" },
        { "text": "about 70%" },
        { "text": "none of it" }
      ],
      "correct_answer_index": 2
    },
    {
      "quiz_id": "Q3",
      "kind": "reflective",
      "question": "Which habit will you practice before the next trade?",
      "options": [
        { "text": "find one opposing view", "resolution": "directly counters the confirmation bias seen in this trade" },
        { "text": "write the exit rule first", "resolution": "turns an open-ended hold into a testable plan" },
        { "text": "check a second data source", "resolution": "verifies the thesis before money follows it" },
        { "text": "log the trade in a journal", "resolution": "makes the pattern visible across trades" }
      ]
    }
  ]
}"#;

/// Returns a fixed, stage-appropriate reply keyed on the system
/// instruction. Fails loudly on a prompt it does not know.
struct ScriptedGenerator;

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn invoke(&self, system_instruction: &str, _payload: &str) -> Result<LlmResponse> {
        let content = if system_instruction.contains("loss attribution analyst") {
            ATTRIBUTION_REPLY
        } else if system_instruction.contains("behavioral finance analyst") {
            PATTERN_REPLY
        } else if system_instruction.contains("learning tutor") {
            TUTOR_REPLY
        } else if system_instruction.contains("quiz writer") {
            QUIZ_REPLY
        } else {
            anyhow::bail!("unexpected stage prompt: {}", system_instruction);
        };
        Ok(LlmResponse {
            content: content.to_string(),
            model: "scripted".to_string(),
        })
    }
}

struct FailingGenerator;

#[async_trait]
impl TextGenerator for FailingGenerator {
    async fn invoke(&self, _system: &str, _payload: &str) -> Result<LlmResponse> {
        anyhow::bail!("connection refused")
    }
}

fn request() -> TradeRequest {
    TradeRequest {
        stock: "AAPL".to_string(),
        buy_date: "2024-03-12".to_string(),
        sell_date: "2024-04-18".to_string(),
        decision_basis: "earnings would beat".to_string(),
        user_message: None,
        position_status: Some("sold".to_string()),
    }
}

fn pipeline<G: TextGenerator>(generator: G) -> Pipeline<G> {
    // Unroutable endpoints: both analyst stages degrade deterministically.
    let market = MarketDataClient::with_base_url("http://127.0.0.1:9");
    let search = NewsSearchClient::with_base_url(None, "http://127.0.0.1:9");
    Pipeline::new(generator, market, search)
}

#[tokio::test]
async fn test_scripted_run_generates_downstream_stages() {
    let run = pipeline(ScriptedGenerator)
        .run(&request())
        .await
        .expect("valid input must not fail");
    let state = &run.state;

    assert!(state.technical.is_fallback());
    assert!(state.news.is_fallback());
    assert!(!state.attribution.is_fallback());
    assert!(!state.pattern.is_fallback());
    assert!(!state.report.is_fallback());
    assert!(!state.quiz.is_fallback());
    assert_eq!(run.fallback_count(), 2);
    assert_eq!(run.timings.len(), 6);

    assert!(state.technical.value.validate().is_ok());
    assert!(state.news.value.validate().is_ok());
    assert!(state.attribution.value.validate().is_ok());
    assert!(state.pattern.value.validate().is_ok());
    assert!(state.report.value.validate().is_ok());
    assert!(state.quiz.value.validate().is_ok());

    assert!(state.attribution.value.has_category(CauseCategory::Internal));
    let breakdown = &state.attribution.value.cause_breakdown;
    assert!((breakdown.internal_ratio + breakdown.external_ratio - 100.0).abs() <= 3.0);
}

#[tokio::test]
async fn test_full_outage_degrades_every_stage_and_still_completes() {
    let run = pipeline(FailingGenerator)
        .run(&request())
        .await
        .expect("outage must not fail the run");
    let state = &run.state;

    assert_eq!(run.fallback_count(), 6);
    assert!(state.technical.value.validate().is_ok());
    assert!(state.news.value.validate().is_ok());
    assert!(state.attribution.value.validate().is_ok());
    assert!(state.pattern.value.validate().is_ok());
    assert!(state.report.value.validate().is_ok());
    assert!(state.quiz.value.validate().is_ok());

    // Even in total outage the attribution keeps an evidenced internal cause.
    assert!(state.attribution.value.has_category(CauseCategory::Internal));
}

#[tokio::test]
async fn test_identical_inputs_serialize_to_identical_state() {
    let p = pipeline(ScriptedGenerator);
    let first = p.run(&request()).await.expect("first run");
    let second = p.run(&request()).await.expect("second run");

    let first_json = serde_json::to_string(&first.state).expect("serialize first");
    let second_json = serde_json::to_string(&second.state).expect("serialize second");
    assert_eq!(first_json, second_json);

    // Run metadata stays out of the deterministic state.
    assert_ne!(first.request_id, second.request_id);
}

#[tokio::test]
async fn test_missing_fields_reported_in_order() {
    let bad = TradeRequest {
        stock: "  ".to_string(),
        buy_date: "2024-03-12".to_string(),
        sell_date: "2024-04-18".to_string(),
        decision_basis: "".to_string(),
        user_message: None,
        position_status: None,
    };
    let err = pipeline(ScriptedGenerator)
        .run(&bad)
        .await
        .expect_err("blank fields must be fatal");
    assert_eq!(err.fields, vec!["stock".to_string(), "decision_basis".to_string()]);
}

#[test]
fn test_unknown_request_key_is_rejected() {
    let raw = r#"{
        "stock": "AAPL",
        "buy_date": "2024-03-12",
        "sell_date": "2024-04-18",
        "decision_basis": "earnings would beat",
        "portfolio_size": 100000
    }"#;
    assert!(serde_json::from_str::<TradeRequest>(raw).is_err());
}
