//! Evaluates a finished pipeline run against the fixed metric targets
//!
//! Deterministic metrics (anachronism, latency, structural validity) always
//! compute from the run itself. The two judge-backed trust metrics run only
//! when a judge generator is attached; without one they are omitted, not
//! failed.

use chrono::{NaiveDate, Utc};
use serde_json::json;
use tracing::warn;

use crate::llm::TextGenerator;
use crate::pipeline::PipelineRun;
use crate::schema::NewsAnalysis;

use super::judge::LlmJudge;
use super::{targets, EvaluationReport, MetricResult, MetricTier};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y.%m.%d", "%Y/%m/%d", "%b %d, %Y", "%d %b %Y"];

fn parse_review_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
}

pub struct Evaluator<'a> {
    judge: Option<LlmJudge<'a>>,
}

impl<'a> Evaluator<'a> {
    /// Deterministic metrics only.
    pub fn new() -> Self {
        Self { judge: None }
    }

    /// Adds the judge-backed signal-to-noise and fact-consistency metrics.
    pub fn with_judge(generator: &'a dyn TextGenerator) -> Self {
        Self {
            judge: Some(LlmJudge::new(generator)),
        }
    }

    pub async fn evaluate(&self, run: &PipelineRun) -> EvaluationReport {
        let mut metrics = Vec::new();

        match zero_anachronism(run) {
            Some(metric) => metrics.push(metric),
            None => warn!(request_id = %run.request_id, "zero_anachronism omitted"),
        }
        metrics.push(e2e_latency(run));
        metrics.push(structural_validity(run));

        if let Some(judge) = &self.judge {
            let news = &run.state.news.value;
            match judge.signal_to_noise(news).await {
                Ok(ratio) => metrics.push(metric(
                    run,
                    "signal_to_noise",
                    MetricTier::Impact,
                    ratio,
                    targets::SIGNAL_TO_NOISE_RATIO,
                    ratio >= targets::SIGNAL_TO_NOISE_RATIO,
                    json!({ "headline_count": news.key_headlines.len() }),
                )),
                Err(err) => {
                    warn!(request_id = %run.request_id, error = %err, "signal_to_noise omitted")
                }
            }
            match judge.fact_consistency(news).await {
                Ok(score) => metrics.push(metric(
                    run,
                    "fact_consistency",
                    MetricTier::Trust,
                    score,
                    targets::FACT_CONSISTENCY_SCORE,
                    score >= targets::FACT_CONSISTENCY_SCORE,
                    json!({ "verdict": news.fact_check.verdict }),
                )),
                Err(err) => {
                    warn!(request_id = %run.request_id, error = %err, "fact_consistency omitted")
                }
            }
        }

        EvaluationReport::new(run.request_id, metrics)
    }
}

impl Default for Evaluator<'_> {
    fn default() -> Self {
        Self::new()
    }
}

fn metric(
    run: &PipelineRun,
    name: &str,
    tier: MetricTier,
    value: f64,
    target: f64,
    passed: bool,
    metadata: serde_json::Value,
) -> MetricResult {
    MetricResult {
        metric_name: name.to_string(),
        tier,
        value,
        target,
        passed,
        timestamp: Utc::now(),
        request_id: run.request_id,
        metadata,
    }
}

/// Share of retrieved headlines dated inside the review window. Zero
/// tolerance: a single out-of-window or undatable headline fails the metric.
/// An empty headline set has nothing to be anachronistic about and passes.
/// Returns `None` when the review window itself cannot be parsed.
fn zero_anachronism(run: &PipelineRun) -> Option<MetricResult> {
    let news: &NewsAnalysis = &run.state.news.value;
    if news.key_headlines.is_empty() {
        return Some(metric(
            run,
            "zero_anachronism",
            MetricTier::Trust,
            100.0,
            targets::ZERO_ANACHRONISM_RATE,
            true,
            json!({ "note": "no headlines retrieved", "total": 0 }),
        ));
    }

    let buy = parse_review_date(&run.state.input.buy_date)?;
    let sell = parse_review_date(&run.state.input.sell_date)?;

    let total = news.key_headlines.len();
    let mut invalid: Vec<&str> = Vec::new();
    for headline in &news.key_headlines {
        match parse_review_date(&headline.date) {
            Some(date) if date >= buy && date <= sell => {}
            _ => invalid.push(headline.date.as_str()),
        }
    }

    let rate = (total - invalid.len()) as f64 / total as f64 * 100.0;
    let rate = (rate * 100.0).round() / 100.0;
    Some(metric(
        run,
        "zero_anachronism",
        MetricTier::Trust,
        rate,
        targets::ZERO_ANACHRONISM_RATE,
        rate == targets::ZERO_ANACHRONISM_RATE,
        json!({
            "total": total,
            "invalid": invalid.len(),
            "invalid_dates": invalid.iter().take(5).collect::<Vec<_>>(),
        }),
    ))
}

fn e2e_latency(run: &PipelineRun) -> MetricResult {
    let seconds = run.elapsed_ms() as f64 / 1000.0;
    metric(
        run,
        "e2e_latency",
        MetricTier::Stability,
        seconds,
        targets::E2E_LATENCY_SECONDS,
        seconds < targets::E2E_LATENCY_SECONDS,
        json!({ "stage_timings": run.timings }),
    )
}

fn structural_validity(run: &PipelineRun) -> MetricResult {
    let total = PipelineRun::GENERATED_STAGES;
    let fallbacks = run.fallback_count();
    let rate = (total - fallbacks) as f64 / total as f64 * 100.0;
    let rate = (rate * 100.0).round() / 100.0;
    metric(
        run,
        "structural_validity",
        MetricTier::Stability,
        rate,
        targets::STRUCTURAL_VALIDITY_RATE,
        rate >= targets::STRUCTURAL_VALIDITY_RATE,
        json!({ "stages": total, "fallbacks": fallbacks }),
    )
}
