//! Post-hoc evaluation metrics
//!
//! Read-only scoring of a finished pipeline run against fixed targets,
//! organized in three tiers: business impact, reliability/trust, and
//! system stability. A metric whose computation fails is omitted from the
//! report; it never fails the evaluation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod evaluator;
pub mod judge;

pub use evaluator::Evaluator;
pub use judge::LlmJudge;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricTier {
    Impact,
    Trust,
    Stability,
}

impl MetricTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricTier::Impact => "impact",
            MetricTier::Trust => "trust",
            MetricTier::Stability => "stability",
        }
    }
}

/// Fixed metric targets.
pub mod targets {
    /// Every headline inside the review window, no look-ahead bias.
    pub const ZERO_ANACHRONISM_RATE: f64 = 100.0;
    /// Share of retrieved headlines the judge rates as signal.
    pub const SIGNAL_TO_NOISE_RATIO: f64 = 70.0;
    /// Judge-scored consistency between the fact check and the headlines.
    pub const FACT_CONSISTENCY_SCORE: f64 = 95.0;
    /// End-to-end wall clock, in seconds (upper bound).
    pub const E2E_LATENCY_SECONDS: f64 = 15.0;
    /// Share of stage outputs emitted as generated rather than fallback.
    pub const STRUCTURAL_VALIDITY_RATE: f64 = 99.0;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricResult {
    pub metric_name: String,
    pub tier: MetricTier,
    pub value: f64,
    pub target: f64,
    pub passed: bool,
    pub timestamp: DateTime<Utc>,
    pub request_id: Uuid,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub request_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub metrics: Vec<MetricResult>,
    /// Pass rates per tier plus "overall", as ratios in [0, 1].
    pub summary: BTreeMap<String, f64>,
}

impl EvaluationReport {
    pub fn new(request_id: Uuid, metrics: Vec<MetricResult>) -> Self {
        let mut summary = BTreeMap::new();

        for tier in [MetricTier::Impact, MetricTier::Trust, MetricTier::Stability] {
            let members: Vec<&MetricResult> =
                metrics.iter().filter(|m| m.tier == tier).collect();
            if !members.is_empty() {
                let passed = members.iter().filter(|m| m.passed).count();
                summary.insert(
                    tier.as_str().to_string(),
                    passed as f64 / members.len() as f64,
                );
            }
        }
        if !metrics.is_empty() {
            let passed = metrics.iter().filter(|m| m.passed).count();
            summary.insert(
                "overall".to_string(),
                passed as f64 / metrics.len() as f64,
            );
        }

        Self {
            request_id,
            timestamp: Utc::now(),
            metrics,
            summary,
        }
    }
}
