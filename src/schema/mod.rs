//! Typed stage output records and their structural validators
//!
//! Every stage output is an explicit serde record. Closed enums reject
//! out-of-set values at deserialization time; the `validate` methods check
//! what serde cannot: non-empty required fields, numeric ranges, cross-field
//! tolerance, and list cardinality. Validators are pure and return
//! `Result<(), String>` with the first failure's reason.

use serde::{Deserialize, Serialize};

pub mod attribution;
pub mod input;
pub mod news;
pub mod pattern;
pub mod quiz;
pub mod report;
pub mod technical;

pub use attribution::{
    CauseBreakdown, CauseCategory, CauseSubcategory, Evidence, EvidenceKind, EvidenceSource,
    ImpactLevel, LossAttribution, MarketContext, ObjectiveSignals, PatternInput, RootCause,
    TimelineRelevance, RATIO_TOLERANCE,
};
pub use input::{InputError, PositionStatus, TradeInput, TradePeriod, TradeRequest};
pub use news::{FactCheck, Headline, MarketSentiment, NewsAnalysis, ReviewPeriod};
pub use pattern::{
    CognitiveAnalysis, DecisionProblem, Frequency, InvestorCharacter, PatternAnalysis,
    PrimaryBias, ProfileMetric, ProfileMetrics, SecondaryBias,
};
pub use quiz::{Quiz, QuizKind, QuizOption, QuizSet};
pub use report::{
    ActionMission, Difficulty, EstimatedImpact, IfThenPlan, InvestmentAdvisor, LearningFrame,
    LearningPath, LossReframe, MistakeReframe, ProgressFrame, TutorReport,
};
pub use technical::{IndicatorReading, PriceMove, TechnicalAnalysis, Trend};

/// Shared low/medium/high scale used by most stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Uncertainty {
    Low,
    Medium,
    High,
}

/// Where a stage output came from. Downstream consumers never branch on
/// this: a fallback is shape-identical to a generated output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Provenance {
    Generated,
    Fallback { reason: String },
}

/// A stage output plus its provenance tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageOutput<T> {
    #[serde(flatten)]
    pub value: T,
    pub provenance: Provenance,
}

impl<T> StageOutput<T> {
    pub fn generated(value: T) -> Self {
        Self {
            value,
            provenance: Provenance::Generated,
        }
    }

    pub fn fallback(value: T, reason: impl Into<String>) -> Self {
        Self {
            value,
            provenance: Provenance::Fallback {
                reason: reason.into(),
            },
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.provenance, Provenance::Fallback { .. })
    }
}

/// Require a non-empty (post-trim) string field.
pub(crate) fn require(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} cannot be empty", field));
    }
    Ok(())
}

/// Require a numeric field inside an inclusive range.
pub(crate) fn in_range(field: &str, value: f64, lo: f64, hi: f64) -> Result<(), String> {
    if !(lo..=hi).contains(&value) {
        return Err(format!("{} {} out of range [{}, {}]", field, value, lo, hi));
    }
    Ok(())
}

/// Require a list with at least one member.
pub(crate) fn non_empty_list<T>(field: &str, list: &[T]) -> Result<(), String> {
    if list.is_empty() {
        return Err(format!("{} cannot be empty", field));
    }
    Ok(())
}
