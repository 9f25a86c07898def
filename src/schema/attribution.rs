//! Loss attributor stage output: root causes with evidence, the
//! internal/external impact breakdown, and the digest handed to the
//! pattern analyzer

use serde::{Deserialize, Serialize};

use super::technical::{IndicatorReading, Trend};
use super::{in_range, non_empty_list, require, Uncertainty};

/// Allowed drift when the generator reports an internal/external ratio
/// pair. 100 ± this band passes; 105 or 70 fail.
pub const RATIO_TOLERANCE: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CauseCategory {
    Internal,
    External,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CauseSubcategory {
    // internal
    JudgmentError,
    EmotionalTrading,
    TimingMistake,
    RiskManagement,
    InsufficientResearch,
    // external
    MarketCondition,
    CompanyNews,
    MacroEvent,
    SectorRotation,
    UnexpectedEvent,
}

impl CauseSubcategory {
    /// The subcategory sets are closed per category.
    pub fn belongs_to(&self, category: CauseCategory) -> bool {
        use CauseSubcategory::*;
        let internal = matches!(
            self,
            JudgmentError | EmotionalTrading | TimingMistake | RiskManagement
                | InsufficientResearch
        );
        match category {
            CauseCategory::Internal => internal,
            CauseCategory::External => !internal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactLevel {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineRelevance {
    BeforeBuy,
    DuringHold,
    AtSell,
    Throughout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceSource {
    Technical,
    News,
    UserInput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceKind {
    Price,
    Indicator,
    News,
    Sentiment,
    UserDecision,
}

/// One piece of evidence tying a cause back to a concrete upstream output
/// or the user's stated reasoning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub source: EvidenceSource,
    pub kind: EvidenceKind,
    pub data_point: String,
    pub interpretation: String,
}

impl Evidence {
    pub fn validate(&self) -> Result<(), String> {
        require("evidence.data_point", &self.data_point)?;
        require("evidence.interpretation", &self.interpretation)
    }
}

/// One attributed contributor to the trade outcome. A cause with no
/// evidence is not representable as valid: the generator asserting
/// something without a traceable source fails validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootCause {
    pub id: String,
    pub category: CauseCategory,
    pub subcategory: CauseSubcategory,
    pub title: String,
    pub description: String,
    pub impact_score: f64,
    pub impact_level: ImpactLevel,
    pub evidence: Vec<Evidence>,
    pub timeline_relevance: TimelineRelevance,
}

impl RootCause {
    pub fn validate(&self) -> Result<(), String> {
        require("root_cause.id", &self.id)?;
        require("root_cause.title", &self.title)?;
        require("root_cause.description", &self.description)?;
        in_range("root_cause.impact_score", self.impact_score, 1.0, 10.0)?;
        if !self.subcategory.belongs_to(self.category) {
            return Err(format!(
                "subcategory {:?} does not belong to category {:?}",
                self.subcategory, self.category
            ));
        }
        non_empty_list("root_cause.evidence", &self.evidence)?;
        for evidence in &self.evidence {
            evidence.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CauseBreakdown {
    pub internal_ratio: f64,
    pub external_ratio: f64,
}

impl CauseBreakdown {
    pub fn validate(&self) -> Result<(), String> {
        let sum = self.internal_ratio + self.external_ratio;
        if (sum - 100.0).abs() > RATIO_TOLERANCE {
            return Err(format!(
                "cause_breakdown ratios sum to {} (must be 100 ± {})",
                sum, RATIO_TOLERANCE
            ));
        }
        Ok(())
    }

    /// Recompute the breakdown from impact scores. Deterministic; used by
    /// the attributor's repair pass so the emitted pair always sums to 100.
    pub fn from_causes(causes: &[RootCause]) -> Self {
        let internal: f64 = causes
            .iter()
            .filter(|c| c.category == CauseCategory::Internal)
            .map(|c| c.impact_score)
            .sum();
        let external: f64 = causes
            .iter()
            .filter(|c| c.category == CauseCategory::External)
            .map(|c| c.impact_score)
            .sum();
        let total = internal + external;
        if total <= 0.0 {
            return Self {
                internal_ratio: 50.0,
                external_ratio: 50.0,
            };
        }
        let internal_ratio = (internal / total * 1000.0).round() / 10.0;
        Self {
            internal_ratio,
            external_ratio: ((100.0 - internal_ratio) * 10.0).round() / 10.0,
        }
    }
}

/// Market context block kept alongside the cause analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketContext {
    pub market_situation: String,
    pub news_at_loss_time: Vec<String>,
    pub related_news: Vec<String>,
}

/// Objective signals digest for the pattern analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveSignals {
    pub price_trend: Trend,
    pub volatility_level: String,
    pub technical_indicators: Vec<IndicatorReading>,
    pub news_facts: Vec<String>,
}

/// The attributor's second output: a minimized digest the pattern
/// analyzer consumes, so its prompt stays small and decoupled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternInput {
    pub investment_reason: String,
    pub loss_cause_summary: String,
    pub loss_cause_details: Vec<String>,
    pub objective_signals: ObjectiveSignals,
    pub uncertainty: Uncertainty,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossAttribution {
    pub loss_check: String,
    pub loss_amount_pct: String,
    pub one_line_summary: String,
    pub root_causes: Vec<RootCause>,
    pub cause_breakdown: CauseBreakdown,
    pub detailed_explanation: String,
    pub confidence: Uncertainty,
    pub market_context: MarketContext,
    pub pattern_input: PatternInput,
}

impl LossAttribution {
    pub fn validate(&self) -> Result<(), String> {
        require("loss_check", &self.loss_check)?;
        require("one_line_summary", &self.one_line_summary)?;
        require("detailed_explanation", &self.detailed_explanation)?;
        non_empty_list("root_causes", &self.root_causes)?;
        for cause in &self.root_causes {
            cause.validate()?;
        }
        self.cause_breakdown.validate()?;
        require(
            "pattern_input.loss_cause_summary",
            &self.pattern_input.loss_cause_summary,
        )
    }

    /// Drop later causes that describe the same underlying event, keyed by
    /// (category, case-folded title).
    pub fn dedup_causes(&mut self) {
        let mut seen: Vec<(CauseCategory, String)> = Vec::new();
        self.root_causes.retain(|cause| {
            let key = (cause.category, cause.title.trim().to_lowercase());
            if seen.contains(&key) {
                false
            } else {
                seen.push(key);
                true
            }
        });
    }

    pub fn has_category(&self, category: CauseCategory) -> bool {
        self.root_causes.iter().any(|c| c.category == category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cause(id: &str, category: CauseCategory, title: &str, score: f64) -> RootCause {
        let (subcategory, source, kind) = match category {
            CauseCategory::Internal => (
                CauseSubcategory::JudgmentError,
                EvidenceSource::UserInput,
                EvidenceKind::UserDecision,
            ),
            CauseCategory::External => (
                CauseSubcategory::CompanyNews,
                EvidenceSource::News,
                EvidenceKind::News,
            ),
        };
        RootCause {
            id: id.to_string(),
            category,
            subcategory,
            title: title.to_string(),
            description: format!("{} drove part of the loss", title),
            impact_score: score,
            impact_level: ImpactLevel::Medium,
            evidence: vec![Evidence {
                source,
                kind,
                data_point: "guidance cut 2024-04-12".to_string(),
                interpretation: "negative surprise during the hold".to_string(),
            }],
            timeline_relevance: TimelineRelevance::DuringHold,
        }
    }

    fn sample() -> LossAttribution {
        let causes = vec![
            cause("RC001", CauseCategory::Internal, "Unverified optimism", 6.0),
            cause("RC002", CauseCategory::External, "Weak guidance", 4.0),
        ];
        let breakdown = CauseBreakdown::from_causes(&causes);
        LossAttribution {
            loss_check: "confirmed loss".to_string(),
            loss_amount_pct: "-9.8%".to_string(),
            one_line_summary: "Earnings optimism met a guidance cut".to_string(),
            root_causes: causes,
            cause_breakdown: breakdown,
            detailed_explanation: "The entry relied on an unverified earnings thesis".to_string(),
            confidence: Uncertainty::Medium,
            market_context: MarketContext {
                market_situation: "risk-off after the print".to_string(),
                news_at_loss_time: vec!["guidance below consensus".to_string()],
                related_news: vec![],
            },
            pattern_input: PatternInput {
                investment_reason: "earnings optimism".to_string(),
                loss_cause_summary: "thesis not cross-checked".to_string(),
                loss_cause_details: vec!["no second source".to_string()],
                objective_signals: ObjectiveSignals {
                    price_trend: Trend::Down,
                    volatility_level: "elevated".to_string(),
                    technical_indicators: vec![],
                    news_facts: vec!["guidance cut".to_string()],
                },
                uncertainty: Uncertainty::Medium,
            },
        }
    }

    #[test]
    fn test_valid_attribution_passes() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_ratio_inside_tolerance_passes() {
        let mut attribution = sample();
        attribution.cause_breakdown = CauseBreakdown {
            internal_ratio: 58.0,
            external_ratio: 44.0, // sums to 102, inside the band
        };
        assert!(attribution.validate().is_ok());
    }

    #[test]
    fn test_ratio_sum_105_fails() {
        let breakdown = CauseBreakdown {
            internal_ratio: 60.0,
            external_ratio: 45.0,
        };
        assert!(breakdown.validate().is_err());
    }

    #[test]
    fn test_ratio_sum_70_fails() {
        let breakdown = CauseBreakdown {
            internal_ratio: 40.0,
            external_ratio: 30.0,
        };
        assert!(breakdown.validate().is_err());
    }

    #[test]
    fn test_unevidenced_cause_is_invalid() {
        let mut attribution = sample();
        attribution.root_causes[0].evidence.clear();
        assert!(attribution.validate().is_err());
    }

    #[test]
    fn test_mismatched_subcategory_fails() {
        let mut attribution = sample();
        attribution.root_causes[0].subcategory = CauseSubcategory::MacroEvent;
        assert!(attribution.validate().is_err());
    }

    #[test]
    fn test_impact_score_range() {
        let mut attribution = sample();
        attribution.root_causes[0].impact_score = 11.0;
        assert!(attribution.validate().is_err());
        attribution.root_causes[0].impact_score = 0.5;
        assert!(attribution.validate().is_err());
        attribution.root_causes[0].impact_score = 7.5; // floats accepted
        let recomputed = CauseBreakdown::from_causes(&attribution.root_causes);
        attribution.cause_breakdown = recomputed;
        assert!(attribution.validate().is_ok());
    }

    #[test]
    fn test_breakdown_recompute_sums_to_100() {
        let causes = vec![
            cause("RC001", CauseCategory::Internal, "a", 7.0),
            cause("RC002", CauseCategory::External, "b", 2.0),
            cause("RC003", CauseCategory::External, "c", 1.0),
        ];
        let breakdown = CauseBreakdown::from_causes(&causes);
        assert!((breakdown.internal_ratio + breakdown.external_ratio - 100.0).abs() < 1e-9);
        assert!((breakdown.internal_ratio - 70.0).abs() < 0.2);
    }

    #[test]
    fn test_dedup_same_event() {
        let mut attribution = sample();
        attribution
            .root_causes
            .push(cause("RC003", CauseCategory::External, " weak guidance ", 3.0));
        attribution.dedup_causes();
        assert_eq!(attribution.root_causes.len(), 2);
    }
}
