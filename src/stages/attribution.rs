//! Loss attributor stage (fan-in)
//!
//! Reads the technical and news outputs and produces the evidence-backed
//! root-cause analysis plus the digest the pattern analyzer consumes. The
//! repair pass is deterministic: duplicate causes collapse, the
//! internal/external ratio is recomputed from impact scores, and a missing
//! category is synthesized when upstream evidence for it exists.

use serde_json::json;

use crate::llm::TextGenerator;
use crate::schema::{
    CauseBreakdown, CauseCategory, CauseSubcategory, Evidence, EvidenceKind, EvidenceSource,
    ImpactLevel, LossAttribution, MarketContext, NewsAnalysis, ObjectiveSignals, PatternInput,
    RootCause, StageOutput, TechnicalAnalysis, TimelineRelevance, TradeInput, Uncertainty,
};

use super::run_guarded;

const SYSTEM_PROMPT: &str = "You are a trade loss attribution analyst. Given the \
investor's stated reasoning, the technical analysis, and the news analysis for \
one closed trade, identify the root causes of the outcome. Causes are internal \
(the investor's process) or external (the market). Every cause must cite \
evidence from the provided data; never assert a cause without a traceable \
source. No investment advice, no forecasts. \
Respond with a single JSON object with keys: loss_check, loss_amount_pct, \
one_line_summary, root_causes [{id, category, subcategory, title, description, \
impact_score (1-10), impact_level, evidence [{source, kind, data_point, \
interpretation}], timeline_relevance}], cause_breakdown {internal_ratio, \
external_ratio}, detailed_explanation, confidence, market_context \
{market_situation, news_at_loss_time, related_news}, pattern_input \
{investment_reason, loss_cause_summary, loss_cause_details, objective_signals \
{price_trend, volatility_level, technical_indicators, news_facts}, uncertainty}.";

pub async fn run(
    generator: &dyn TextGenerator,
    input: &TradeInput,
    technical: &TechnicalAnalysis,
    news: &NewsAnalysis,
) -> StageOutput<LossAttribution> {
    let payload = json!({
        "trade": {
            "stock": input.stock,
            "buy_date": input.buy_date,
            "sell_date": input.sell_date,
            "decision_basis": input.decision_basis,
            "user_message": input.user_message,
        },
        "technical_analysis": technical,
        "news_analysis": news,
    });

    run_guarded(
        "attribution",
        generator,
        SYSTEM_PROMPT,
        &payload,
        |attribution| repair(attribution, input, news),
        LossAttribution::validate,
        |reason| fallback(input, technical, news, reason),
    )
    .await
}

fn repair(
    mut attribution: LossAttribution,
    input: &TradeInput,
    news: &NewsAnalysis,
) -> LossAttribution {
    attribution.dedup_causes();

    if !attribution.has_category(CauseCategory::Internal) {
        let id = format!("RC{:03}", attribution.root_causes.len() + 1);
        attribution.root_causes.push(internal_cause_from_input(id, input));
    }
    if !attribution.has_category(CauseCategory::External) && !news.key_headlines.is_empty() {
        let id = format!("RC{:03}", attribution.root_causes.len() + 1);
        attribution.root_causes.push(external_cause_from_news(id, news));
    }

    attribution.cause_breakdown = CauseBreakdown::from_causes(&attribution.root_causes);
    attribution
}

fn internal_cause_from_input(id: String, input: &TradeInput) -> RootCause {
    RootCause {
        id,
        category: CauseCategory::Internal,
        subcategory: CauseSubcategory::JudgmentError,
        title: "Stated basis not borne out".to_string(),
        description: format!(
            "The entry rested on \"{}\", which the trade outcome did not confirm.",
            input.decision_basis
        ),
        impact_score: 5.0,
        impact_level: ImpactLevel::Medium,
        evidence: vec![Evidence {
            source: EvidenceSource::UserInput,
            kind: EvidenceKind::UserDecision,
            data_point: input.decision_basis.clone(),
            interpretation: "the investor's own entry reasoning".to_string(),
        }],
        timeline_relevance: TimelineRelevance::BeforeBuy,
    }
}

fn external_cause_from_news(id: String, news: &NewsAnalysis) -> RootCause {
    let headline = &news.key_headlines[0];
    RootCause {
        id,
        category: CauseCategory::External,
        subcategory: CauseSubcategory::CompanyNews,
        title: "Adverse coverage during the hold".to_string(),
        description: format!("Reported during the window: {}", headline.title),
        impact_score: 4.0,
        impact_level: ImpactLevel::Medium,
        evidence: vec![Evidence {
            source: EvidenceSource::News,
            kind: EvidenceKind::News,
            data_point: headline.title.clone(),
            interpretation: "headline retrieved from the review window".to_string(),
        }],
        timeline_relevance: TimelineRelevance::DuringHold,
    }
}

fn fallback(
    input: &TradeInput,
    technical: &TechnicalAnalysis,
    news: &NewsAnalysis,
    reason: &str,
) -> LossAttribution {
    let mut causes = vec![internal_cause_from_input("RC001".to_string(), input)];
    if !news.key_headlines.is_empty() {
        causes.push(external_cause_from_news("RC002".to_string(), news));
    }
    let breakdown = CauseBreakdown::from_causes(&causes);

    let loss_cause_details: Vec<String> =
        causes.iter().map(|cause| cause.title.clone()).collect();
    let news_facts: Vec<String> = news
        .key_headlines
        .iter()
        .map(|headline| headline.title.clone())
        .collect();

    LossAttribution {
        loss_check: "unconfirmed".to_string(),
        loss_amount_pct: technical.price_move.pct_change.clone(),
        one_line_summary: format!(
            "Cause analysis could not be generated ({}); only directly evidenced \
             contributors are listed.",
            reason
        ),
        root_causes: causes,
        cause_breakdown: breakdown,
        detailed_explanation: "The attribution narrative is unavailable. The listed \
            causes are derived mechanically from the investor's stated basis and \
            retrieved headlines."
            .to_string(),
        confidence: Uncertainty::High,
        market_context: MarketContext {
            market_situation: news.summary.clone(),
            news_at_loss_time: news_facts.clone(),
            related_news: Vec::new(),
        },
        pattern_input: PatternInput {
            investment_reason: input.decision_basis.clone(),
            loss_cause_summary: "attribution unavailable; see listed causes".to_string(),
            loss_cause_details,
            objective_signals: ObjectiveSignals {
                price_trend: technical.trend,
                volatility_level: "unknown".to_string(),
                technical_indicators: technical.indicators.clone(),
                news_facts,
            },
            uncertainty: Uncertainty::High,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{
        FactCheck, Headline, MarketSentiment, PositionStatus, PriceMove, ReviewPeriod,
        TradePeriod, Trend,
    };

    fn input() -> TradeInput {
        TradeInput {
            stock: "AAPL".to_string(),
            buy_date: "2024-03-12".to_string(),
            sell_date: "2024-04-18".to_string(),
            decision_basis: "earnings would beat".to_string(),
            user_message: "earnings would beat".to_string(),
            trade_period: TradePeriod {
                buy_date: "2024-03-12".to_string(),
                sell_date: "2024-04-18".to_string(),
                position_status: PositionStatus::Sold,
            },
        }
    }

    fn technical() -> TechnicalAnalysis {
        TechnicalAnalysis {
            summary: "broke down after earnings".to_string(),
            price_move: PriceMove {
                start_price: "172.40".to_string(),
                end_price: "165.10".to_string(),
                pct_change: "-4.23%".to_string(),
            },
            trend: Trend::Down,
            indicators: vec![],
            risk_notes: vec![],
            uncertainty: Uncertainty::Low,
        }
    }

    fn news(with_headline: bool) -> NewsAnalysis {
        NewsAnalysis {
            ticker: "AAPL".to_string(),
            period: ReviewPeriod {
                buy_date: "2024-03-12".to_string(),
                sell_date: "2024-04-18".to_string(),
            },
            summary: "guidance cut dominated coverage".to_string(),
            market_sentiment: MarketSentiment {
                label: "bearish".to_string(),
                description: "negative after the call".to_string(),
            },
            key_headlines: if with_headline {
                vec![Headline {
                    title: "Apple guides below consensus".to_string(),
                    source: "Reuters".to_string(),
                    date: "2024-04-12".to_string(),
                    snippet: String::new(),
                    link: String::new(),
                }]
            } else {
                vec![]
            },
            fact_check: FactCheck {
                user_belief: "earnings would beat".to_string(),
                actual_fact: "guidance missed".to_string(),
                verdict: "incorrect".to_string(),
            },
            uncertainty: Uncertainty::Low,
        }
    }

    #[test]
    fn test_fallback_validates_and_covers_both_categories() {
        let out = fallback(&input(), &technical(), &news(true), "outage");
        assert!(out.validate().is_ok());
        assert!(out.has_category(CauseCategory::Internal));
        assert!(out.has_category(CauseCategory::External));
    }

    #[test]
    fn test_fallback_without_headlines_stays_internal_only() {
        let out = fallback(&input(), &technical(), &news(false), "outage");
        assert!(out.validate().is_ok());
        assert!(!out.has_category(CauseCategory::External));
    }

    #[test]
    fn test_repair_synthesizes_missing_internal_cause() {
        let mut generated = fallback(&input(), &technical(), &news(true), "seed");
        generated
            .root_causes
            .retain(|cause| cause.category == CauseCategory::External);
        let repaired = repair(generated, &input(), &news(true));
        assert!(repaired.has_category(CauseCategory::Internal));
        assert!(repaired.validate().is_ok());
    }

    #[test]
    fn test_repair_recomputes_drifted_ratio() {
        let mut generated = fallback(&input(), &technical(), &news(true), "seed");
        generated.cause_breakdown = CauseBreakdown {
            internal_ratio: 80.0,
            external_ratio: 40.0,
        };
        let repaired = repair(generated, &input(), &news(true));
        assert!(repaired.cause_breakdown.validate().is_ok());
    }

    #[test]
    fn test_repair_drops_duplicate_causes() {
        let mut generated = fallback(&input(), &technical(), &news(true), "seed");
        let duplicate = generated.root_causes[0].clone();
        generated.root_causes.push(duplicate);
        let repaired = repair(generated, &input(), &news(true));
        assert_eq!(repaired.root_causes.len(), 2);
    }
}
