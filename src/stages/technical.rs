//! Technical analyst stage
//!
//! The numeric work is done locally before generation: price move, trend,
//! SMA/RSI/volatility all come from fetched bars. The generator only writes
//! the narrative around them, and its numbers are overwritten by the
//! computed ones so the two can never disagree.

use chrono::NaiveDate;
use serde_json::json;
use tracing::warn;

use crate::data::indicators::{interpret_rsi, interpret_volatility};
use crate::data::{resolve_ticker, MarketDataClient, MarketSummary};
use crate::llm::TextGenerator;
use crate::schema::{
    IndicatorReading, PriceMove, StageOutput, TechnicalAnalysis, TradeInput, Trend, Uncertainty,
};

use super::run_guarded;

const SYSTEM_PROMPT: &str = "You are a technical analysis summarizer for a trade review. \
Describe the price action and indicator context factually, in neutral language, \
with no buy/sell recommendations, no target prices, and no forecasts. \
Respond with a single JSON object with keys: summary, price_move {start_price, \
end_price, pct_change}, trend (up|down|sideways), indicators [{name, value, \
interpretation}], risk_notes, uncertainty (low|medium|high).";

pub async fn run(
    generator: &dyn TextGenerator,
    market: &MarketDataClient,
    input: &TradeInput,
) -> StageOutput<TechnicalAnalysis> {
    let ticker = resolve_ticker(&input.stock);

    let window = parse_window(&input.buy_date, &input.sell_date);
    let summary = match window {
        Some((buy, sell)) => match market.fetch_daily(&ticker, buy, sell).await {
            Ok(bars) => MarketSummary::from_bars(&ticker, &bars, buy, sell).ok(),
            Err(e) => {
                warn!("Market data fetch failed for {}: {}", ticker, e);
                None
            }
        },
        None => {
            warn!(
                "Unparseable review dates: {} / {}",
                input.buy_date, input.sell_date
            );
            None
        }
    };

    let Some(summary) = summary else {
        let reason = "price data unavailable".to_string();
        return StageOutput::fallback(fallback_without_data(&ticker, &reason), reason);
    };

    let indicators = computed_indicators(&summary);
    let payload = json!({
        "ticker": summary.ticker,
        "period": { "buy_date": input.buy_date, "sell_date": input.sell_date },
        "price_move": computed_price_move(&summary),
        "trend": summary.trend,
        "indicators": indicators,
        "volatility_pct": summary.volatility_pct,
        "trading_days": summary.bar_count,
    });

    run_guarded(
        "technical",
        generator,
        SYSTEM_PROMPT,
        &payload,
        |analysis| pin_computed_figures(analysis, &summary),
        TechnicalAnalysis::validate,
        |reason| fallback_with_summary(&summary, reason),
    )
    .await
}

fn parse_window(buy_date: &str, sell_date: &str) -> Option<(NaiveDate, NaiveDate)> {
    let buy: NaiveDate = buy_date.parse().ok()?;
    let sell: NaiveDate = sell_date.parse().ok()?;
    if sell < buy {
        return None;
    }
    Some((buy, sell))
}

fn computed_price_move(summary: &MarketSummary) -> PriceMove {
    PriceMove {
        start_price: format!("{:.2}", summary.start_price),
        end_price: format!("{:.2}", summary.end_price),
        pct_change: format!("{:+.2}%", summary.pct_change),
    }
}

fn computed_indicators(summary: &MarketSummary) -> Vec<IndicatorReading> {
    let mut indicators = Vec::new();
    if let Some(sma) = summary.sma_20 {
        let side = if summary.end_price > sma { "above" } else { "below" };
        indicators.push(IndicatorReading {
            name: "SMA(20)".to_string(),
            value: format!("{:.2}", sma),
            interpretation: format!("price closed {} the 20-day average", side),
        });
    }
    if let Some(rsi) = summary.rsi_14 {
        indicators.push(IndicatorReading {
            name: "RSI(14)".to_string(),
            value: format!("{:.1}", rsi),
            interpretation: interpret_rsi(rsi).to_string(),
        });
    }
    if let Some(vol) = summary.volatility_pct {
        indicators.push(IndicatorReading {
            name: "volatility".to_string(),
            value: format!("{:.2}%", vol),
            interpretation: format!("daily swings were {}", interpret_volatility(vol)),
        });
    }
    indicators
}

/// Overwrite the generator's numbers with the locally computed ones.
fn pin_computed_figures(
    mut analysis: TechnicalAnalysis,
    summary: &MarketSummary,
) -> TechnicalAnalysis {
    analysis.price_move = computed_price_move(summary);
    analysis.trend = summary.trend;
    if analysis.indicators.is_empty() {
        analysis.indicators = computed_indicators(summary);
    }
    analysis
}

fn fallback_with_summary(summary: &MarketSummary, reason: &str) -> TechnicalAnalysis {
    TechnicalAnalysis {
        summary: format!(
            "{} moved {:+.2}% over the review window. Narrative analysis unavailable ({}).",
            summary.ticker, summary.pct_change, reason
        ),
        price_move: computed_price_move(summary),
        trend: summary.trend,
        indicators: computed_indicators(summary),
        risk_notes: vec!["generated commentary unavailable".to_string()],
        uncertainty: Uncertainty::Medium,
    }
}

fn fallback_without_data(ticker: &str, reason: &str) -> TechnicalAnalysis {
    TechnicalAnalysis {
        summary: format!("Insufficient price data for {} ({}).", ticker, reason),
        price_move: PriceMove {
            start_price: "unknown".to_string(),
            end_price: "unknown".to_string(),
            pct_change: "unknown".to_string(),
        },
        trend: Trend::Sideways,
        indicators: Vec::new(),
        risk_notes: vec!["price data source unavailable".to_string()],
        uncertainty: Uncertainty::High,
    }
}
