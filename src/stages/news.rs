//! News analyst stage
//!
//! Headlines come from the search client, bounded to the holding window.
//! The generator summarizes them and fact-checks the user's stated basis.
//! Zero headlines after the broadened query short-circuits to the
//! deterministic no-data context without invoking the generator.

use chrono::NaiveDate;
use serde_json::json;

use crate::data::resolve_ticker;
use crate::llm::TextGenerator;
use crate::schema::{
    FactCheck, Headline, MarketSentiment, NewsAnalysis, ReviewPeriod, StageOutput, TradeInput,
    Uncertainty,
};
use crate::search::{NewsItem, NewsSearchClient};

use super::run_guarded;

const SYSTEM_PROMPT: &str = "You are a market news analyst for a trade review. \
Given retrieved headlines from the holding period, summarize the coverage, \
assess market sentiment, and fact-check the investor's stated belief against \
the headlines. State facts only; no investment advice or forecasts. \
Respond with a single JSON object with keys: ticker, period {buy_date, \
sell_date}, summary, market_sentiment {label, description}, key_headlines \
[{title, source, date, snippet, link}], fact_check {user_belief, actual_fact, \
verdict}, uncertainty (low|medium|high).";

pub async fn run(
    generator: &dyn TextGenerator,
    search: &NewsSearchClient,
    input: &TradeInput,
) -> StageOutput<NewsAnalysis> {
    let ticker = resolve_ticker(&input.stock);

    let items = match parse_window(&input.buy_date, &input.sell_date) {
        Some((buy, sell)) => search.search_window(&ticker, buy, sell).await,
        None => Vec::new(),
    };

    if items.is_empty() {
        let reason = "no headlines found in the review window".to_string();
        return StageOutput::fallback(no_data_context(&ticker, input, &reason), reason);
    }

    let payload = json!({
        "ticker": ticker,
        "period": { "buy_date": input.buy_date, "sell_date": input.sell_date },
        "user_belief": input.decision_basis,
        "headlines": items,
    });

    run_guarded(
        "news",
        generator,
        SYSTEM_PROMPT,
        &payload,
        |analysis| pin_retrieved_headlines(analysis, &ticker, input, &items),
        NewsAnalysis::validate,
        |reason| fallback_with_headlines(&ticker, input, &items, reason),
    )
    .await
}

fn parse_window(buy_date: &str, sell_date: &str) -> Option<(NaiveDate, NaiveDate)> {
    let buy: NaiveDate = buy_date.parse().ok()?;
    let sell: NaiveDate = sell_date.parse().ok()?;
    (sell >= buy).then_some((buy, sell))
}

fn period(input: &TradeInput) -> ReviewPeriod {
    ReviewPeriod {
        buy_date: input.buy_date.clone(),
        sell_date: input.sell_date.clone(),
    }
}

fn headlines_from(items: &[NewsItem]) -> Vec<Headline> {
    items
        .iter()
        .map(|item| Headline {
            title: item.title.clone(),
            source: if item.source.is_empty() {
                "unknown".to_string()
            } else {
                item.source.clone()
            },
            date: if item.date.is_empty() {
                "unknown".to_string()
            } else {
                item.date.clone()
            },
            snippet: item.snippet.clone(),
            link: item.link.clone(),
        })
        .collect()
}

/// The generator interprets headlines but does not get to invent them:
/// identity fields and the headline list are pinned to retrieval.
fn pin_retrieved_headlines(
    mut analysis: NewsAnalysis,
    ticker: &str,
    input: &TradeInput,
    items: &[NewsItem],
) -> NewsAnalysis {
    analysis.ticker = ticker.to_string();
    analysis.period = period(input);
    analysis.key_headlines = headlines_from(items);
    analysis
}

fn fallback_with_headlines(
    ticker: &str,
    input: &TradeInput,
    items: &[NewsItem],
    reason: &str,
) -> NewsAnalysis {
    NewsAnalysis {
        ticker: ticker.to_string(),
        period: period(input),
        summary: format!(
            "{} headlines were retrieved for the review window, but the summary \
             could not be generated ({}).",
            items.len(),
            reason
        ),
        market_sentiment: MarketSentiment {
            label: "unknown".to_string(),
            description: "sentiment could not be assessed".to_string(),
        },
        key_headlines: headlines_from(items),
        fact_check: FactCheck {
            user_belief: input.decision_basis.clone(),
            actual_fact: "headline analysis unavailable".to_string(),
            verdict: "unknown".to_string(),
        },
        uncertainty: Uncertainty::High,
    }
}

fn no_data_context(ticker: &str, input: &TradeInput, reason: &str) -> NewsAnalysis {
    NewsAnalysis {
        ticker: ticker.to_string(),
        period: period(input),
        summary: format!("No relevant news was found for the review window ({}).", reason),
        market_sentiment: MarketSentiment {
            label: "neutral".to_string(),
            description: "no data to assess market sentiment".to_string(),
        },
        key_headlines: Vec::new(),
        fact_check: FactCheck {
            user_belief: input.decision_basis.clone(),
            actual_fact: "no news items retrieved".to_string(),
            verdict: "unknown".to_string(),
        },
        uncertainty: Uncertainty::High,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{PositionStatus, TradePeriod};

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

    fn items() -> Vec<NewsItem> {
        vec![NewsItem {
            title: "Apple guides below consensus".to_string(),
            source: "Reuters".to_string(),
            date: "2024-04-12".to_string(),
            snippet: "outlook lowered".to_string(),
            link: "https://example.com/a".to_string(),
        }]
    }

    #[test]
    fn test_no_data_context_validates() {
        let context = no_data_context("AAPL", &input(), "nothing found");
        assert!(context.validate().is_ok());
        assert!(context.key_headlines.is_empty());
    }

    #[test]
    fn test_fallback_with_headlines_validates() {
        let fallback = fallback_with_headlines("AAPL", &input(), &items(), "timeout");
        assert!(fallback.validate().is_ok());
        assert_eq!(fallback.key_headlines.len(), 1);
    }

    #[test]
    fn test_repair_pins_headlines_to_retrieval() {
        let analysis = NewsAnalysis {
            ticker: "WRONG".to_string(),
            period: ReviewPeriod {
                buy_date: "1999-01-01".to_string(),
                sell_date: "1999-02-01".to_string(),
            },
            summary: "fine".to_string(),
            market_sentiment: MarketSentiment {
                label: "bearish".to_string(),
                description: "negative".to_string(),
            },
            key_headlines: vec![Headline {
                title: "invented headline".to_string(),
                source: "nowhere".to_string(),
                date: "2031-01-01".to_string(),
                snippet: String::new(),
                link: String::new(),
            }],
            fact_check: FactCheck {
                user_belief: "x".to_string(),
                actual_fact: "y".to_string(),
                verdict: "correct".to_string(),
            },
            uncertainty: Uncertainty::Low,
        };
        let pinned = pin_retrieved_headlines(analysis, "AAPL", &input(), &items());
        assert_eq!(pinned.ticker, "AAPL");
        assert_eq!(pinned.period.buy_date, "2024-03-12");
        assert_eq!(pinned.key_headlines[0].title, "Apple guides below consensus");
    }
}
