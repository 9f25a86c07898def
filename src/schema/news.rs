//! News analyst stage output

use serde::{Deserialize, Serialize};

use super::{require, Uncertainty};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewPeriod {
    pub buy_date: String,
    pub sell_date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSentiment {
    pub label: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Headline {
    pub title: String,
    pub source: String,
    pub date: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub link: String,
}

impl Headline {
    pub fn validate(&self) -> Result<(), String> {
        require("headline.title", &self.title)?;
        require("headline.source", &self.source)?;
        require("headline.date", &self.date)
    }
}

/// Fact check of the user's stated decision basis against retrieved news.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactCheck {
    pub user_belief: String,
    pub actual_fact: String,
    pub verdict: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsAnalysis {
    pub ticker: String,
    pub period: ReviewPeriod,
    pub summary: String,
    pub market_sentiment: MarketSentiment,
    pub key_headlines: Vec<Headline>,
    pub fact_check: FactCheck,
    pub uncertainty: Uncertainty,
}

impl NewsAnalysis {
    pub fn validate(&self) -> Result<(), String> {
        require("ticker", &self.ticker)?;
        require("period.buy_date", &self.period.buy_date)?;
        require("summary", &self.summary)?;
        require("market_sentiment.label", &self.market_sentiment.label)?;
        require(
            "market_sentiment.description",
            &self.market_sentiment.description,
        )?;
        for headline in &self.key_headlines {
            headline.validate()?;
        }
        require("fact_check.user_belief", &self.fact_check.user_belief)?;
        require("fact_check.actual_fact", &self.fact_check.actual_fact)?;
        require("fact_check.verdict", &self.fact_check.verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> NewsAnalysis {
        NewsAnalysis {
            ticker: "AAPL".to_string(),
            period: ReviewPeriod {
                buy_date: "2024-03-12".to_string(),
                sell_date: "2024-04-18".to_string(),
            },
            summary: "Guidance cut dominated coverage during the holding window".to_string(),
            market_sentiment: MarketSentiment {
                label: "bearish".to_string(),
                description: "Sell-side tone turned negative after the call".to_string(),
            },
            key_headlines: vec![Headline {
                title: "Apple guides below consensus".to_string(),
                source: "Reuters".to_string(),
                date: "2024-04-12".to_string(),
                snippet: "Company lowered full-year outlook".to_string(),
                link: "https://example.com/a".to_string(),
            }],
            fact_check: FactCheck {
                user_belief: "earnings would beat".to_string(),
                actual_fact: "earnings met, guidance missed".to_string(),
                verdict: "partially_incorrect".to_string(),
            },
            uncertainty: Uncertainty::Low,
        }
    }

    #[test]
    fn test_valid_analysis_passes() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_headline_missing_date_fails() {
        let mut analysis = sample();
        analysis.key_headlines[0].date = String::new();
        assert!(analysis.validate().is_err());
    }

    #[test]
    fn test_empty_headline_list_is_allowed() {
        // The "no data" terminal output carries zero headlines by design.
        let mut analysis = sample();
        analysis.key_headlines.clear();
        assert!(analysis.validate().is_ok());
    }
}
