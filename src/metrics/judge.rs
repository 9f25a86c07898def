//! LLM-as-judge scoring for the trust-tier metrics
//!
//! The judge rides the same `TextGenerator` seam as the stages. Scores are
//! parsed out of the judge's JSON reply; a malformed reply is an error the
//! evaluator turns into an omitted metric.

use anyhow::{anyhow, Result};
use serde_json::json;

use crate::llm::TextGenerator;
use crate::parse::extract_json;
use crate::schema::NewsAnalysis;

const SIGNAL_PROMPT: &str = "You are a financial news relevance judge. For \
each headline, decide whether it is a tradeable signal for the given ticker \
(company earnings, guidance, products, sector-moving macro) or noise \
(listicles, unrelated tickers, generic market color). Respond with a single \
JSON object: {\"signal\": [true|false, ...]} with one entry per headline, in \
order.";

const CONSISTENCY_PROMPT: &str = "You are a fact-consistency judge. Given a \
fact check verdict and the headlines it was drawn from, score how well the \
verdict is supported by the headlines, from 0 (contradicted or unsupported) \
to 100 (fully supported). Respond with a single JSON object: \
{\"score\": <number>}.";

pub struct LlmJudge<'a> {
    generator: &'a dyn TextGenerator,
}

impl<'a> LlmJudge<'a> {
    pub fn new(generator: &'a dyn TextGenerator) -> Self {
        Self { generator }
    }

    /// Percentage of headlines the judge rates as signal, in [0, 100].
    pub async fn signal_to_noise(&self, news: &NewsAnalysis) -> Result<f64> {
        let headlines: Vec<&str> = news
            .key_headlines
            .iter()
            .map(|headline| headline.title.as_str())
            .collect();
        if headlines.is_empty() {
            return Err(anyhow!("no headlines to judge"));
        }

        let payload = json!({
            "ticker": news.ticker,
            "headlines": headlines,
        });
        let response = self
            .generator
            .invoke(SIGNAL_PROMPT, &payload.to_string())
            .await?;

        let object = extract_json(&response.content)
            .ok_or_else(|| anyhow!("judge reply carried no JSON object"))?;
        let verdicts = object
            .get("signal")
            .and_then(|value| value.as_array())
            .ok_or_else(|| anyhow!("judge reply missing 'signal' array"))?;
        if verdicts.len() != headlines.len() {
            return Err(anyhow!(
                "judge returned {} verdicts for {} headlines",
                verdicts.len(),
                headlines.len()
            ));
        }

        let signal = verdicts
            .iter()
            .filter(|value| value.as_bool() == Some(true))
            .count();
        Ok(signal as f64 / verdicts.len() as f64 * 100.0)
    }

    /// Judge-scored support for the fact check verdict, in [0, 100].
    pub async fn fact_consistency(&self, news: &NewsAnalysis) -> Result<f64> {
        let headlines: Vec<&str> = news
            .key_headlines
            .iter()
            .map(|headline| headline.title.as_str())
            .collect();

        let payload = json!({
            "user_belief": news.fact_check.user_belief,
            "actual_fact": news.fact_check.actual_fact,
            "verdict": news.fact_check.verdict,
            "headlines": headlines,
        });
        let response = self
            .generator
            .invoke(CONSISTENCY_PROMPT, &payload.to_string())
            .await?;

        let object = extract_json(&response.content)
            .ok_or_else(|| anyhow!("judge reply carried no JSON object"))?;
        let score = object
            .get("score")
            .and_then(|value| value.as_f64())
            .ok_or_else(|| anyhow!("judge reply missing numeric 'score'"))?;
        Ok(score.clamp(0.0, 100.0))
    }
}
