//! News search client against a Serper-style search endpoint
//!
//! Search failures never propagate past this module: an API error, a
//! missing key, or an empty result set all come back as an empty list and
//! the news stage degrades to its no-data context.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::data::{DataError, DataResult};

const SEARCH_URL: &str = "https://google.serper.dev/news";
const RESULT_LIMIT: usize = 3;
/// Days of context before the buy date included in the search window.
const LOOKBACK_DAYS: i64 = 14;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub link: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    news: Vec<NewsItem>,
}

pub struct NewsSearchClient {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl NewsSearchClient {
    pub fn new(api_key: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(20))
            .user_agent("losscoach/0.1.0")
            .build()
            .unwrap_or_default();

        Self {
            client,
            api_key,
            base_url: SEARCH_URL.to_string(),
        }
    }

    pub fn with_base_url(api_key: Option<String>, base_url: impl Into<String>) -> Self {
        let mut search = Self::new(api_key);
        search.base_url = base_url.into();
        search
    }

    /// Search headlines for the review window. Tries the ticker-specific
    /// query first, then one broadened query; both failing yields an empty
    /// list, never an error.
    pub async fn search_window(
        &self,
        ticker: &str,
        buy_date: NaiveDate,
        sell_date: NaiveDate,
    ) -> Vec<NewsItem> {
        let primary = format!(
            "{t} 주가 OR {t} 실적 OR {t} \"stock price\" OR {t} earnings OR {t} guidance",
            t = ticker
        );
        match self.search(&primary, buy_date, sell_date).await {
            Ok(items) if !items.is_empty() => return items,
            Ok(_) => tracing::info!("No headlines for primary query, broadening"),
            Err(e) => tracing::warn!("News search failed: {}, broadening", e),
        }

        let broadened = format!("{t} 실적 OR 가이던스 OR 악재 OR {t} news", t = ticker);
        match self.search(&broadened, buy_date, sell_date).await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!("Broadened news search failed: {}", e);
                Vec::new()
            }
        }
    }

    async fn search(
        &self,
        query: &str,
        buy_date: NaiveDate,
        sell_date: NaiveDate,
    ) -> DataResult<Vec<NewsItem>> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| DataError::Config("SERPER_API_KEY not configured".to_string()))?;

        // Date bounds go into the query string, which the endpoint honors
        // more reliably than its dedicated range parameter.
        let window_start = buy_date - Duration::days(LOOKBACK_DAYS);
        let final_query = format!("{} after:{} before:{}", query, window_start, sell_date);

        let payload = json!({
            "q": final_query,
            "num": RESULT_LIMIT,
            "gl": "kr",
            "hl": "ko",
        });

        let response = self
            .client
            .post(&self.base_url)
            .header("X-API-KEY", api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status_code = response.status().as_u16();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(DataError::api_error(status_code, error_text));
        }

        let parsed: SearchResponse = response.json().await?;
        let items: Vec<NewsItem> = parsed.news.into_iter().take(RESULT_LIMIT).collect();

        tracing::info!("News search returned {} items", items.len());
        Ok(items)
    }
}
