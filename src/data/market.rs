use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::indicators::{calculate_rsi, calculate_sma, calculate_volatility};
use super::{DataError, DataResult};
use crate::schema::Trend;

/// One daily price bar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

/// Yahoo v8 chart API response structures
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    timestamp: Option<Vec<i64>>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    quote: Vec<ChartQuote>,
}

/// Individual fields can be null for half-days and halts.
#[derive(Debug, Deserialize)]
struct ChartQuote {
    open: Option<Vec<Option<f64>>>,
    high: Option<Vec<Option<f64>>>,
    low: Option<Vec<Option<f64>>>,
    close: Option<Vec<Option<f64>>>,
    volume: Option<Vec<Option<f64>>>,
}

/// Map a user-supplied stock token to a ticker symbol. Six digits means a
/// KRX listing; anything else that already looks like a ticker is upcased.
pub fn resolve_ticker(stock: &str) -> String {
    let raw = stock.trim();
    if raw.len() == 6 && raw.chars().all(|c| c.is_ascii_digit()) {
        return format!("{}.KS", raw);
    }
    if raw
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        return raw.to_ascii_uppercase();
    }
    raw.to_string()
}

/// Price history summary over the review window, computed before any
/// generation so the numbers survive a collaborator outage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSummary {
    pub ticker: String,
    pub start_price: f64,
    pub end_price: f64,
    pub pct_change: f64,
    pub trend: Trend,
    pub sma_20: Option<f64>,
    pub rsi_14: Option<f64>,
    pub volatility_pct: Option<f64>,
    pub bar_count: usize,
}

impl MarketSummary {
    /// Summarize the bars between `buy_date` and `sell_date`. Bars outside
    /// the window (the ±30 day extension) feed the indicators only.
    pub fn from_bars(
        ticker: &str,
        bars: &[DailyBar],
        buy_date: NaiveDate,
        sell_date: NaiveDate,
    ) -> DataResult<Self> {
        let buy_idx = bars
            .iter()
            .position(|bar| bar.date >= buy_date)
            .ok_or_else(|| DataError::NoData {
                symbol: ticker.to_string(),
                start: buy_date.to_string(),
                end: sell_date.to_string(),
            })?;
        let sell_idx = bars
            .iter()
            .rposition(|bar| bar.date <= sell_date)
            .filter(|&idx| idx >= buy_idx)
            .ok_or_else(|| DataError::NoData {
                symbol: ticker.to_string(),
                start: buy_date.to_string(),
                end: sell_date.to_string(),
            })?;

        let start_price = bars[buy_idx].close;
        let end_price = bars[sell_idx].close;
        let pct_change = (end_price - start_price) / start_price * 100.0;
        let trend = if pct_change > 5.0 {
            Trend::Up
        } else if pct_change < -5.0 {
            Trend::Down
        } else {
            Trend::Sideways
        };

        let closes: Vec<f64> = bars[..=sell_idx].iter().map(|bar| bar.close).collect();
        let window_closes: Vec<f64> = bars[buy_idx..=sell_idx]
            .iter()
            .map(|bar| bar.close)
            .collect();

        Ok(Self {
            ticker: ticker.to_string(),
            start_price,
            end_price,
            pct_change,
            trend,
            sma_20: calculate_sma(&closes, 20),
            rsi_14: calculate_rsi(&closes, 14),
            volatility_pct: calculate_volatility(&window_closes),
            bar_count: sell_idx - buy_idx + 1,
        })
    }
}

pub struct MarketDataClient {
    client: reqwest::Client,
    base_url: String,
}

impl Default for MarketDataClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MarketDataClient {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(20))
            .user_agent("losscoach/0.1.0")
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: "https://query1.finance.yahoo.com/v8/finance/chart".to_string(),
        }
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let mut client = Self::new();
        client.base_url = base_url.into();
        client
    }

    /// Fetch daily bars around the review window, extended ±30 days so the
    /// 20-day indicators have history before the buy date.
    pub async fn fetch_daily(
        &self,
        ticker: &str,
        buy_date: NaiveDate,
        sell_date: NaiveDate,
    ) -> DataResult<Vec<DailyBar>> {
        use super::retry::retry_with_backoff;

        let extended_start = buy_date - Duration::days(30);
        let extended_end = sell_date + Duration::days(30);

        tracing::info!(
            "Fetching daily bars for {} ({} to {}, extended)",
            ticker,
            extended_start,
            extended_end
        );

        let period1 = extended_start
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .ok_or_else(|| DataError::InvalidDate(extended_start.to_string()))?;
        let period2 = extended_end
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp() + 24 * 60 * 60)
            .ok_or_else(|| DataError::InvalidDate(extended_end.to_string()))?;

        let url = format!(
            "{}/{}?period1={}&period2={}&interval=1d&events=history&includeAdjustedClose=true",
            self.base_url,
            urlencoding::encode(ticker),
            period1,
            period2
        );

        let bars = retry_with_backoff(
            || async {
                let response = self.client.get(&url).send().await?;

                if !response.status().is_success() {
                    let status_code = response.status().as_u16();
                    let error_text = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown error".to_string());
                    return Err(DataError::api_error(status_code, error_text));
                }

                let chart: ChartResponse = response.json().await?;
                parse_chart(ticker, chart, buy_date, sell_date)
            },
            2,
        )
        .await?;

        tracing::info!("Fetched {} daily bars for {}", bars.len(), ticker);
        Ok(bars)
    }
}

fn parse_chart(
    ticker: &str,
    chart: ChartResponse,
    buy_date: NaiveDate,
    sell_date: NaiveDate,
) -> DataResult<Vec<DailyBar>> {
    let no_data = || DataError::NoData {
        symbol: ticker.to_string(),
        start: buy_date.to_string(),
        end: sell_date.to_string(),
    };

    let result = chart
        .chart
        .result
        .and_then(|mut results| if results.is_empty() { None } else { Some(results.remove(0)) })
        .ok_or_else(no_data)?;

    let timestamps = result.timestamp.ok_or_else(no_data)?;
    let quote = result.indicators.quote.into_iter().next().ok_or_else(no_data)?;

    let opens = quote.open.unwrap_or_default();
    let highs = quote.high.unwrap_or_default();
    let lows = quote.low.unwrap_or_default();
    let closes = quote.close.ok_or_else(no_data)?;
    let volumes = quote.volume.unwrap_or_default();

    let mut bars = Vec::with_capacity(timestamps.len());
    for (i, &ts) in timestamps.iter().enumerate() {
        let close = match closes.get(i).copied().flatten() {
            Some(value) => value,
            None => continue, // null bars dropped
        };
        let date = chrono::DateTime::from_timestamp(ts, 0)
            .ok_or_else(|| DataError::parse_error(format!("invalid timestamp: {}", ts)))?
            .date_naive();

        bars.push(DailyBar {
            date,
            open: opens.get(i).copied().flatten().unwrap_or(close),
            high: highs.get(i).copied().flatten().unwrap_or(close),
            low: lows.get(i).copied().flatten().unwrap_or(close),
            close,
            volume: volumes.get(i).copied().flatten().unwrap_or(0.0) as i64,
        });
    }

    if bars.is_empty() {
        return Err(no_data());
    }

    Ok(bars)
}
