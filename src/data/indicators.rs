//! Technical indicator math: SMA, RSI, and close-to-close volatility

/// Calculate SMA (Simple Moving Average) over the trailing `period` closes.
pub fn calculate_sma(prices: &[f64], period: usize) -> Option<f64> {
    if prices.len() < period || period == 0 {
        return None;
    }

    let recent = &prices[prices.len() - period..];
    Some(recent.iter().sum::<f64>() / period as f64)
}

/// Calculate RSI (Relative Strength Index) with Wilder smoothing.
pub fn calculate_rsi(prices: &[f64], period: usize) -> Option<f64> {
    if prices.len() < period + 1 || period == 0 {
        return None;
    }

    let mut gains = Vec::new();
    let mut losses = Vec::new();

    for i in 1..prices.len() {
        let change = prices[i] - prices[i - 1];
        if change > 0.0 {
            gains.push(change);
            losses.push(0.0);
        } else {
            gains.push(0.0);
            losses.push(change.abs());
        }
    }

    let mut avg_gain = gains.iter().take(period).sum::<f64>() / period as f64;
    let mut avg_loss = losses.iter().take(period).sum::<f64>() / period as f64;

    for i in period..gains.len() {
        avg_gain = (avg_gain * (period - 1) as f64 + gains[i]) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + losses[i]) / period as f64;
    }

    if avg_loss == 0.0 {
        return Some(100.0);
    }

    let rs = avg_gain / avg_loss;
    Some(100.0 - (100.0 / (1.0 + rs)))
}

/// Standard deviation of daily close-to-close returns, in percent.
pub fn calculate_volatility(prices: &[f64]) -> Option<f64> {
    if prices.len() < 3 {
        return None;
    }

    let returns: Vec<f64> = prices
        .windows(2)
        .map(|pair| (pair[1] - pair[0]) / pair[0])
        .collect();

    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let variance =
        returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / returns.len() as f64;

    Some(variance.sqrt() * 100.0)
}

/// Text interpretation of an RSI reading.
pub fn interpret_rsi(rsi: f64) -> &'static str {
    if rsi > 70.0 {
        "overbought"
    } else if rsi < 30.0 {
        "oversold"
    } else {
        "neutral"
    }
}

/// Text interpretation of a volatility reading.
pub fn interpret_volatility(volatility_pct: f64) -> &'static str {
    if volatility_pct > 3.0 {
        "high"
    } else if volatility_pct > 1.5 {
        "elevated"
    } else {
        "calm"
    }
}
