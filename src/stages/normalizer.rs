//! Input normalizer: the only stage that can fail the run
//!
//! Deterministic, no generator involved. Missing or empty required fields
//! produce a structured `InputError` before any other stage executes.

use crate::schema::{InputError, PositionStatus, TradeInput, TradePeriod, TradeRequest};

pub fn normalize(request: &TradeRequest) -> Result<TradeInput, InputError> {
    let mut missing = Vec::new();

    let stock = request.stock.trim();
    let buy_date = request.buy_date.trim();
    let sell_date = request.sell_date.trim();
    let decision_basis = request.decision_basis.trim();

    if stock.is_empty() {
        missing.push("stock".to_string());
    }
    if buy_date.is_empty() {
        missing.push("buy_date".to_string());
    }
    if sell_date.is_empty() {
        missing.push("sell_date".to_string());
    }
    if decision_basis.is_empty() {
        missing.push("decision_basis".to_string());
    }

    if !missing.is_empty() {
        return Err(InputError { fields: missing });
    }

    let user_message = request
        .user_message
        .as_deref()
        .map(str::trim)
        .filter(|message| !message.is_empty())
        .unwrap_or(decision_basis)
        .to_string();

    let position_status = match request.position_status.as_deref().map(str::trim) {
        Some(status) if status.eq_ignore_ascii_case("holding") => PositionStatus::Holding,
        Some(status) if status.eq_ignore_ascii_case("sold") => PositionStatus::Sold,
        _ => PositionStatus::Unknown,
    };

    Ok(TradeInput {
        stock: stock.to_string(),
        buy_date: buy_date.to_string(),
        sell_date: sell_date.to_string(),
        decision_basis: decision_basis.to_string(),
        user_message,
        trade_period: TradePeriod {
            buy_date: buy_date.to_string(),
            sell_date: sell_date.to_string(),
            position_status,
        },
    })
}
