//! Trade description input: the raw request shape and its normalized form

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raw request as submitted over the CLI boundary. Unknown keys are
/// rejected here, before the pipeline runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TradeRequest {
    pub stock: String,
    pub buy_date: String,
    pub sell_date: String,
    pub decision_basis: String,
    #[serde(default)]
    pub user_message: Option<String>,
    #[serde(default)]
    pub position_status: Option<String>,
}

/// The only fatal error in the system: missing mandatory user input.
/// No fallback substitutes for it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("missing required input fields: {}", fields.join(", "))]
pub struct InputError {
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionStatus {
    Holding,
    Sold,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradePeriod {
    pub buy_date: String,
    pub sell_date: String,
    pub position_status: PositionStatus,
}

/// Normalized pipeline input. Produced once at pipeline entry; every stage
/// reads from this, no stage writes to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeInput {
    pub stock: String,
    pub buy_date: String,
    pub sell_date: String,
    pub decision_basis: String,
    pub user_message: String,
    pub trade_period: TradePeriod,
}
