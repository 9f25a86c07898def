//! Technical analyst stage output

use serde::{Deserialize, Serialize};

use super::{require, Uncertainty};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Sideways,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceMove {
    pub start_price: String,
    pub end_price: String,
    pub pct_change: String,
}

/// One indicator observation. Values arrive as strings because the
/// generator mixes units ("RSI 28.4", "-12.3%") freely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorReading {
    pub name: String,
    pub value: String,
    pub interpretation: String,
}

impl IndicatorReading {
    pub fn validate(&self) -> Result<(), String> {
        require("indicator.name", &self.name)?;
        require("indicator.value", &self.value)?;
        require("indicator.interpretation", &self.interpretation)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalAnalysis {
    pub summary: String,
    pub price_move: PriceMove,
    pub trend: Trend,
    pub indicators: Vec<IndicatorReading>,
    pub risk_notes: Vec<String>,
    pub uncertainty: Uncertainty,
}

impl TechnicalAnalysis {
    pub fn validate(&self) -> Result<(), String> {
        require("summary", &self.summary)?;
        require("price_move.start_price", &self.price_move.start_price)?;
        require("price_move.end_price", &self.price_move.end_price)?;
        require("price_move.pct_change", &self.price_move.pct_change)?;
        for indicator in &self.indicators {
            indicator.validate()?;
        }
        for note in &self.risk_notes {
            require("risk_notes member", note)?;
        }
        Ok(())
    }
}
