//! Market data layer: daily price bars over the review window plus the
//! indicator math the technical analyst stage reports on.

pub mod errors;
pub mod indicators;
pub mod market;
pub mod retry;

pub use errors::{DataError, DataResult};
pub use market::{resolve_ticker, DailyBar, MarketDataClient, MarketSummary};
