// losscoach - educational loss-review pipeline for stock trades.
// Seven stages turn one losing (or lucky) trade into a structured review:
// technical and news analysis, root-cause attribution, behavioral pattern
// profiling, a learning report, and a comprehension quiz. Every stage past
// input validation is total: schema-invalid model output degrades to a
// deterministic fallback instead of failing the run.

#![deny(clippy::unwrap_used)]

pub mod cli;
pub mod config;
pub mod data;
pub mod llm;
pub mod metrics;
pub mod parse;
pub mod pipeline;
pub mod safety;
pub mod schema;
pub mod search;
pub mod stages;
pub mod store;

// Re-export commonly used items
pub use config::Config;
pub use pipeline::{Pipeline, PipelineRun, PipelineState};
pub use schema::{StageOutput, TradeRequest};
