//! Pipeline orchestrator
//!
//! Static DAG over the seven stages:
//! normalize -> (technical || news) -> attribution -> pattern -> tutor ->
//! quiz. No retries, no cycles, no content-conditional branching, and no
//! abort path past normalization: every stage is total. Wall-clock timings
//! and the request id live on `PipelineRun`, outside the serialized state,
//! so identical inputs with a deterministic generator serialize to
//! identical state bytes.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::data::MarketDataClient;
use crate::llm::TextGenerator;
use crate::schema::{
    InputError, LossAttribution, NewsAnalysis, PatternAnalysis, QuizSet, StageOutput,
    TechnicalAnalysis, TradeInput, TradeRequest, TutorReport,
};
use crate::search::NewsSearchClient;
use crate::stages;

/// Every stage output of one run. Stages read only their declared upstream
/// fields; nothing here is mutated after its producing stage completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineState {
    pub input: TradeInput,
    pub technical: StageOutput<TechnicalAnalysis>,
    pub news: StageOutput<NewsAnalysis>,
    pub attribution: StageOutput<LossAttribution>,
    pub pattern: StageOutput<PatternAnalysis>,
    pub report: StageOutput<TutorReport>,
    pub quiz: StageOutput<QuizSet>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageTiming {
    pub stage: String,
    pub elapsed_ms: u64,
}

/// One pipeline execution: the deterministic state plus run metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub request_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub timings: Vec<StageTiming>,
    pub state: PipelineState,
}

impl PipelineRun {
    /// Total generating stage outputs in one run.
    pub const GENERATED_STAGES: usize = 6;

    pub fn elapsed_ms(&self) -> u64 {
        (self.finished_at - self.started_at).num_milliseconds().max(0) as u64
    }

    /// Number of stage outputs that degraded to their fallback.
    pub fn fallback_count(&self) -> usize {
        let state = &self.state;
        [
            state.technical.is_fallback(),
            state.news.is_fallback(),
            state.attribution.is_fallback(),
            state.pattern.is_fallback(),
            state.report.is_fallback(),
            state.quiz.is_fallback(),
        ]
        .iter()
        .filter(|&&degraded| degraded)
        .count()
    }
}

pub struct Pipeline<G> {
    generator: G,
    market: MarketDataClient,
    search: NewsSearchClient,
}

impl<G: TextGenerator> Pipeline<G> {
    pub fn new(generator: G, market: MarketDataClient, search: NewsSearchClient) -> Self {
        Self {
            generator,
            market,
            search,
        }
    }

    /// Run the full DAG. The only error is invalid input, raised before any
    /// stage executes.
    pub async fn run(&self, request: &TradeRequest) -> Result<PipelineRun, InputError> {
        let request_id = Uuid::new_v4();
        let started_at = Utc::now();
        let mut timings = Vec::with_capacity(6);

        let input = stages::normalizer::normalize(request)?;
        info!(%request_id, stock = %input.stock, "pipeline started");

        // Fan-out: the two analysts share no state and run concurrently.
        let (technical, news) = tokio::join!(
            timed("technical", async {
                stages::technical::run(&self.generator, &self.market, &input).await
            }),
            timed("news", async {
                stages::news::run(&self.generator, &self.search, &input).await
            }),
        );
        let (technical, technical_timing) = technical;
        let (news, news_timing) = news;
        timings.push(technical_timing);
        timings.push(news_timing);

        let (attribution, timing) = timed("attribution", async {
            stages::attribution::run(&self.generator, &input, &technical.value, &news.value)
                .await
        })
        .await;
        timings.push(timing);

        let (pattern, timing) = timed("pattern", async {
            stages::pattern::run(&self.generator, &attribution.value.pattern_input).await
        })
        .await;
        timings.push(timing);

        let (report, timing) = timed("tutor", async {
            stages::tutor::run(&self.generator, &input, &attribution.value, &pattern.value)
                .await
        })
        .await;
        timings.push(timing);

        let (quiz, timing) = timed("quiz", async {
            stages::quiz::run(&self.generator, &attribution.value, &pattern.value).await
        })
        .await;
        timings.push(timing);

        let finished_at = Utc::now();
        let run = PipelineRun {
            request_id,
            started_at,
            finished_at,
            timings,
            state: PipelineState {
                input,
                technical,
                news,
                attribution,
                pattern,
                report,
                quiz,
            },
        };

        info!(
            %request_id,
            elapsed_ms = run.elapsed_ms(),
            fallbacks = run.fallback_count(),
            "pipeline finished"
        );
        Ok(run)
    }
}

async fn timed<T>(
    stage: &'static str,
    fut: impl std::future::Future<Output = T>,
) -> (T, StageTiming) {
    let start = Instant::now();
    let value = fut.await;
    (
        value,
        StageTiming {
            stage: stage.to_string(),
            elapsed_ms: start.elapsed().as_millis() as u64,
        },
    )
}
