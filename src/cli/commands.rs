use anyhow::{Context, Result};
use std::io::Read;
use std::path::PathBuf;
use tracing::warn;

use crate::config::Config;
use crate::data::MarketDataClient;
use crate::llm::LlmClient;
use crate::metrics::Evaluator;
use crate::pipeline::Pipeline;
use crate::schema::TradeRequest;
use crate::search::NewsSearchClient;
use crate::store::RunStore;

/// Run the full review pipeline over one trade description and print the
/// run as pretty JSON. With `--metrics` the run is also scored and the
/// evaluation report printed after it.
pub async fn analyze(config: Config, file: Option<PathBuf>, metrics: bool) -> Result<()> {
    let raw = read_input(file)?;
    let request: serde_json::Result<TradeRequest> = serde_json::from_str(&raw);
    let request = request.context("Invalid trade description JSON")?;

    let generator = LlmClient::from_config(&config)?;
    let market = MarketDataClient::new();
    let search = NewsSearchClient::new(config.apis.serper_api_key.clone());

    let pipeline = Pipeline::new(generator, market, search);
    let run = pipeline
        .run(&request)
        .await
        .context("Trade description rejected")?;

    println!("{}", serde_json::to_string_pretty(&run)?);

    let store = RunStore::connect(&config.database).await;
    if let Some(store) = &store {
        if let Err(err) = store.save_run(&run).await {
            warn!(error = %err, "failed to store pipeline run");
        }
    }

    if metrics {
        let judge = LlmClient::from_config(&config)?;
        let report = Evaluator::with_judge(&judge).evaluate(&run).await;
        println!("{}", serde_json::to_string_pretty(&report)?);

        if let Some(store) = &store {
            if let Err(err) = store.save_metrics(&report).await {
                warn!(error = %err, "failed to store metric results");
            }
        }
    }

    Ok(())
}

/// Verify the Ollama runtime answers and the configured model is present.
pub async fn health(config: Config) -> Result<()> {
    let client = LlmClient::from_config(&config)?;
    client.health_check().await?;
    println!("ok: model runtime reachable");
    Ok(())
}

fn read_input(file: Option<PathBuf>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read trade description from stdin")?;
            Ok(buffer)
        }
    }
}
