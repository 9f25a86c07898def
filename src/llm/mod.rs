//! LLM integration over a local Ollama model
//!
//! Stages talk to the model through the `TextGenerator` trait so tests can
//! inject deterministic generators. The production implementation wraps
//! `ollama-rs` with a per-call timeout and bounded retry.

use anyhow::{Context, Result};
use async_trait::async_trait;
use ollama_rs::{generation::completion::request::GenerationRequest, Ollama};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info, warn};

/// LLM response with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub content: String,
    pub model: String,
}

/// Text generation seam between the stages and the model runtime.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Run one generation with a system instruction and a serialized
    /// user payload.
    async fn invoke(&self, system_instruction: &str, user_payload: &str) -> Result<LlmResponse>;
}

/// LLM client configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub ollama_url: String,
    pub model: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            ollama_url: "http://localhost:11434".to_string(),
            model: "llama3.2:3b".to_string(),
            timeout_seconds: 30,
            max_retries: 3,
        }
    }
}

/// LLM client with local Ollama integration
#[derive(Debug, Clone)]
pub struct LlmClient {
    ollama: Ollama,
    config: LlmConfig,
}

impl LlmClient {
    /// Create new LLM client with configuration
    pub fn new(config: LlmConfig) -> Result<Self> {
        let (host, port) = parse_host_port(&config.ollama_url)
            .with_context(|| format!("Invalid Ollama URL: {}", config.ollama_url))?;

        let ollama = Ollama::new(host, port);
        Ok(Self { ollama, config })
    }

    /// Create client from config::Config
    pub fn from_config(config: &crate::config::Config) -> Result<Self> {
        Self::new(LlmConfig {
            ollama_url: config.llm.ollama_url.clone(),
            model: config.llm.model.clone(),
            timeout_seconds: config.llm.timeout_seconds,
            max_retries: 3,
        })
    }

    /// Generate text with explicit error handling and bounded retry
    pub async fn generate(&self, prompt: &str) -> Result<LlmResponse> {
        let model_name = &self.config.model;

        info!(
            "Generating text with model '{}' (prompt length: {} chars)",
            model_name,
            prompt.len()
        );

        let request = GenerationRequest::new(model_name.clone(), prompt.to_string());

        let mut last_error = None;
        for attempt in 1..=self.config.max_retries {
            match timeout(
                Duration::from_secs(self.config.timeout_seconds),
                self.ollama.generate(request.clone()),
            )
            .await
            {
                Ok(Ok(response)) => {
                    info!(
                        "Generated {} chars with model '{}'",
                        response.response.len(),
                        model_name
                    );
                    return Ok(LlmResponse {
                        content: response.response,
                        model: model_name.clone(),
                    });
                }
                Ok(Err(e)) => {
                    error!("Ollama API error on attempt {}: {}", attempt, e);
                    last_error = Some(anyhow::anyhow!("Ollama API error: {}", e));
                }
                Err(_) => {
                    error!(
                        "Timeout on attempt {} after {} seconds",
                        attempt, self.config.timeout_seconds
                    );
                    last_error = Some(anyhow::anyhow!(
                        "Request timeout after {} seconds",
                        self.config.timeout_seconds
                    ));
                }
            }

            if attempt < self.config.max_retries {
                let backoff_seconds = 2_u64.pow(attempt - 1);
                warn!(
                    "Retrying in {} seconds (attempt {}/{})",
                    backoff_seconds, attempt, self.config.max_retries
                );
                tokio::time::sleep(Duration::from_secs(backoff_seconds)).await;
            }
        }

        Err(last_error.unwrap_or_else(|| {
            anyhow::anyhow!(
                "Failed to generate text after {} attempts",
                self.config.max_retries
            )
        }))
    }

    /// Test connectivity and model availability
    pub async fn health_check(&self) -> Result<()> {
        let models = timeout(Duration::from_secs(10), self.ollama.list_local_models())
            .await
            .context("Timeout connecting to Ollama")?
            .context("Ollama API error when listing models. Is Ollama running?")?;

        let model_available = models.iter().any(|m| m.name.contains(&self.config.model));
        if !model_available {
            warn!(
                "Model '{}' not found locally. Consider pulling it with: ollama pull {}",
                self.config.model, self.config.model
            );
        }

        info!("Ollama reachable, {} local models", models.len());
        Ok(())
    }
}

#[async_trait]
impl TextGenerator for LlmClient {
    async fn invoke(&self, system_instruction: &str, user_payload: &str) -> Result<LlmResponse> {
        // Ollama's completion endpoint takes a single prompt, so the system
        // instruction is prepended to the payload.
        let prompt = format!("{}\n\n{}", system_instruction, user_payload);
        self.generate(&prompt).await
    }
}

fn parse_host_port(url: &str) -> Result<(String, u16)> {
    let (scheme, rest) = url
        .split_once("://")
        .ok_or_else(|| anyhow::anyhow!("missing scheme"))?;
    let authority = rest.split('/').next().unwrap_or(rest);
    if authority.is_empty() {
        anyhow::bail!("missing host");
    }

    match authority.rsplit_once(':') {
        Some((host, port)) => {
            let port: u16 = port.parse().context("invalid port")?;
            Ok((format!("{}://{}", scheme, host), port))
        }
        None => Ok((format!("{}://{}", scheme, authority), 11434)),
    }
}
