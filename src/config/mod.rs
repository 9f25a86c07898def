use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub apis: ApiConfig,
    pub llm: LlmSettings,
}

/// Persistence is best-effort: no DATABASE_URL means runs are not stored,
/// the pipeline itself never needs the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Serper.dev key for news retrieval. Without it the news stage
    /// degrades to its no-data fallback.
    pub serper_api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    pub ollama_url: String,
    pub model: String,
    pub timeout_seconds: u64,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load .env file - this sets env vars that aren't already set
        dotenv::dotenv().ok();

        Ok(Config {
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").ok(),
                max_connections: env::var("DB_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .context("Invalid DB_MAX_CONNECTIONS value")?,
            },
            apis: ApiConfig {
                serper_api_key: env::var("SERPER_API_KEY").ok(),
            },
            llm: LlmSettings {
                ollama_url: env::var("OLLAMA_URL")
                    .unwrap_or_else(|_| "http://localhost:11434".to_string()),
                model: env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama3.2:3b".to_string()),
                timeout_seconds: env::var("LLM_TIMEOUT_SECONDS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .context("Invalid LLM_TIMEOUT_SECONDS value")?,
            },
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: None,
                max_connections: 5,
            },
            apis: ApiConfig {
                serper_api_key: None,
            },
            llm: LlmSettings {
                ollama_url: "http://localhost:11434".to_string(),
                model: "llama3.2:3b".to_string(),
                timeout_seconds: 30,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.database.url.is_none());
        assert_eq!(config.llm.model, "llama3.2:3b");
        assert_eq!(config.llm.timeout_seconds, 30);
    }
}
