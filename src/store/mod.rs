//! Best-effort persistence of runs and metric reports
//!
//! The pipeline never depends on the database: no DATABASE_URL means no
//! store, and a failed write is logged and dropped. Review output goes to
//! stdout either way.

use anyhow::{Context, Result};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use std::str::FromStr;
use tracing::{info, warn};

use crate::config::DatabaseConfig;
use crate::metrics::EvaluationReport;
use crate::pipeline::PipelineRun;

pub struct RunStore {
    pool: PgPool,
}

impl RunStore {
    /// Connect if a database URL is configured. Returns `None` (with a
    /// warning) when the URL is absent or the connection fails.
    pub async fn connect(config: &DatabaseConfig) -> Option<Self> {
        let url = config.url.as_deref()?;
        match Self::new(url, config.max_connections).await {
            Ok(store) => Some(store),
            Err(err) => {
                warn!(error = %err, "database unavailable, runs will not be stored");
                None
            }
        }
    }

    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let connect_options = PgConnectOptions::from_str(database_url)
            .context("Failed to parse DATABASE_URL")?
            .statement_cache_capacity(0);

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(std::time::Duration::from_secs(10))
            .idle_timeout(std::time::Duration::from_secs(300))
            .connect_with(connect_options)
            .await
            .context("Failed to connect to PostgreSQL database")?;

        let store = Self { pool };
        store.ensure_schema().await?;
        info!("Database connection established");
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS pipeline_runs (
                request_id UUID PRIMARY KEY,
                started_at TIMESTAMPTZ NOT NULL,
                finished_at TIMESTAMPTZ NOT NULL,
                fallback_count INT NOT NULL,
                state JSONB NOT NULL
            )
            "#,
        )
        .persistent(false)
        .execute(&self.pool)
        .await
        .context("Failed to create pipeline_runs table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS evaluation_metrics (
                id BIGSERIAL PRIMARY KEY,
                request_id UUID NOT NULL,
                metric_name TEXT NOT NULL,
                tier TEXT NOT NULL,
                value DOUBLE PRECISION NOT NULL,
                target DOUBLE PRECISION NOT NULL,
                passed BOOLEAN NOT NULL,
                recorded_at TIMESTAMPTZ NOT NULL,
                metadata JSONB NOT NULL
            )
            "#,
        )
        .persistent(false)
        .execute(&self.pool)
        .await
        .context("Failed to create evaluation_metrics table")?;

        Ok(())
    }

    pub async fn save_run(&self, run: &PipelineRun) -> Result<()> {
        let state = serde_json::to_value(&run.state).context("Failed to serialize run state")?;

        sqlx::query(
            r#"
            INSERT INTO pipeline_runs (request_id, started_at, finished_at, fallback_count, state)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (request_id) DO NOTHING
            "#,
        )
        .persistent(false)
        .bind(run.request_id)
        .bind(run.started_at)
        .bind(run.finished_at)
        .bind(run.fallback_count() as i32)
        .bind(state)
        .execute(&self.pool)
        .await
        .context("Failed to store pipeline run")?;

        Ok(())
    }

    pub async fn save_metrics(&self, report: &EvaluationReport) -> Result<()> {
        for metric in &report.metrics {
            sqlx::query(
                r#"
                INSERT INTO evaluation_metrics
                    (request_id, metric_name, tier, value, target, passed, recorded_at, metadata)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .persistent(false)
            .bind(metric.request_id)
            .bind(&metric.metric_name)
            .bind(metric.tier.as_str())
            .bind(metric.value)
            .bind(metric.target)
            .bind(metric.passed)
            .bind(metric.timestamp)
            .bind(&metric.metadata)
            .execute(&self.pool)
            .await
            .context("Failed to store metric result")?;
        }

        Ok(())
    }
}
