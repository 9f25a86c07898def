//! Stage executors
//!
//! Every generating stage runs the same guarded protocol: invoke the
//! generator, reject directive advice, extract and deserialize the JSON
//! payload, apply the stage's repair pass, validate, and emit a
//! `StageOutput` tagged with its provenance. Nothing in this protocol can
//! fail the pipeline; every exit is either a generated output or the
//! stage's deterministic fallback.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::llm::TextGenerator;
use crate::parse::extract_json;
use crate::safety::contains_directive_advice;
use crate::schema::StageOutput;

pub mod attribution;
pub mod news;
pub mod normalizer;
pub mod pattern;
pub mod quiz;
pub mod technical;
pub mod tutor;

/// Result of one generator call, as a value. Collaborator errors are data
/// here, not control flow.
#[derive(Debug, Clone)]
pub enum LlmOutcome {
    Text(String),
    Failed(String),
}

pub(crate) async fn invoke_generator(
    generator: &dyn TextGenerator,
    system_instruction: &str,
    payload: &Value,
) -> LlmOutcome {
    let user_payload = payload.to_string();
    match generator.invoke(system_instruction, &user_payload).await {
        Ok(response) => LlmOutcome::Text(response.content),
        Err(e) => LlmOutcome::Failed(e.to_string()),
    }
}

/// Run the guarded stage protocol. `repair` is the stage's deterministic
/// normalization pass and always runs before validation; `fallback` builds
/// the stage's substitute output from the failure reason and must itself
/// satisfy `validate`.
pub(crate) async fn run_guarded<T, RP, VD, FB>(
    stage: &str,
    generator: &dyn TextGenerator,
    system_instruction: &str,
    payload: &Value,
    repair: RP,
    validate: VD,
    fallback: FB,
) -> StageOutput<T>
where
    T: DeserializeOwned,
    RP: FnOnce(T) -> T,
    VD: FnOnce(&T) -> Result<(), String>,
    FB: FnOnce(&str) -> T,
{
    let degrade = |reason: String| {
        warn!(stage, %reason, "stage degraded to fallback");
        reason
    };

    let text = match invoke_generator(generator, system_instruction, payload).await {
        LlmOutcome::Text(text) => text,
        LlmOutcome::Failed(error) => {
            let reason = degrade(format!("generation failed: {}", error));
            return StageOutput::fallback(fallback(&reason), reason);
        }
    };

    if contains_directive_advice(&text) {
        let reason = degrade("output contained directive investment advice".to_string());
        return StageOutput::fallback(fallback(&reason), reason);
    }

    let object = match extract_json(&text) {
        Some(object) => object,
        None => {
            let reason = degrade("no JSON object in output".to_string());
            return StageOutput::fallback(fallback(&reason), reason);
        }
    };

    let value: T = match serde_json::from_value(Value::Object(object)) {
        Ok(value) => value,
        Err(e) => {
            let reason = degrade(format!("schema mismatch: {}", e));
            return StageOutput::fallback(fallback(&reason), reason);
        }
    };

    let value = repair(value);
    match validate(&value) {
        Ok(()) => {
            debug!(stage, "stage output validated");
            StageOutput::generated(value)
        }
        Err(error) => {
            let reason = degrade(format!("validation failed: {}", error));
            StageOutput::fallback(fallback(&reason), reason)
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{FailingGenerator, FixedGenerator};
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Echo {
        message: String,
    }

    fn echo_fallback(reason: &str) -> Echo {
        Echo {
            message: format!("unavailable ({})", reason),
        }
    }

    async fn run(generator: &dyn TextGenerator) -> StageOutput<Echo> {
        run_guarded(
            "echo",
            generator,
            "echo the payload",
            &serde_json::json!({}),
            |value| value,
            |value: &Echo| {
                if value.message.is_empty() {
                    Err("message cannot be empty".to_string())
                } else {
                    Ok(())
                }
            },
            echo_fallback,
        )
        .await
    }

    #[tokio::test]
    async fn test_valid_output_is_generated() {
        let generator = FixedGenerator(r#"{"message": "hello"}"#.to_string());
        let output = run(&generator).await;
        assert!(!output.is_fallback());
        assert_eq!(output.value.message, "hello");
    }

    #[tokio::test]
    async fn test_generator_failure_degrades() {
        let output = run(&FailingGenerator).await;
        assert!(output.is_fallback());
        assert!(output.value.message.contains("generation failed"));
    }

    #[tokio::test]
    async fn test_non_json_output_degrades() {
        let generator = FixedGenerator("I cannot answer in JSON today".to_string());
        let output = run(&generator).await;
        assert!(output.is_fallback());
    }

    #[tokio::test]
    async fn test_directive_advice_degrades() {
        let generator =
            FixedGenerator(r#"{"message": "지금 매수하세요"}"#.to_string());
        let output = run(&generator).await;
        assert!(output.is_fallback());
    }

    #[tokio::test]
    async fn test_validation_failure_degrades() {
        let generator = FixedGenerator(r#"{"message": ""}"#.to_string());
        let output = run(&generator).await;
        assert!(output.is_fallback());
    }

    #[tokio::test]
    async fn test_schema_mismatch_degrades() {
        let generator = FixedGenerator(r#"{"unexpected": 42}"#.to_string());
        let output = run(&generator).await;
        assert!(output.is_fallback());
    }
}
