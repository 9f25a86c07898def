//! Quiz generator stage

use serde_json::json;

use crate::llm::TextGenerator;
use crate::schema::{
    LossAttribution, PatternAnalysis, Quiz, QuizKind, QuizOption, QuizSet, StageOutput,
};

use super::run_guarded;

const SYSTEM_PROMPT: &str = "You are a learning-check quiz writer for a trade \
review. Write exactly 3 quizzes about this specific trade's causes and the \
investor's pattern: two multiple_choice quizzes with exactly 4 options and a \
correct_answer_index, and one reflective quiz with exactly 4 options that \
each carry a resolution explaining what practicing that choice teaches. No \
investment advice. Respond with a single JSON object with keys: purpose, \
quizzes [{quiz_id, kind (multiple_choice|reflective), question, options \
[{text, resolution}], correct_answer_index}].";

pub async fn run(
    generator: &dyn TextGenerator,
    attribution: &LossAttribution,
    pattern: &PatternAnalysis,
) -> StageOutput<QuizSet> {
    let causes: Vec<&str> = attribution
        .root_causes
        .iter()
        .map(|cause| cause.title.as_str())
        .collect();

    let payload = json!({
        "loss_summary": attribution.one_line_summary,
        "root_causes": causes,
        "primary_bias": pattern.cognitive_analysis.primary_bias.english,
        "pattern_weaknesses": pattern.pattern_weaknesses,
    });

    run_guarded(
        "quiz",
        generator,
        SYSTEM_PROMPT,
        &payload,
        |set| set,
        QuizSet::validate,
        fallback,
    )
    .await
}

fn choice(text: &str) -> QuizOption {
    QuizOption {
        text: text.to_string(),
        resolution: None,
    }
}

fn reflective(text: &str, resolution: &str) -> QuizOption {
    QuizOption {
        text: text.to_string(),
        resolution: Some(resolution.to_string()),
    }
}

fn fallback(reason: &str) -> QuizSet {
    QuizSet {
        purpose: format!("learning check (generated set unavailable: {})", reason),
        quizzes: vec![
            Quiz {
                quiz_id: "Q1".to_string(),
                kind: QuizKind::MultipleChoice,
                question: "What was the most important cause of this loss?".to_string(),
                options: vec![
                    choice("insufficient verification of the thesis"),
                    choice("excessive confidence in the entry"),
                    choice("misreading the trend"),
                    choice("no stop-loss rule"),
                ],
                correct_answer_index: Some(0),
            },
            Quiz {
                quiz_id: "Q2".to_string(),
                kind: QuizKind::MultipleChoice,
                question: "Which market factor had the biggest effect during the hold?"
                    .to_string(),
                options: vec![
                    choice("rate changes"),
                    choice("a news shock"),
                    choice("flow and positioning"),
                    choice("a volatility spike"),
                ],
                correct_answer_index: Some(1),
            },
            Quiz {
                quiz_id: "Q3".to_string(),
                kind: QuizKind::Reflective,
                question: "What behavior will you improve first in the next trade?"
                    .to_string(),
                options: vec![
                    reflective(
                        "define entry and exit rules",
                        "write a checklist and document both rules before entering",
                    ),
                    reflective(
                        "set a risk limit",
                        "decide the maximum acceptable loss per position and apply it",
                    ),
                    reflective(
                        "check external signals",
                        "cross-check the thesis against news and macro data",
                    ),
                    reflective(
                        "keep a trade journal",
                        "record each trade and look for repeating patterns",
                    ),
                ],
                correct_answer_index: None,
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_validates() {
        assert!(fallback("outage").validate().is_ok());
    }

    #[test]
    fn test_fallback_cardinality() {
        let set = fallback("outage");
        assert_eq!(set.quizzes.len(), 3);
        assert!(set.quizzes.iter().all(|quiz| quiz.options.len() == 4));
    }
}
