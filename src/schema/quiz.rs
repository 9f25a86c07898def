//! Quiz stage output with its exact-cardinality contract

use serde::{Deserialize, Serialize};

use super::require;

pub const QUIZ_COUNT: usize = 3;
pub const OPTION_COUNT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizKind {
    MultipleChoice,
    Reflective,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizOption {
    pub text: String,
    /// Required on reflective options: what working through this choice
    /// should teach. Absent on multiple-choice options.
    #[serde(default)]
    pub resolution: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    pub quiz_id: String,
    pub kind: QuizKind,
    pub question: String,
    pub options: Vec<QuizOption>,
    #[serde(default)]
    pub correct_answer_index: Option<usize>,
}

impl Quiz {
    pub fn validate(&self) -> Result<(), String> {
        require("quiz.quiz_id", &self.quiz_id)?;
        require("quiz.question", &self.question)?;
        if self.options.len() != OPTION_COUNT {
            return Err(format!(
                "quiz {} has {} options (must be exactly {})",
                self.quiz_id,
                self.options.len(),
                OPTION_COUNT
            ));
        }
        for option in &self.options {
            require("quiz option text", &option.text)?;
        }
        match self.kind {
            QuizKind::MultipleChoice => match self.correct_answer_index {
                Some(index) if index < OPTION_COUNT => Ok(()),
                Some(index) => Err(format!(
                    "quiz {} correct_answer_index {} out of bounds",
                    self.quiz_id, index
                )),
                None => Err(format!(
                    "multiple_choice quiz {} needs correct_answer_index",
                    self.quiz_id
                )),
            },
            QuizKind::Reflective => {
                for option in &self.options {
                    match &option.resolution {
                        Some(resolution) => {
                            require("reflective option resolution", resolution)?
                        }
                        None => {
                            return Err(format!(
                                "reflective quiz {} option missing resolution",
                                self.quiz_id
                            ))
                        }
                    }
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizSet {
    pub purpose: String,
    pub quizzes: Vec<Quiz>,
}

impl QuizSet {
    pub fn validate(&self) -> Result<(), String> {
        require("quiz_set.purpose", &self.purpose)?;
        if self.quizzes.len() != QUIZ_COUNT {
            return Err(format!(
                "quiz_set has {} quizzes (must be exactly {})",
                self.quizzes.len(),
                QUIZ_COUNT
            ));
        }
        for quiz in &self.quizzes {
            quiz.validate()?;
        }
        Ok(())
    }
}
