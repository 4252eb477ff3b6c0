//! Per-question solutions for one attempt.

use serde::{Deserialize, Deserializer, Serialize};

use crate::correctness;
use crate::ids::QuestionId;
use crate::lenient;
use crate::question::{OptionKey, Question};

/// One question's solution within an attempt.
///
/// The position of a `Solution` in the fetched sequence is its original
/// index; the question number shown to the learner is that index plus one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    #[serde(flatten)]
    pub question: Question,
    /// `None` when the learner did not answer.
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub selected_option: Option<String>,
    /// Backend verdict; used only when the question carries no correct answer.
    #[serde(default, deserialize_with = "lenient::opt_bool")]
    pub is_correct: Option<bool>,
    #[serde(
        default,
        alias = "time_spent",
        alias = "time_taken",
        deserialize_with = "lenient::number_or_zero"
    )]
    pub time_spent_seconds: f64,
    /// Share of the cohort that answered correctly.
    #[serde(default, deserialize_with = "lenient::opt_number")]
    pub percentage_correct: Option<f64>,
}

/// What happened to one question in an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Correct,
    Incorrect,
    Unattempted,
}

impl Solution {
    pub fn new(question: Question) -> Self {
        Self {
            question,
            ..Default::default()
        }
    }

    pub fn selected(mut self, option: &str) -> Self {
        self.selected_option = Some(option.to_string());
        self
    }

    pub fn time_spent(mut self, seconds: f64) -> Self {
        self.time_spent_seconds = seconds;
        self
    }

    pub fn question_id(&self) -> &QuestionId {
        &self.question.question_id
    }

    pub fn subject(&self) -> &str {
        self.question.subject()
    }

    pub fn is_attempted(&self) -> bool {
        self.selected_option
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty())
    }

    /// The option key the learner chose, when it maps to one.
    pub fn selected_key(&self) -> Option<OptionKey> {
        self.selected_option
            .as_deref()
            .and_then(|s| self.question.key_for_selection(s))
    }

    pub fn outcome(&self) -> Outcome {
        if !self.is_attempted() {
            return Outcome::Unattempted;
        }
        let correct = if self.question.correct_answer().is_some() {
            self.selected_key()
                .is_some_and(|key| correctness::is_correct_key(&self.question, key))
        } else {
            self.is_correct.unwrap_or(false)
        };
        if correct {
            Outcome::Correct
        } else {
            Outcome::Incorrect
        }
    }
}

/// Body of the solutions endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SolutionsPayload {
    pub language: Option<String>,
    pub solutions: Vec<Solution>,
}

impl<'de> Deserialize<'de> for SolutionsPayload {
    /// Accepts `{language, solutions}`, `{data: [...]}` or a bare array.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Wrapped {
            #[serde(default, deserialize_with = "lenient::opt_text")]
            language: Option<String>,
            #[serde(alias = "data", alias = "questions")]
            solutions: Vec<Solution>,
        }

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Shape {
            Bare(Vec<Solution>),
            Wrapped(Wrapped),
        }

        Ok(match Shape::deserialize(deserializer)? {
            Shape::Wrapped(w) => SolutionsPayload {
                language: w.language,
                solutions: w.solutions,
            },
            Shape::Bare(solutions) => SolutionsPayload {
                language: None,
                solutions,
            },
        })
    }
}
