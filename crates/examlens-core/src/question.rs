//! Question records and the option/answer encodings they carry.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ids::QuestionId;
use crate::lenient;
use crate::DEFAULT_SUBJECT;

/// Text compared against `correct_option` when an option has no text.
pub const EMPTY_OPTION_PLACEHOLDER: &str = "No option text available";

/// One of the four answer slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OptionKey {
    A,
    B,
    C,
    D,
}

impl OptionKey {
    pub const ALL: [OptionKey; 4] = [OptionKey::A, OptionKey::B, OptionKey::C, OptionKey::D];

    pub fn letter(self) -> char {
        match self {
            OptionKey::A => 'A',
            OptionKey::B => 'B',
            OptionKey::C => 'C',
            OptionKey::D => 'D',
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Parse a letter code: `"b"`, `"B."`, `"B)"`, `"option_b"`, `"Option B"`.
    ///
    /// Unlike [`FromStr`], bare digits are not accepted here, since a digit
    /// stored as a correct answer is usually the option's text.
    pub fn from_letter(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let lower = trimmed.to_ascii_lowercase();
        let body = lower
            .strip_prefix("option_")
            .or_else(|| lower.strip_prefix("option "))
            .unwrap_or(&lower)
            .trim();
        let body = body
            .strip_suffix('.')
            .or_else(|| body.strip_suffix(')'))
            .unwrap_or(body)
            .trim();
        match body {
            "a" => Some(OptionKey::A),
            "b" => Some(OptionKey::B),
            "c" => Some(OptionKey::C),
            "d" => Some(OptionKey::D),
            _ => None,
        }
    }
}

impl fmt::Display for OptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

impl FromStr for OptionKey {
    type Err = String;

    /// Accepts everything [`OptionKey::from_letter`] does, plus a 0-based
    /// index (`"0"`..`"3"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(key) = Self::from_letter(s) {
            return Ok(key);
        }
        s.trim()
            .parse::<usize>()
            .ok()
            .and_then(Self::from_index)
            .ok_or_else(|| format!("unknown option key: {s}"))
    }
}

/// How a question's correct answer was encoded, decided once at ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorrectAnswer {
    /// A letter code, with or without trailing punctuation.
    Letter(OptionKey),
    /// The full text of the correct option.
    Text(String),
}

impl CorrectAnswer {
    /// Returns `None` for a missing or blank value.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.trim().is_empty() {
            return None;
        }
        Some(match OptionKey::from_letter(raw) {
            Some(key) => CorrectAnswer::Letter(key),
            None => CorrectAnswer::Text(raw.to_string()),
        })
    }
}

/// Rendering hint for the question body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionFormat {
    Table,
    Match,
    #[default]
    #[serde(other)]
    Plain,
}

/// A multiple-choice question as fetched. Immutable once fetched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub question_id: QuestionId,
    #[serde(default, alias = "text", deserialize_with = "lenient::opt_text")]
    pub question_text: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub option_a: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub option_b: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub option_c: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub option_d: Option<String>,
    /// Letter code or full option text; see [`CorrectAnswer`].
    #[serde(
        default,
        alias = "correct_answer",
        deserialize_with = "lenient::opt_text"
    )]
    pub correct_option: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub subject: Option<String>,
    #[serde(default, alias = "question_format")]
    pub format: Option<QuestionFormat>,
}

impl Question {
    pub fn new(question_id: impl Into<QuestionId>) -> Self {
        Self {
            question_id: question_id.into(),
            ..Default::default()
        }
    }

    /// Builder used mostly by tests and fixtures.
    pub fn with_options(mut self, options: [&str; 4]) -> Self {
        let [a, b, c, d] = options.map(|o| (!o.is_empty()).then(|| o.to_string()));
        self.option_a = a;
        self.option_b = b;
        self.option_c = c;
        self.option_d = d;
        self
    }

    pub fn with_correct_option(mut self, correct: &str) -> Self {
        self.correct_option = Some(correct.to_string());
        self
    }

    pub fn with_subject(mut self, subject: &str) -> Self {
        self.subject = Some(subject.to_string());
        self
    }

    /// Raw option text, if the option has any.
    pub fn option_text(&self, key: OptionKey) -> Option<&str> {
        let text = match key {
            OptionKey::A => &self.option_a,
            OptionKey::B => &self.option_b,
            OptionKey::C => &self.option_c,
            OptionKey::D => &self.option_d,
        };
        text.as_deref().filter(|t| !t.trim().is_empty())
    }

    /// Option text, or the placeholder when the option is empty.
    pub fn display_text(&self, key: OptionKey) -> &str {
        self.option_text(key).unwrap_or(EMPTY_OPTION_PLACEHOLDER)
    }

    pub fn correct_answer(&self) -> Option<CorrectAnswer> {
        self.correct_option.as_deref().and_then(CorrectAnswer::parse)
    }

    pub fn subject(&self) -> &str {
        self.subject
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SUBJECT)
    }

    /// Map a learner's selection to an option key. Selections are usually
    /// letter codes, but some payloads record the chosen option's text.
    /// Option text wins over a numeric index, matching how the correct
    /// answer is read.
    pub fn key_for_selection(&self, selection: &str) -> Option<OptionKey> {
        if let Some(key) = OptionKey::from_letter(selection) {
            return Some(key);
        }
        let wanted = selection.trim();
        OptionKey::ALL
            .into_iter()
            .find(|key| {
                self.option_text(*key)
                    .is_some_and(|text| text.trim().eq_ignore_ascii_case(wanted))
            })
            .or_else(|| selection.parse::<OptionKey>().ok())
    }
}
