//! Per-attempt analysis report as returned by the analysis endpoint.

use std::fmt;

use serde::de::{MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::attempt::ExamSetInfo;
use crate::ids::QuestionId;
use crate::lenient;
use crate::DEFAULT_SUBJECT;

/// Aggregate analysis for one attempt. Marking is computed by the backend;
/// this crate only reads it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    #[serde(default, alias = "overall", alias = "performance")]
    pub overall_performance: OverallPerformance,
    #[serde(
        default,
        alias = "sectional_summary",
        alias = "sections",
        deserialize_with = "section_list"
    )]
    pub sectional_summaries: Vec<SectionSummary>,
    #[serde(default, alias = "weak_areas")]
    pub weak_chapters: Vec<WeakChapter>,
    #[serde(default, alias = "duration", deserialize_with = "lenient::opt_number")]
    pub duration_minutes: Option<f64>,
    #[serde(
        default,
        alias = "question_count",
        deserialize_with = "lenient::opt_count"
    )]
    pub total_questions: Option<u32>,
    #[serde(default)]
    pub exam_set: Option<ExamSetInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverallPerformance {
    #[serde(default, deserialize_with = "lenient::opt_number")]
    pub score: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_number")]
    pub total_marks: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_count")]
    pub attempted: Option<u32>,
    #[serde(default, deserialize_with = "lenient::opt_number")]
    pub accuracy: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_number")]
    pub percentile: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_count")]
    pub rank: Option<u32>,
    #[serde(default, deserialize_with = "lenient::opt_number")]
    pub marks_gained: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_number")]
    pub marks_lost: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_number")]
    pub potential_marks: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_number")]
    pub cutoff_marks: Option<f64>,
    /// Signed distance to the cutoff; negative means above it.
    #[serde(default, deserialize_with = "lenient::opt_number")]
    pub cutoff_gap: Option<f64>,
}

/// Summary of one named section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectionSummary {
    #[serde(default, alias = "section", alias = "section_name")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::opt_number")]
    pub score: Option<f64>,
    #[serde(default, alias = "attempted", deserialize_with = "lenient::opt_count")]
    pub answered: Option<u32>,
    #[serde(
        default,
        alias = "total_questions",
        deserialize_with = "lenient::opt_count"
    )]
    pub total: Option<u32>,
    #[serde(default, deserialize_with = "lenient::opt_number")]
    pub accuracy: Option<f64>,
    /// Seconds spent in the section.
    #[serde(
        default,
        alias = "time_spent_seconds",
        deserialize_with = "lenient::opt_number"
    )]
    pub time_spent: Option<f64>,
}

/// A subject the backend judged weak, with the questions behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeakChapter {
    #[serde(default = "default_subject", deserialize_with = "subject_or_default")]
    pub subject: String,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub chapter: Option<String>,
    /// Opaque question ids, not display numbers.
    #[serde(default)]
    pub question_ids: Vec<QuestionId>,
}

fn default_subject() -> String {
    DEFAULT_SUBJECT.to_string()
}

fn subject_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(lenient::opt_text(deserializer)?
        .map(|s| s.trim().to_string())
        .unwrap_or_else(default_subject))
}

/// Inputs to the per-question time budget.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ExamTiming {
    pub duration_minutes: Option<f64>,
    pub total_questions: Option<u32>,
}

impl ExamTiming {
    /// Fill fields missing from `self` with those from `fallback`.
    pub fn or(self, fallback: ExamTiming) -> ExamTiming {
        ExamTiming {
            duration_minutes: self.duration_minutes.or(fallback.duration_minutes),
            total_questions: self.total_questions.or(fallback.total_questions),
        }
    }
}

impl AnalysisReport {
    /// Timing carried by the report itself or its embedded exam set.
    pub fn exam_timing(&self) -> ExamTiming {
        let own = ExamTiming {
            duration_minutes: self.duration_minutes,
            total_questions: self.total_questions,
        };
        match &self.exam_set {
            Some(exam_set) => own.or(exam_set.timing()),
            None => own,
        }
    }
}

/// Sections arrive either as a list or as an object keyed by section name.
fn section_list<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<SectionSummary>, D::Error> {
    struct SectionsVisitor;

    impl<'de> Visitor<'de> for SectionsVisitor {
        type Value = Vec<SectionSummary>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a list of sections or a map of section name to summary")
        }

        fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_none<E: serde::de::Error>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut sections = Vec::new();
            while let Some(section) = seq.next_element::<SectionSummary>()? {
                sections.push(section);
            }
            Ok(sections)
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut sections = Vec::new();
            while let Some((name, mut section)) = map.next_entry::<String, SectionSummary>()? {
                if section.name.is_empty() {
                    section.name = name;
                }
                sections.push(section);
            }
            Ok(sections)
        }
    }

    deserializer.deserialize_any(SectionsVisitor)
}
