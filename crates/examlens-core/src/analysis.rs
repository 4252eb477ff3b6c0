//! Derived performance analysis for one attempt.
//!
//! Works from the backend's analysis report plus the ordered solutions
//! sequence. Every question number produced here is the question's
//! position in the full solutions sequence plus one.

use std::collections::HashMap;

use serde::Serialize;
use tracing::warn;

use crate::groups::SubjectGroups;
use crate::ids::QuestionId;
use crate::report::{AnalysisReport, ExamTiming, SectionSummary, WeakChapter};
use crate::solution::{Outcome, Solution};

/// Per-question time budget when the exam duration or size is unknown.
pub const DEFAULT_SECONDS_PER_QUESTION: f64 = 60.0;

/// A question is overtime when it took more than this multiple of the average.
pub const OVERTIME_FACTOR: f64 = 1.5;

/// Average time per question and the overtime cut derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OvertimeThreshold {
    pub average_seconds: f64,
    pub threshold_seconds: f64,
}

impl Default for OvertimeThreshold {
    fn default() -> Self {
        Self::from_average(DEFAULT_SECONDS_PER_QUESTION)
    }
}

impl OvertimeThreshold {
    pub fn from_average(average_seconds: f64) -> Self {
        Self {
            average_seconds,
            threshold_seconds: average_seconds * OVERTIME_FACTOR,
        }
    }

    /// `duration * 60 / total_questions`, or the default when either is
    /// missing or not positive.
    pub fn from_timing(timing: &ExamTiming) -> Self {
        match (timing.duration_minutes, timing.total_questions) {
            (Some(minutes), Some(total)) if minutes > 0.0 && total > 0 => {
                Self::from_average(minutes * 60.0 / f64::from(total))
            }
            _ => Self::default(),
        }
    }

    pub fn is_overtime_seconds(&self, seconds: f64) -> bool {
        seconds > self.threshold_seconds
    }

    pub fn is_overtime(&self, solution: &Solution) -> bool {
        self.is_overtime_seconds(solution.time_spent_seconds)
    }
}

/// How a question is shown: by its 1-based position, or by its raw id when
/// the id could not be found in the solutions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum QuestionNumber {
    Position(usize),
    Unresolved(QuestionId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NumberedQuestion {
    pub question_id: QuestionId,
    pub question_number: QuestionNumber,
}

/// Where the learner stands relative to the cutoff. `gap` is absolute;
/// wording is left to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CutoffStanding {
    pub above_cutoff: bool,
    pub gap: f64,
}

impl CutoffStanding {
    /// The report encodes a negative gap as above the cutoff.
    pub fn from_gap(cutoff_gap: f64) -> Self {
        Self {
            above_cutoff: cutoff_gap < 0.0,
            gap: cutoff_gap.abs(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SubjectSummary {
    pub subject: String,
    pub total: usize,
    pub attempted: usize,
    pub correct: usize,
    pub incorrect: usize,
    pub unattempted: usize,
    pub overtime: usize,
    pub time_spent_seconds: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionPace {
    WithinPace,
    Overtime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionTiming {
    pub name: String,
    pub seconds_per_question: f64,
    pub pace: SectionPace,
}

/// Data-quality problems found while deriving the analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataWarning {
    UnmatchedWeakQuestion {
        subject: String,
        question_id: QuestionId,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceAnalysis {
    pub unattempted: SubjectGroups<NumberedQuestion>,
    pub weak_areas: SubjectGroups<NumberedQuestion>,
    pub overtime_threshold: OvertimeThreshold,
    pub cutoff: Option<CutoffStanding>,
    pub subjects: Vec<SubjectSummary>,
    pub sections: Vec<SectionTiming>,
    pub warnings: Vec<DataWarning>,
}

/// Analyze using the timing the report carries.
pub fn analyze(report: &AnalysisReport, solutions: &[Solution]) -> PerformanceAnalysis {
    analyze_with_timing(report, solutions, report.exam_timing())
}

/// Analyze with explicitly supplied exam timing.
pub fn analyze_with_timing(
    report: &AnalysisReport,
    solutions: &[Solution],
    timing: ExamTiming,
) -> PerformanceAnalysis {
    let threshold = OvertimeThreshold::from_timing(&timing);
    let mut warnings = Vec::new();
    let weak_areas = renumber_weak_areas(&report.weak_chapters, solutions, &mut warnings);

    PerformanceAnalysis {
        unattempted: unattempted_by_subject(solutions),
        weak_areas,
        overtime_threshold: threshold,
        cutoff: report
            .overall_performance
            .cutoff_gap
            .map(CutoffStanding::from_gap),
        subjects: subject_summaries(solutions, &threshold),
        sections: section_timings(&report.sectional_summaries, &threshold),
        warnings,
    }
}

/// Unattempted questions grouped by subject, numbered by their position in
/// the full sequence.
pub fn unattempted_by_subject(solutions: &[Solution]) -> SubjectGroups<NumberedQuestion> {
    solutions
        .iter()
        .enumerate()
        .filter(|(_, s)| !s.is_attempted())
        .map(|(index, s)| {
            (
                s.subject().to_string(),
                NumberedQuestion {
                    question_id: s.question_id().clone(),
                    question_number: QuestionNumber::Position(index + 1),
                },
            )
        })
        .collect()
}

/// Replace the opaque ids of each weak chapter with display numbers.
///
/// Ids with no matching solution keep their raw id and add a warning.
pub fn renumber_weak_areas(
    chapters: &[WeakChapter],
    solutions: &[Solution],
    warnings: &mut Vec<DataWarning>,
) -> SubjectGroups<NumberedQuestion> {
    let mut positions: HashMap<&QuestionId, usize> = HashMap::with_capacity(solutions.len());
    for (index, s) in solutions.iter().enumerate() {
        positions.entry(s.question_id()).or_insert(index);
    }

    let mut groups = SubjectGroups::new();
    for chapter in chapters {
        for id in &chapter.question_ids {
            let question_number = match positions.get(id) {
                Some(index) => QuestionNumber::Position(index + 1),
                None => {
                    warn!(
                        "weak-area question {id} ({}) not found in solutions",
                        chapter.subject
                    );
                    warnings.push(DataWarning::UnmatchedWeakQuestion {
                        subject: chapter.subject.clone(),
                        question_id: id.clone(),
                    });
                    QuestionNumber::Unresolved(id.clone())
                }
            };
            groups.push(
                &chapter.subject,
                NumberedQuestion {
                    question_id: id.clone(),
                    question_number,
                },
            );
        }
    }
    groups
}

/// Outcome counts per subject, in first-appearance order.
pub fn subject_summaries(
    solutions: &[Solution],
    threshold: &OvertimeThreshold,
) -> Vec<SubjectSummary> {
    let mut summaries: Vec<SubjectSummary> = Vec::new();
    for s in solutions {
        let subject = s.subject();
        let position = match summaries.iter().position(|sum| sum.subject == subject) {
            Some(position) => position,
            None => {
                summaries.push(SubjectSummary {
                    subject: subject.to_string(),
                    ..Default::default()
                });
                summaries.len() - 1
            }
        };
        let summary = &mut summaries[position];
        summary.total += 1;
        summary.time_spent_seconds += s.time_spent_seconds;
        match s.outcome() {
            Outcome::Correct => summary.correct += 1,
            Outcome::Incorrect => summary.incorrect += 1,
            Outcome::Unattempted => summary.unattempted += 1,
        }
        if threshold.is_overtime(s) {
            summary.overtime += 1;
        }
    }
    for summary in &mut summaries {
        summary.attempted = summary.correct + summary.incorrect;
    }
    summaries
}

/// Classify each section by its average time per question. Sections with no
/// question total or no recorded time are skipped.
pub fn section_timings(
    sections: &[SectionSummary],
    threshold: &OvertimeThreshold,
) -> Vec<SectionTiming> {
    sections
        .iter()
        .filter_map(|section| {
            let total = section.total.filter(|t| *t > 0)?;
            let spent = section.time_spent?;
            let seconds_per_question = spent / f64::from(total);
            let pace = if threshold.is_overtime_seconds(seconds_per_question) {
                SectionPace::Overtime
            } else {
                SectionPace::WithinPace
            };
            Some(SectionTiming {
                name: section.name.clone(),
                seconds_per_question,
                pace,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::question::Question;
    use serde_json::json;

    fn solutions(value: serde_json::Value) -> Vec<Solution> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn overtime_threshold_from_duration() {
        let threshold = OvertimeThreshold::from_timing(&ExamTiming {
            duration_minutes: Some(60.0),
            total_questions: Some(20),
        });
        assert_eq!(threshold.average_seconds, 180.0);
        assert_eq!(threshold.threshold_seconds, 270.0);
        assert!(!threshold.is_overtime(&Solution::new(Question::new("1")).time_spent(200.0)));
        assert!(threshold.is_overtime(&Solution::new(Question::new("2")).time_spent(300.0)));
        assert!(!threshold.is_overtime_seconds(270.0));
    }

    #[test]
    fn overtime_threshold_defaults() {
        for timing in [
            ExamTiming::default(),
            ExamTiming {
                duration_minutes: Some(60.0),
                total_questions: Some(0),
            },
            ExamTiming {
                duration_minutes: None,
                total_questions: Some(10),
            },
        ] {
            let t = OvertimeThreshold::from_timing(&timing);
            assert_eq!(t.average_seconds, DEFAULT_SECONDS_PER_QUESTION);
            assert_eq!(t.threshold_seconds, 90.0);
        }
    }

    #[test]
    fn unattempted_grouping_uses_full_sequence_position() {
        let s = solutions(json!([
            {"question_id": 1, "selected_option": null, "subject": "Physics"},
            {"question_id": 2, "selected_option": "A", "subject": "Physics"}
        ]));
        let groups = unattempted_by_subject(&s);
        assert_eq!(
            groups.get("Physics").unwrap(),
            &[NumberedQuestion {
                question_id: "1".into(),
                question_number: QuestionNumber::Position(1),
            }]
        );
        assert_eq!(
            serde_json::to_value(&groups).unwrap(),
            json!({"Physics": [{"question_id": "1", "question_number": 1}]})
        );
    }

    #[test]
    fn unattempted_numbering_skips_answered_questions() {
        let s = solutions(json!([
            {"question_id": "a", "selected_option": "A", "subject": "Math"},
            {"question_id": "b", "selected_option": "B", "subject": "Math"},
            {"question_id": "c", "subject": "Math"},
            {"question_id": "d"}
        ]));
        let groups = unattempted_by_subject(&s);
        assert_eq!(
            groups.get("Math").unwrap()[0].question_number,
            QuestionNumber::Position(3)
        );
        assert_eq!(
            groups.get("General").unwrap()[0].question_number,
            QuestionNumber::Position(4)
        );
    }

    #[test]
    fn weak_areas_renumbered_by_position() {
        let report: AnalysisReport = serde_json::from_value(json!({
            "weak_chapters": [{"subject": "Math", "question_ids": [42, 99]}]
        }))
        .unwrap();
        let s = solutions(json!([
            {"question_id": 10}, {"question_id": 11}, {"question_id": 42}
        ]));
        let analysis = analyze(&report, &s);
        let math = analysis.weak_areas.get("Math").unwrap();
        assert_eq!(math[0].question_number, QuestionNumber::Position(3));
        assert_eq!(math[1].question_number, QuestionNumber::Unresolved("99".into()));
        assert_eq!(
            analysis.warnings,
            vec![DataWarning::UnmatchedWeakQuestion {
                subject: "Math".into(),
                question_id: "99".into(),
            }]
        );
        assert_eq!(
            serde_json::to_value(&math[1]).unwrap(),
            json!({"question_id": "99", "question_number": "99"})
        );
    }

    #[test]
    fn cutoff_sign_and_magnitude() {
        assert_eq!(
            CutoffStanding::from_gap(-4.5),
            CutoffStanding {
                above_cutoff: true,
                gap: 4.5
            }
        );
        assert_eq!(
            CutoffStanding::from_gap(2.0),
            CutoffStanding {
                above_cutoff: false,
                gap: 2.0
            }
        );
        let analysis = analyze(&AnalysisReport::default(), &[]);
        assert_eq!(analysis.cutoff, None);
    }

    #[test]
    fn subject_summary_counts_through_resolver() {
        let s = solutions(json!([
            {"question_id": 1, "subject": "Physics", "option_a": "x", "option_b": "y",
             "correct_option": "y", "selected_option": "B", "time_spent_seconds": 30},
            {"question_id": 2, "subject": "Physics", "correct_option": "A",
             "selected_option": "C", "is_correct": true, "time_spent_seconds": 100},
            {"question_id": 3, "subject": "Chemistry"}
        ]));
        let summaries = subject_summaries(&s, &OvertimeThreshold::default());
        assert_eq!(summaries.len(), 2);
        let physics = &summaries[0];
        assert_eq!(physics.subject, "Physics");
        assert_eq!((physics.correct, physics.incorrect), (1, 1));
        assert_eq!(physics.attempted, 2);
        assert_eq!(physics.overtime, 1);
        assert_eq!(physics.time_spent_seconds, 130.0);
        assert_eq!(summaries[1].unattempted, 1);
    }

    #[test]
    fn sections_classified_against_threshold() {
        let report: AnalysisReport = serde_json::from_value(json!({
            "duration_minutes": 60, "total_questions": 20,
            "sectional_summary": [
                {"name": "Physics", "total": 10, "time_spent": 1500},
                {"name": "Chemistry", "total": 10, "time_spent": 3000},
                {"name": "Biology", "total": 0, "time_spent": 100},
                {"name": "Math", "total": 5}
            ]
        }))
        .unwrap();
        let analysis = analyze(&report, &[]);
        assert_eq!(analysis.sections.len(), 2);
        assert_eq!(analysis.sections[0].pace, SectionPace::WithinPace);
        assert_eq!(analysis.sections[1].pace, SectionPace::Overtime);
        assert_eq!(analysis.sections[1].seconds_per_question, 300.0);
    }
}
