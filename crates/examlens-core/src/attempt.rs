//! Attempt records and the attempt index.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{AttemptId, ExamSetId};
use crate::lenient;
use crate::report::ExamTiming;

/// Lifecycle state of an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    InProgress,
    Completed,
    Submitted,
}

impl AttemptStatus {
    /// Completed and submitted attempts have results to show.
    pub fn is_finished(self) -> bool {
        !matches!(self, AttemptStatus::InProgress)
    }
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptStatus::InProgress => write!(f, "in_progress"),
            AttemptStatus::Completed => write!(f, "completed"),
            AttemptStatus::Submitted => write!(f, "submitted"),
        }
    }
}

impl FromStr for AttemptStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "in_progress" | "inprogress" | "ongoing" | "started" | "active" => {
                Ok(AttemptStatus::InProgress)
            }
            "completed" | "complete" | "finished" | "done" => Ok(AttemptStatus::Completed),
            "submitted" => Ok(AttemptStatus::Submitted),
            other => Err(format!("unknown attempt status: {other}")),
        }
    }
}

/// The canonical shape of one learner attempt, whatever endpoint it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub exam_set_id: ExamSetId,
    pub attempt_id: AttemptId,
    pub status: AttemptStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub total_marks: Option<f64>,
}

impl AttemptRecord {
    pub fn new(
        exam_set_id: impl Into<ExamSetId>,
        attempt_id: impl Into<AttemptId>,
        status: AttemptStatus,
    ) -> Self {
        Self {
            exam_set_id: exam_set_id.into(),
            attempt_id: attempt_id.into(),
            status,
            created_at: None,
            completed_at: None,
            score: None,
            total_marks: None,
        }
    }

    pub fn created(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }

    pub fn completed(mut self, at: DateTime<Utc>) -> Self {
        self.completed_at = Some(at);
        self
    }

    pub fn scored(mut self, score: f64, total_marks: f64) -> Self {
        self.score = Some(score);
        self.total_marks = Some(total_marks);
        self
    }

    /// Most recent thing known to have happened to this attempt.
    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        self.completed_at.or(self.created_at)
    }
}

/// Exam-set id → the learner's current attempt at it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttemptIndex(BTreeMap<ExamSetId, AttemptRecord>);

impl AttemptIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, exam_set_id: &ExamSetId) -> Option<&AttemptRecord> {
        self.0.get(exam_set_id)
    }

    pub fn contains(&self, exam_set_id: &ExamSetId) -> bool {
        self.0.contains_key(exam_set_id)
    }

    /// Insert keyed by the record's own exam-set id.
    pub fn insert(&mut self, record: AttemptRecord) -> Option<AttemptRecord> {
        self.0.insert(record.exam_set_id.clone(), record)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, ExamSetId, AttemptRecord> {
        self.0.iter()
    }

    pub fn records(&self) -> impl Iterator<Item = &AttemptRecord> {
        self.0.values()
    }
}

impl FromIterator<AttemptRecord> for AttemptIndex {
    fn from_iter<I: IntoIterator<Item = AttemptRecord>>(iter: I) -> Self {
        let mut index = AttemptIndex::new();
        for record in iter {
            index.insert(record);
        }
        index
    }
}

impl<'a> IntoIterator for &'a AttemptIndex {
    type Item = (&'a ExamSetId, &'a AttemptRecord);
    type IntoIter = btree_map::Iter<'a, ExamSetId, AttemptRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Exam-set metadata embedded in attempt-detail and analysis payloads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExamSetInfo {
    #[serde(default, alias = "exam_set_id")]
    pub id: Option<ExamSetId>,
    #[serde(default, alias = "name", deserialize_with = "lenient::opt_text")]
    pub title: Option<String>,
    #[serde(default, alias = "duration", deserialize_with = "lenient::opt_number")]
    pub duration_minutes: Option<f64>,
    #[serde(
        default,
        alias = "question_count",
        deserialize_with = "lenient::opt_count"
    )]
    pub total_questions: Option<u32>,
    #[serde(default, deserialize_with = "lenient::opt_number")]
    pub total_marks: Option<f64>,
}

impl ExamSetInfo {
    pub fn timing(&self) -> ExamTiming {
        ExamTiming {
            duration_minutes: self.duration_minutes,
            total_questions: self.total_questions,
        }
    }
}

/// Body of the attempt-detail endpoint. Only the fields the engine reads
/// are modelled; everything else is ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttemptDetail {
    #[serde(default, alias = "examSetId")]
    pub exam_set_id: Option<ExamSetId>,
    #[serde(default, alias = "examSet")]
    pub exam_set: Option<ExamSetInfo>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub status: Option<String>,
}

impl AttemptDetail {
    pub fn exam_set_id(&self) -> Option<&ExamSetId> {
        self.exam_set_id
            .as_ref()
            .or_else(|| self.exam_set.as_ref().and_then(|e| e.id.as_ref()))
    }

    pub fn timing(&self) -> ExamTiming {
        self.exam_set
            .as_ref()
            .map(ExamSetInfo::timing)
            .unwrap_or_default()
    }
}

/// Body of the reattempt action endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReattemptTicket {
    #[serde(alias = "attemptId", alias = "id")]
    pub attempt_id: AttemptId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn status_aliases() {
        assert_eq!("in-progress".parse(), Ok(AttemptStatus::InProgress));
        assert_eq!("Ongoing".parse(), Ok(AttemptStatus::InProgress));
        assert_eq!("FINISHED".parse(), Ok(AttemptStatus::Completed));
        assert_eq!("submitted".parse(), Ok(AttemptStatus::Submitted));
        assert!("abandoned".parse::<AttemptStatus>().is_err());
        assert!(AttemptStatus::Submitted.is_finished());
        assert!(!AttemptStatus::InProgress.is_finished());
    }

    #[test]
    fn index_serializes_as_plain_map() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        let index: AttemptIndex = [AttemptRecord::new("es-1", "a-9", AttemptStatus::Completed)
            .created(at)
            .scored(40.0, 50.0)]
        .into_iter()
        .collect();
        let json = serde_json::to_value(&index).unwrap();
        assert_eq!(json["es-1"]["attempt_id"], "a-9");
        assert_eq!(json["es-1"]["status"], "completed");

        let back: AttemptIndex = serde_json::from_value(json).unwrap();
        assert_eq!(back, index);
    }

    #[test]
    fn detail_exam_set_id_from_nested() {
        let detail: AttemptDetail = serde_json::from_str(
            r#"{"exam_set": {"id": 12, "title": "Mock 3", "duration_minutes": "180"}}"#,
        )
        .unwrap();
        assert_eq!(detail.exam_set_id().map(|id| id.as_str()), Some("12"));
        assert_eq!(detail.timing().duration_minutes, Some(180.0));
    }

    #[test]
    fn reattempt_ticket_aliases() {
        let t: ReattemptTicket = serde_json::from_str(r#"{"attemptId": 77}"#).unwrap();
        assert_eq!(t.attempt_id.as_str(), "77");
    }
}
