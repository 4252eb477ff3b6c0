//! Normalization boundary for raw attempt payloads.
//!
//! The user-attempts endpoints disagree on field names and on the envelope
//! around the records. Every alias lookup lives here; the rest of the
//! engine only sees [`AttemptRecord`].

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use crate::attempt::{AttemptRecord, AttemptStatus};
use crate::error::NormalizeError;
use crate::ids::{id_from_json, AttemptId, ExamSetId};
use crate::lenient::number_from_json;

const EXAM_SET_ID_PATHS: &[&str] = &[
    "exam_set_id",
    "examSetId",
    "exam_set.id",
    "examSet.id",
    "exam_set.exam_set_id",
];
const ATTEMPT_ID_PATHS: &[&str] = &["attempt_id", "attemptId", "id"];
const STATUS_PATHS: &[&str] = &["status", "attempt_status", "state"];
const CREATED_AT_PATHS: &[&str] = &["created_at", "createdAt", "started_at", "startedAt"];
const COMPLETED_AT_PATHS: &[&str] = &[
    "completed_at",
    "completedAt",
    "submitted_at",
    "submittedAt",
];
const SCORE_PATHS: &[&str] = &["score", "total_score", "marks_obtained", "obtained_marks"];
const TOTAL_MARKS_PATHS: &[&str] = &[
    "total_marks",
    "totalMarks",
    "max_marks",
    "exam_set.total_marks",
    "examSet.total_marks",
];
const ENVELOPE_KEYS: &[&str] = &["data", "attempts", "results"];

/// One record from a user-attempts payload, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawAttempt {
    /// Map key the record was found under, when the payload was keyed.
    pub key_hint: Option<String>,
    pub value: Value,
}

impl RawAttempt {
    pub fn new(value: Value) -> Self {
        Self {
            key_hint: None,
            value,
        }
    }

    pub fn keyed(key: impl Into<String>, value: Value) -> Self {
        Self {
            key_hint: Some(key.into()),
            value,
        }
    }
}

/// Flatten a user-attempts body into raw records.
///
/// Accepts an array of records, an object keyed by exam-set id (values may
/// be a record or an array of records), or either of those wrapped under
/// `data`, `attempts` or `results`.
pub fn parse_attempts_payload(payload: Value) -> Result<Vec<RawAttempt>, NormalizeError> {
    match payload {
        Value::Array(items) => Ok(items.into_iter().map(RawAttempt::new).collect()),
        Value::Object(mut map) => {
            if let Some(key) = ENVELOPE_KEYS
                .iter()
                .find(|k| matches!(map.get(**k), Some(Value::Array(_) | Value::Object(_))))
            {
                let inner = map.remove(*key).unwrap_or(Value::Null);
                return parse_attempts_payload(inner);
            }
            let mut raw = Vec::with_capacity(map.len());
            for (key, value) in map {
                match value {
                    Value::Array(items) => {
                        raw.extend(items.into_iter().map(|v| RawAttempt::keyed(key.clone(), v)))
                    }
                    Value::Object(_) => raw.push(RawAttempt::keyed(key, value)),
                    Value::Null => debug!("no attempt under key {key}"),
                    other => warn!("ignoring non-object attempt under key {key}: {other}"),
                }
            }
            Ok(raw)
        }
        Value::Null => Ok(Vec::new()),
        other => Err(NormalizeError::UnexpectedPayload(type_name(&other).into())),
    }
}

/// Map one raw record onto the canonical [`AttemptRecord`].
pub fn normalize_attempt(raw: &RawAttempt) -> Result<AttemptRecord, NormalizeError> {
    let value = &raw.value;
    if !value.is_object() {
        return Err(NormalizeError::NotAnObject);
    }

    let exam_set_id = lookup(value, EXAM_SET_ID_PATHS)
        .and_then(id_from_json)
        .or_else(|| {
            raw.key_hint
                .as_deref()
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(String::from)
        })
        .map(ExamSetId::new)
        .ok_or(NormalizeError::MissingExamSetId)?;

    let attempt_id = lookup(value, ATTEMPT_ID_PATHS)
        .and_then(id_from_json)
        .map(AttemptId::new)
        .ok_or(NormalizeError::MissingAttemptId)?;

    let created_at = lookup(value, CREATED_AT_PATHS).and_then(parse_timestamp);
    let completed_at = lookup(value, COMPLETED_AT_PATHS).and_then(parse_timestamp);

    let status = match lookup(value, STATUS_PATHS).and_then(Value::as_str) {
        Some(s) => s.parse().unwrap_or_else(|e: String| {
            debug!("attempt {attempt_id}: {e}, inferring from timestamps");
            infer_status(completed_at)
        }),
        None => infer_status(completed_at),
    };

    Ok(AttemptRecord {
        exam_set_id,
        attempt_id,
        status,
        created_at,
        completed_at,
        score: lookup(value, SCORE_PATHS).and_then(number_from_json),
        total_marks: lookup(value, TOTAL_MARKS_PATHS).and_then(number_from_json),
    })
}

/// Normalize every record, dropping (and logging) the ones that cannot be.
pub fn normalize_all(raw: &[RawAttempt]) -> Vec<AttemptRecord> {
    raw.iter()
        .filter_map(|r| match normalize_attempt(r) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("dropping attempt record: {e}");
                None
            }
        })
        .collect()
}

fn infer_status(completed_at: Option<DateTime<Utc>>) -> AttemptStatus {
    if completed_at.is_some() {
        AttemptStatus::Completed
    } else {
        AttemptStatus::InProgress
    }
}

/// Parse a timestamp: RFC 3339, `YYYY-MM-DD HH:MM:SS[.fff]` (taken as UTC),
/// or epoch milliseconds.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_timestamp_str(s),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    }
}

fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(ms) = s.parse::<i64>() {
        return Utc.timestamp_millis_opt(ms).single();
    }
    debug!("unparseable timestamp: {s}");
    None
}

/// First non-null value at any of the dotted `paths`.
fn lookup<'a>(value: &'a Value, paths: &[&str]) -> Option<&'a Value> {
    paths.iter().find_map(|path| {
        path.split('.')
            .try_fold(value, |current, segment| current.get(segment))
            .filter(|v| !v.is_null())
    })
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn normalize(value: Value) -> Result<AttemptRecord, NormalizeError> {
        normalize_attempt(&RawAttempt::new(value))
    }

    #[test]
    fn canonical_field_names() {
        let r = normalize(json!({
            "exam_set_id": 12, "attempt_id": "a1", "status": "completed",
            "created_at": "2024-05-01T10:00:00Z", "completed_at": "2024-05-01T11:00:00Z",
            "score": 55.5, "total_marks": 100
        }))
        .unwrap();
        assert_eq!(r.exam_set_id.as_str(), "12");
        assert_eq!(r.attempt_id.as_str(), "a1");
        assert_eq!(r.status, AttemptStatus::Completed);
        assert_eq!(r.score, Some(55.5));
        assert_eq!(r.total_marks, Some(100.0));
        assert!(r.created_at.unwrap() < r.completed_at.unwrap());
    }

    #[test]
    fn aliased_field_names() {
        let camel = normalize(json!({"examSetId": "x", "attemptId": 3, "total_score": "7"}))
            .unwrap();
        assert_eq!(camel.exam_set_id.as_str(), "x");
        assert_eq!(camel.score, Some(7.0));

        let nested = normalize(json!({
            "exam_set": {"id": 99, "total_marks": 200}, "id": 4, "marks_obtained": 120
        }))
        .unwrap();
        assert_eq!(nested.exam_set_id.as_str(), "99");
        assert_eq!(nested.attempt_id.as_str(), "4");
        assert_eq!(nested.score, Some(120.0));
        assert_eq!(nested.total_marks, Some(200.0));
    }

    #[test]
    fn status_inferred_from_completion() {
        let done = normalize(json!({"exam_set_id": 1, "attempt_id": 1,
                                    "completed_at": "2024-01-01 09:30:00"}))
        .unwrap();
        assert_eq!(done.status, AttemptStatus::Completed);
        let open = normalize(json!({"exam_set_id": 1, "attempt_id": 1, "status": "weird"}))
            .unwrap();
        assert_eq!(open.status, AttemptStatus::InProgress);
    }

    #[test]
    fn missing_ids_are_errors() {
        assert_eq!(
            normalize(json!({"attempt_id": 1})),
            Err(NormalizeError::MissingExamSetId)
        );
        assert_eq!(
            normalize(json!({"exam_set_id": 1})),
            Err(NormalizeError::MissingAttemptId)
        );
        assert_eq!(normalize(json!([1, 2])), Err(NormalizeError::NotAnObject));
    }

    #[test]
    fn key_hint_supplies_exam_set_id() {
        let raw = RawAttempt::keyed("es-7", json!({"attempt_id": "a"}));
        assert_eq!(normalize_attempt(&raw).unwrap().exam_set_id.as_str(), "es-7");
    }

    #[test]
    fn payload_shapes() {
        assert_eq!(parse_attempts_payload(json!([{}, {}])).unwrap().len(), 2);

        let keyed = parse_attempts_payload(json!({
            "1": {"attempt_id": "a"},
            "2": [{"attempt_id": "b"}, {"attempt_id": "c"}],
            "3": null
        }))
        .unwrap();
        assert_eq!(keyed.len(), 3);
        assert!(keyed.iter().all(|r| r.key_hint.is_some()));

        let wrapped = parse_attempts_payload(json!({"data": [{"attempt_id": "a"}]})).unwrap();
        assert_eq!(wrapped.len(), 1);
        assert_eq!(wrapped[0].key_hint, None);

        assert!(parse_attempts_payload(json!("nope")).is_err());
        assert!(parse_attempts_payload(Value::Null).unwrap().is_empty());
    }

    #[test]
    fn timestamp_formats() {
        let rfc = parse_timestamp(&json!("2024-05-01T10:00:00+02:00")).unwrap();
        let naive = parse_timestamp(&json!("2024-05-01 08:00:00")).unwrap();
        let millis = parse_timestamp(&json!(1_714_550_400_000_i64)).unwrap();
        assert_eq!(rfc, naive);
        assert_eq!(rfc, millis);
        assert_eq!(parse_timestamp(&json!("yesterday")), None);
        assert_eq!(parse_timestamp(&json!("")), None);
    }

    #[test]
    fn normalize_all_drops_bad_rows() {
        let raw = vec![
            RawAttempt::new(json!({"exam_set_id": 1, "attempt_id": 1})),
            RawAttempt::new(json!({"attempt_id": 2})),
        ];
        assert_eq!(normalize_all(&raw).len(), 1);
    }
}
