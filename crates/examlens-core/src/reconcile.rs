//! Attempt-index reconciliation.
//!
//! Merges the remote attempt list with the locally cached index. The remote
//! set is authoritative; a cached entry the remote set does not know about
//! survives only while it is inside the trust window, which covers a
//! submission the backend read path has not caught up with yet.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::attempt::{AttemptIndex, AttemptRecord};
use crate::ids::ExamSetId;
use crate::normalize::{normalize_all, RawAttempt};

/// Default trust window for optimistic local entries.
pub const DEFAULT_TRUST_WINDOW_SECS: i64 = 300;

/// Merges remote attempt lists into the cached attempt index.
#[derive(Debug, Clone)]
pub struct Reconciler {
    trust_window: Duration,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_TRUST_WINDOW_SECS))
    }
}

impl Reconciler {
    pub fn new(trust_window: Duration) -> Self {
        Self {
            trust_window: trust_window.max(Duration::zero()),
        }
    }

    pub fn trust_window(&self) -> Duration {
        self.trust_window
    }

    /// Normalize `remote` and merge it with `cached` as of `now`.
    ///
    /// Idempotent: feeding the result back in as `cached` with the same
    /// `remote` and `now` returns the same index.
    pub fn reconcile(
        &self,
        remote: &[RawAttempt],
        cached: &AttemptIndex,
        now: DateTime<Utc>,
    ) -> AttemptIndex {
        self.merge(normalize_all(remote), cached, now)
    }

    /// [`Reconciler::reconcile`] for records that are already canonical.
    pub fn merge(
        &self,
        remote: impl IntoIterator<Item = AttemptRecord>,
        cached: &AttemptIndex,
        now: DateTime<Utc>,
    ) -> AttemptIndex {
        let latest = latest_per_exam_set(remote);
        let mut merged: AttemptIndex = latest.into_values().collect();

        for (exam_set_id, record) in cached {
            if merged.contains(exam_set_id) {
                continue;
            }
            if self.is_trusted(record, now) {
                debug!("keeping recent local attempt {} for {exam_set_id}", record.attempt_id);
                merged.insert(record.clone());
            } else {
                debug!("dropping stale local attempt {} for {exam_set_id}", record.attempt_id);
            }
        }

        merged
    }

    /// Whether a cached-only entry is recent enough to keep.
    ///
    /// Entries without any timestamp are never trusted. Timestamps in the
    /// future are trusted only within the same window, to bound clock skew.
    pub fn is_trusted(&self, record: &AttemptRecord, now: DateTime<Utc>) -> bool {
        record.last_activity().is_some_and(|at| {
            let age = now - at;
            age <= self.trust_window && age >= -self.trust_window
        })
    }
}

/// Keep only the most recent record per exam set.
pub fn latest_per_exam_set(
    records: impl IntoIterator<Item = AttemptRecord>,
) -> BTreeMap<ExamSetId, AttemptRecord> {
    let mut latest: BTreeMap<ExamSetId, AttemptRecord> = BTreeMap::new();
    for record in records {
        match latest.get(&record.exam_set_id) {
            Some(current) if recency(&record, current) != Ordering::Greater => {}
            _ => {
                latest.insert(record.exam_set_id.clone(), record);
            }
        }
    }
    latest
}

/// Total order on attempts of the same exam set: creation time (missing
/// sorts earliest), then finished before in-progress, then attempt id.
pub fn recency(a: &AttemptRecord, b: &AttemptRecord) -> Ordering {
    a.created_at
        .cmp(&b.created_at)
        .then_with(|| a.status.is_finished().cmp(&b.status.is_finished()))
        .then_with(|| a.attempt_id.cmp(&b.attempt_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attempt::AttemptStatus;
    use chrono::TimeZone;
    use serde_json::json;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, h, m, 0).unwrap()
    }

    fn raw(exam_set: &str, attempt: &str, created: &str) -> RawAttempt {
        RawAttempt::new(json!({
            "exam_set_id": exam_set, "attempt_id": attempt,
            "status": "completed", "created_at": created
        }))
    }

    #[test]
    fn latest_created_at_wins() {
        let remote = vec![
            raw("es1", "old", "2024-06-01T08:00:00Z"),
            raw("es1", "new", "2024-06-01T09:00:00Z"),
            raw("es1", "older", "2024-05-01T09:00:00Z"),
        ];
        let index = Reconciler::default().reconcile(&remote, &AttemptIndex::new(), at(12, 0));
        assert_eq!(index.len(), 1);
        assert_eq!(
            index.get(&"es1".into()).unwrap().attempt_id.as_str(),
            "new"
        );
    }

    #[test]
    fn missing_timestamp_sorts_earliest() {
        let remote = vec![
            RawAttempt::new(json!({"exam_set_id": "es1", "attempt_id": "untimed"})),
            raw("es1", "timed", "2020-01-01T00:00:00Z"),
        ];
        let index = Reconciler::default().reconcile(&remote, &AttemptIndex::new(), at(12, 0));
        assert_eq!(
            index.get(&"es1".into()).unwrap().attempt_id.as_str(),
            "timed"
        );
    }

    #[test]
    fn equal_timestamps_break_ties_deterministically() {
        let in_progress = AttemptRecord::new("es1", "z", AttemptStatus::InProgress).created(at(9, 0));
        let finished = AttemptRecord::new("es1", "a", AttemptStatus::Submitted).created(at(9, 0));
        let forward = latest_per_exam_set([in_progress.clone(), finished.clone()]);
        let backward = latest_per_exam_set([finished, in_progress]);
        assert_eq!(forward, backward);
        assert_eq!(forward[&ExamSetId::from("es1")].attempt_id.as_str(), "a");
    }

    #[test]
    fn remote_overrides_cached_entry() {
        let cached: AttemptIndex =
            [AttemptRecord::new("es1", "local", AttemptStatus::InProgress).created(at(11, 59))]
                .into_iter()
                .collect();
        let remote = vec![raw("es1", "remote", "2024-06-01T08:00:00Z")];
        let index = Reconciler::default().reconcile(&remote, &cached, at(12, 0));
        assert_eq!(
            index.get(&"es1".into()).unwrap().attempt_id.as_str(),
            "remote"
        );
    }

    #[test]
    fn cached_only_entries_respect_trust_window() {
        let cached: AttemptIndex = [
            AttemptRecord::new("fresh", "f", AttemptStatus::Submitted).completed(at(11, 58)),
            AttemptRecord::new("stale", "s", AttemptStatus::Submitted).completed(at(10, 0)),
            AttemptRecord::new("untimed", "u", AttemptStatus::InProgress),
            AttemptRecord::new("future", "x", AttemptStatus::InProgress).created(at(13, 0)),
        ]
        .into_iter()
        .collect();
        let index = Reconciler::default().reconcile(&[], &cached, at(12, 0));
        assert!(index.contains(&"fresh".into()));
        assert!(!index.contains(&"stale".into()));
        assert!(!index.contains(&"untimed".into()));
        assert!(!index.contains(&"future".into()));
    }

    #[test]
    fn completion_time_counts_over_creation_time() {
        let record = AttemptRecord::new("es", "a", AttemptStatus::Completed)
            .created(at(8, 0))
            .completed(at(11, 57));
        assert!(Reconciler::default().is_trusted(&record, at(12, 0)));
    }

    #[test]
    fn reconcile_is_idempotent() {
        let remote = vec![
            raw("es1", "a", "2024-06-01T08:00:00Z"),
            raw("es1", "b", "2024-06-01T09:00:00Z"),
            raw("es2", "c", "2024-06-01T07:00:00Z"),
            RawAttempt::new(json!({"attempt_id": "orphan"})),
        ];
        let cached: AttemptIndex = [
            AttemptRecord::new("es3", "d", AttemptStatus::InProgress).created(at(11, 59)),
            AttemptRecord::new("es4", "e", AttemptStatus::Completed).created(at(1, 0)),
        ]
        .into_iter()
        .collect();
        let reconciler = Reconciler::default();
        let now = at(12, 0);

        let once = reconciler.reconcile(&remote, &cached, now);
        let twice = reconciler.reconcile(&remote, &once, now);
        assert_eq!(once, twice);
        assert_eq!(once.len(), 3);
    }

    #[test]
    fn negative_window_clamps_to_zero() {
        let reconciler = Reconciler::new(Duration::seconds(-10));
        assert_eq!(reconciler.trust_window(), Duration::zero());
    }
}
