//! The `examlens reconcile` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde_json::Value;

use examlens_core::normalize::{parse_attempts_payload, parse_timestamp};
use examlens_core::reconcile::Reconciler;
use examlens_core::store::{read_or_reset, AttemptIndexStore, FileStore};

use super::analyze::read_json;
use super::render;

pub fn execute(
    attempts_path: PathBuf,
    cache_path: PathBuf,
    now: Option<String>,
    trust_window_secs: i64,
    format: String,
) -> Result<()> {
    let now = match now {
        Some(raw) => parse_now(&raw)?,
        None => Utc::now(),
    };

    let payload: Value = read_json(&attempts_path)?;
    let remote = parse_attempts_payload(payload)
        .with_context(|| format!("unusable attempts payload in {}", attempts_path.display()))?;

    let store = FileStore::new(cache_path);
    let cached = read_or_reset(&store)?;
    let reconciler = Reconciler::new(chrono::Duration::seconds(trust_window_secs));
    let merged = reconciler.reconcile(&remote, &cached, now);
    store.overwrite(&merged)?;

    render::print_index(&merged, &format)
}

fn parse_now(raw: &str) -> Result<DateTime<Utc>> {
    let value = match raw.trim().parse::<i64>() {
        Ok(millis) => Value::from(millis),
        Err(_) => Value::String(raw.to_string()),
    };
    parse_timestamp(&value).with_context(|| format!("invalid --now timestamp: {raw}"))
}
