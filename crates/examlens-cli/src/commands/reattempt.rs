//! The `examlens reattempt` command.

use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;

use examlens_core::ids::ExamSetId;

use super::sync::{explain, open};

pub async fn execute(exam_set_id: String, config_path: Option<PathBuf>) -> Result<()> {
    let (_, sync) = open(config_path.as_deref())?;
    let exam_set_id = ExamSetId::new(exam_set_id);
    let ticket = sync
        .reattempt(&exam_set_id, Utc::now())
        .await
        .map_err(explain)?;
    println!(
        "Started attempt {} for exam set {exam_set_id}",
        ticket.attempt_id
    );
    Ok(())
}
