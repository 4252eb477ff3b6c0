//! The `examlens analyze` command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

use examlens_core::attempt::AttemptDetail;
use examlens_core::ids::AttemptId;
use examlens_core::loader::ResultsView;
use examlens_core::partition::SolutionFilter;
use examlens_core::report::AnalysisReport;
use examlens_core::solution::SolutionsPayload;

use super::render;

pub fn execute(
    analysis_path: PathBuf,
    solutions_path: PathBuf,
    attempt_path: Option<PathBuf>,
    filter: SolutionFilter,
    format: String,
) -> Result<()> {
    let report: AnalysisReport = read_json(&analysis_path)?;
    let payload: SolutionsPayload = read_json(&solutions_path)?;
    let detail: Option<AttemptDetail> = attempt_path.as_deref().map(read_json).transpose()?;

    let attempt_id = AttemptId::new(
        solutions_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default(),
    );
    let view = ResultsView::new(attempt_id, detail, report, payload.language, payload.solutions);
    render::print_results(&view, filter, &format)
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}
