//! Loading one attempt's results view.
//!
//! The attempt detail, analysis and solutions are requested concurrently
//! and joined. Analysis and solutions are required; the attempt detail is
//! optional and its failure only loses the exam-set metadata.

use futures::future::join3;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::analysis::{self, OvertimeThreshold, PerformanceAnalysis};
use crate::api::ExamApi;
use crate::attempt::AttemptDetail;
use crate::error::FetchError;
use crate::groups::SubjectGroups;
use crate::ids::AttemptId;
use crate::partition::{self, FilterCounts, IndexedSolution, SolutionFilter};
use crate::report::{AnalysisReport, ExamTiming};
use crate::solution::Solution;
use crate::transport::Transport;

pub struct ResultsLoader<T> {
    api: ExamApi<T>,
    language: Option<String>,
}

impl<T: Transport> ResultsLoader<T> {
    pub fn new(transport: T) -> Self {
        Self {
            api: ExamApi::new(transport),
            language: None,
        }
    }

    /// Request solutions in this language.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn api(&self) -> &ExamApi<T> {
        &self.api
    }

    /// Fetch and analyze one attempt. Returns [`FetchError::Cancelled`] as
    /// soon as `cancel` fires; in-flight requests are dropped.
    #[instrument(skip_all, fields(attempt_id = %attempt_id))]
    pub async fn load(
        &self,
        attempt_id: &AttemptId,
        cancel: &CancellationToken,
    ) -> Result<ResultsView, FetchError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("results view torn down before load finished");
                Err(FetchError::Cancelled)
            }
            result = self.fetch_and_join(attempt_id) => result,
        }
    }

    async fn fetch_and_join(&self, attempt_id: &AttemptId) -> Result<ResultsView, FetchError> {
        let (detail, report, solutions) = join3(
            self.api.attempt_detail(attempt_id),
            self.api.analysis(attempt_id),
            self.api.solutions(attempt_id, self.language.as_deref()),
        )
        .await;

        let detail = match detail {
            Ok(detail) => Some(detail),
            Err(e) if e.is_auth() => return Err(e),
            Err(e) => {
                warn!("attempt detail unavailable, continuing without it: {e}");
                None
            }
        };
        let report = report?;
        let payload = solutions?;

        Ok(ResultsView::new(
            attempt_id.clone(),
            detail,
            report,
            payload.language,
            payload.solutions,
        ))
    }
}

/// Everything one results screen needs, derived once at load time.
#[derive(Debug, Clone)]
pub struct ResultsView {
    pub attempt_id: AttemptId,
    pub detail: Option<AttemptDetail>,
    pub report: AnalysisReport,
    pub language: Option<String>,
    pub solutions: Vec<Solution>,
    pub timing: ExamTiming,
    pub analysis: PerformanceAnalysis,
}

impl ResultsView {
    pub fn new(
        attempt_id: AttemptId,
        detail: Option<AttemptDetail>,
        report: AnalysisReport,
        language: Option<String>,
        solutions: Vec<Solution>,
    ) -> Self {
        let fallback = detail.as_ref().map(AttemptDetail::timing).unwrap_or_default();
        let timing = report.exam_timing().or(fallback);
        let analysis = analysis::analyze_with_timing(&report, &solutions, timing);
        Self {
            attempt_id,
            detail,
            report,
            language,
            solutions,
            timing,
            analysis,
        }
    }

    pub fn threshold(&self) -> &OvertimeThreshold {
        &self.analysis.overtime_threshold
    }

    pub fn partition(&self, filter: SolutionFilter) -> Vec<IndexedSolution<'_>> {
        partition::partition(&self.solutions, filter, self.threshold())
    }

    pub fn group_by_subject(&self, filter: SolutionFilter) -> SubjectGroups<IndexedSolution<'_>> {
        partition::group_by_subject(&self.partition(filter))
    }

    pub fn filter_counts(&self) -> FilterCounts {
        FilterCounts::compute(&self.solutions, self.threshold())
    }
}

/// Ties in-flight loads to the lifetime of one results view. Dropping the
/// session cancels every load started with its token.
#[derive(Debug, Default)]
pub struct ViewSession {
    token: CancellationToken,
}

impl ViewSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub async fn load<T: Transport>(
        &self,
        loader: &ResultsLoader<T>,
        attempt_id: &AttemptId,
    ) -> Result<ResultsView, FetchError> {
        loader.load(attempt_id, &self.token).await
    }
}

impl Drop for ViewSession {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
