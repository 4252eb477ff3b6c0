//! Filtering and subject grouping over the solutions sequence.
//!
//! Every view keeps each solution's original index so that question numbers
//! stay stable regardless of which filter is active.

use std::fmt;
use std::str::FromStr;

use serde::ser::{SerializeStruct, Serializer};
use serde::{Deserialize, Serialize};

use crate::analysis::OvertimeThreshold;
use crate::groups::SubjectGroups;
use crate::solution::Solution;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolutionFilter {
    #[default]
    All,
    Overtime,
    Unattempted,
}

impl SolutionFilter {
    pub const ALL: [SolutionFilter; 3] = [
        SolutionFilter::All,
        SolutionFilter::Overtime,
        SolutionFilter::Unattempted,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SolutionFilter::All => "all",
            SolutionFilter::Overtime => "overtime",
            SolutionFilter::Unattempted => "unattempted",
        }
    }

    pub fn matches(self, solution: &Solution, threshold: &OvertimeThreshold) -> bool {
        match self {
            SolutionFilter::All => true,
            SolutionFilter::Overtime => threshold.is_overtime(solution),
            SolutionFilter::Unattempted => !solution.is_attempted(),
        }
    }
}

impl fmt::Display for SolutionFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SolutionFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(SolutionFilter::All),
            "overtime" | "slow" => Ok(SolutionFilter::Overtime),
            "unattempted" | "skipped" => Ok(SolutionFilter::Unattempted),
            other => Err(format!(
                "unknown filter '{other}', expected one of: all, overtime, unattempted"
            )),
        }
    }
}

/// A solution paired with its position in the full sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexedSolution<'a> {
    pub original_index: usize,
    pub solution: &'a Solution,
}

impl IndexedSolution<'_> {
    pub fn question_number(&self) -> usize {
        self.original_index + 1
    }
}

impl Serialize for IndexedSolution<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("IndexedSolution", 4)?;
        state.serialize_field("question_number", &self.question_number())?;
        state.serialize_field("question_id", self.solution.question_id())?;
        state.serialize_field("subject", self.solution.subject())?;
        state.serialize_field("outcome", &self.solution.outcome())?;
        state.end()
    }
}

pub fn index_solutions(solutions: &[Solution]) -> Vec<IndexedSolution<'_>> {
    solutions
        .iter()
        .enumerate()
        .map(|(original_index, solution)| IndexedSolution {
            original_index,
            solution,
        })
        .collect()
}

/// Solutions matching `filter`, in original order, each with its original
/// index.
pub fn partition<'a>(
    solutions: &'a [Solution],
    filter: SolutionFilter,
    threshold: &OvertimeThreshold,
) -> Vec<IndexedSolution<'a>> {
    solutions
        .iter()
        .enumerate()
        .filter(|(_, s)| filter.matches(s, threshold))
        .map(|(original_index, solution)| IndexedSolution {
            original_index,
            solution,
        })
        .collect()
}

/// Group an already filtered view by subject. Original indices are kept.
pub fn group_by_subject<'a>(
    view: &[IndexedSolution<'a>],
) -> SubjectGroups<IndexedSolution<'a>> {
    view.iter()
        .map(|item| (item.solution.subject().to_string(), *item))
        .collect()
}

/// How many solutions each filter would show.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FilterCounts {
    pub all: usize,
    pub overtime: usize,
    pub unattempted: usize,
}

impl FilterCounts {
    pub fn compute(solutions: &[Solution], threshold: &OvertimeThreshold) -> Self {
        solutions.iter().fold(Self::default(), |mut counts, s| {
            counts.all += 1;
            if SolutionFilter::Overtime.matches(s, threshold) {
                counts.overtime += 1;
            }
            if SolutionFilter::Unattempted.matches(s, threshold) {
                counts.unattempted += 1;
            }
            counts
        })
    }

    pub fn count(&self, filter: SolutionFilter) -> usize {
        match filter {
            SolutionFilter::All => self.all,
            SolutionFilter::Overtime => self.overtime,
            SolutionFilter::Unattempted => self.unattempted,
        }
    }
}
