//! Text and JSON rendering shared by the analysis commands.

use anyhow::{bail, Result};
use comfy_table::{Cell, Table};
use serde::Serialize;

use examlens_core::analysis::{
    DataWarning, NumberedQuestion, PerformanceAnalysis, QuestionNumber, SectionPace,
};
use examlens_core::attempt::AttemptIndex;
use examlens_core::groups::SubjectGroups;
use examlens_core::loader::ResultsView;
use examlens_core::partition::{FilterCounts, IndexedSolution, SolutionFilter};
use examlens_core::report::OverallPerformance;
use examlens_core::solution::Outcome;

#[derive(Serialize)]
struct ResultsOutput<'a> {
    attempt_id: &'a str,
    overall: &'a OverallPerformance,
    analysis: &'a PerformanceAnalysis,
    filter: SolutionFilter,
    counts: FilterCounts,
    questions: SubjectGroups<IndexedSolution<'a>>,
}

pub fn print_results(view: &ResultsView, filter: SolutionFilter, format: &str) -> Result<()> {
    match format {
        "json" => {
            let output = ResultsOutput {
                attempt_id: view.attempt_id.as_str(),
                overall: &view.report.overall_performance,
                analysis: &view.analysis,
                filter,
                counts: view.filter_counts(),
                questions: view.group_by_subject(filter),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        "text" => print_results_text(view, filter),
        other => bail!("unknown format '{other}', expected text or json"),
    }
    Ok(())
}

fn print_results_text(view: &ResultsView, filter: SolutionFilter) {
    let overall = &view.report.overall_performance;
    let analysis = &view.analysis;

    println!("Attempt {}", view.attempt_id);
    if let Some(score) = overall.score {
        match overall.total_marks {
            Some(total) => println!("Score: {score} / {total}"),
            None => println!("Score: {score}"),
        }
    }
    if let Some(accuracy) = overall.accuracy {
        println!("Accuracy: {accuracy:.1}%");
    }
    if let Some(percentile) = overall.percentile {
        println!("Percentile: {percentile:.1}");
    }
    if let Some(rank) = overall.rank {
        println!("Rank: {rank}");
    }
    if let Some(cutoff) = &analysis.cutoff {
        let side = if cutoff.above_cutoff { "above" } else { "below" };
        println!("Cutoff: {} marks {side}", cutoff.gap);
    }
    let threshold = &analysis.overtime_threshold;
    println!(
        "Overtime threshold: {:.0}s per question (average {:.0}s)",
        threshold.threshold_seconds, threshold.average_seconds
    );
    let counts = view.filter_counts();
    println!(
        "Questions: {} all, {} overtime, {} unattempted",
        counts.all, counts.overtime, counts.unattempted
    );

    if !analysis.subjects.is_empty() {
        let mut table = Table::new();
        table.set_header(vec![
            "Subject",
            "Questions",
            "Correct",
            "Incorrect",
            "Unattempted",
            "Overtime",
            "Time",
        ]);
        for s in &analysis.subjects {
            table.add_row(vec![
                Cell::new(&s.subject),
                Cell::new(s.total),
                Cell::new(s.correct),
                Cell::new(s.incorrect),
                Cell::new(s.unattempted),
                Cell::new(s.overtime),
                Cell::new(format!("{:.0}s", s.time_spent_seconds)),
            ]);
        }
        println!("\n{table}");
    }

    if !analysis.sections.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Section", "Sec/question", "Pace"]);
        for section in &analysis.sections {
            let pace = match section.pace {
                SectionPace::WithinPace => "within pace",
                SectionPace::Overtime => "overtime",
            };
            table.add_row(vec![
                Cell::new(&section.name),
                Cell::new(format!("{:.0}s", section.seconds_per_question)),
                Cell::new(pace),
            ]);
        }
        println!("\n{table}");
    }

    print_numbered("Unattempted", &analysis.unattempted);
    print_numbered("Weak areas", &analysis.weak_areas);

    let grouped = view.group_by_subject(filter);
    println!("\nQuestions ({filter}):");
    if grouped.is_empty() {
        println!("  none");
    }
    for (subject, items) in grouped.iter() {
        let mut table = Table::new();
        table.set_header(vec!["Q", "Id", "Selected", "Outcome", "Time"]);
        for item in items {
            let s = item.solution;
            table.add_row(vec![
                Cell::new(format!("Q{}", item.question_number())),
                Cell::new(s.question_id()),
                Cell::new(s.selected_option.as_deref().unwrap_or("-")),
                Cell::new(outcome_label(s.outcome())),
                Cell::new(format!("{:.0}s", s.time_spent_seconds)),
            ]);
        }
        println!("{subject}\n{table}");
    }

    for warning in &analysis.warnings {
        match warning {
            DataWarning::UnmatchedWeakQuestion {
                subject,
                question_id,
            } => eprintln!("warning: weak-area question {question_id} ({subject}) not in solutions"),
        }
    }
}

fn print_numbered(title: &str, groups: &SubjectGroups<NumberedQuestion>) {
    if groups.is_empty() {
        return;
    }
    println!("\n{title}:");
    for (subject, items) in groups.iter() {
        let labels: Vec<String> = items
            .iter()
            .map(|q| match &q.question_number {
                QuestionNumber::Position(n) => format!("Q{n}"),
                QuestionNumber::Unresolved(id) => format!("#{id}"),
            })
            .collect();
        println!("  {subject}: {}", labels.join(", "));
    }
}

fn outcome_label(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Correct => "correct",
        Outcome::Incorrect => "incorrect",
        Outcome::Unattempted => "unattempted",
    }
}

pub fn print_index(index: &AttemptIndex, format: &str) -> Result<()> {
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(index)?),
        "text" => {
            if index.is_empty() {
                println!("No attempts.");
                return Ok(());
            }
            let mut table = Table::new();
            table.set_header(vec!["Exam set", "Attempt", "Status", "Created", "Score"]);
            for record in index.records() {
                let created = record
                    .created_at
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "-".into());
                let score = match (record.score, record.total_marks) {
                    (Some(score), Some(total)) => format!("{score} / {total}"),
                    (Some(score), None) => score.to_string(),
                    _ => "-".into(),
                };
                table.add_row(vec![
                    Cell::new(&record.exam_set_id),
                    Cell::new(&record.attempt_id),
                    Cell::new(record.status),
                    Cell::new(created),
                    Cell::new(score),
                ]);
            }
            println!("{table}");
        }
        other => bail!("unknown format '{other}', expected text or json"),
    }
    Ok(())
}
