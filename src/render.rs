//! Terminal output for reports, usage and board summaries

use crate::crew::{CrewOutput, UsageMetrics};
use crate::trello::{BoardSnapshot, CardSummary};
use chrono::{DateTime, Utc};
use comfy_table::{Cell, Color, ContentArrangement, Row, Table};
use serde::Serialize;

/// Final report as markdown under a `Report` heading
pub fn format_report(report: &str) -> String {
    format!("# Report\n\n{}\n", report.trim_end())
}

/// Usage metrics table followed by the cost line
pub fn format_usage(usage: &UsageMetrics, no_color: bool) -> String {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header(&["Metric", "Value"], no_color));

    for (metric, value) in [
        ("Total tokens", usage.total_tokens),
        ("Prompt tokens", usage.prompt_tokens),
        ("Completion tokens", usage.completion_tokens),
        ("Successful requests", usage.successful_requests),
    ] {
        table.add_row(Row::from(vec![metric.to_string(), value.to_string()]));
    }

    format!("{table}\n\n{}", format_cost(usage))
}

pub fn format_cost(usage: &UsageMetrics) -> String {
    format!("Total Costs: ${:.4}", usage.cost())
}

/// Card count line plus one table row per card
pub fn format_board(snapshot: &BoardSnapshot, now: DateTime<Utc>, no_color: bool) -> String {
    let heading = format!("Found {} tasks on the Trello board.", snapshot.len());
    if snapshot.is_empty() {
        return heading;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header(
        &["Card", "List", "Due", "Last activity", "Labels", "Comments"],
        no_color,
    ));

    for card in snapshot.summaries() {
        table.add_row(card_row(&card, now, no_color));
    }

    format!("{heading}\n\n{table}")
}

fn card_row(card: &CardSummary, now: DateTime<Utc>, no_color: bool) -> Row {
    let due = card
        .due
        .map(|due| due.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string());
    let due_cell = if card.is_overdue(now) && !no_color {
        Cell::new(due).fg(Color::Red)
    } else {
        Cell::new(due)
    };

    let last_activity = card
        .last_activity
        .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string());
    let labels = if card.labels.is_empty() {
        "-".to_string()
    } else {
        card.labels.join(", ")
    };

    Row::from(vec![
        Cell::new(truncate(&card.name, 50)),
        Cell::new(card.list_id.as_deref().unwrap_or("-")),
        due_cell,
        Cell::new(last_activity),
        Cell::new(labels),
        Cell::new(card.comment_count),
    ])
}

/// Captured log lines under their own heading
pub fn format_logs(lines: &[String]) -> String {
    if lines.is_empty() {
        return "## Logs\n\n(no log output captured)".to_string();
    }
    format!("## Logs\n\n```\n{}\n```", lines.join("\n"))
}

#[derive(Serialize)]
struct RunSummary<'a> {
    #[serde(flatten)]
    output: &'a CrewOutput,
    total_cost: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    board: Option<Vec<CardSummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    logs: Option<&'a [String]>,
}

/// Whole run as one pretty JSON document, with the cost estimate added.
///
/// The board summary and captured logs become `board` and `logs` fields when
/// present, so the document stays parseable whatever flags are set.
pub fn format_run_json(
    output: &CrewOutput,
    board: Option<&BoardSnapshot>,
    logs: Option<&[String]>,
) -> String {
    let summary = RunSummary {
        output,
        total_cost: output.usage.cost(),
        board: board.map(BoardSnapshot::summaries),
        logs,
    };
    serde_json::to_string_pretty(&summary).unwrap_or_else(|_| "{}".to_string())
}

fn header(names: &[&str], no_color: bool) -> Vec<Cell> {
    names
        .iter()
        .map(|name| {
            if no_color {
                Cell::new(name)
            } else {
                Cell::new(name).fg(Color::Cyan)
            }
        })
        .collect()
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
