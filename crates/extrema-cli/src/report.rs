//! Rendering of the per-group report.

use crate::cli::OutputFormat;
use anyhow::Result;
use chrono::NaiveDate;
use extrema::{AggregationResult, MetricCalculator};
use serde::Serialize;
use tabled::{builder::Builder, settings::Style};

/// One line of the report: a group's extrema and the change between them.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReportRow {
    pub key: String,
    pub oldest_date: NaiveDate,
    pub oldest_value: f64,
    pub newest_date: NaiveDate,
    pub newest_value: f64,
    pub percent_change: f64,
    pub divisor: f64,
    pub clamped: bool,
}

/// Builds report rows ordered by key.  Groups dropped by the calculator's
/// zero-divisor policy do not appear.
pub fn build(
    result: AggregationResult<String, NaiveDate>,
    calculator: &MetricCalculator,
) -> Vec<ReportRow> {
    result
        .into_sorted()
        .into_iter()
        .filter_map(|(key, group)| {
            let metric = calculator.compute_group(&key, &group)?;
            Some(ReportRow {
                oldest_date: *group.oldest().timestamp(),
                oldest_value: group.oldest().value(),
                newest_date: *group.newest().timestamp(),
                newest_value: group.newest().value(),
                percent_change: metric.percent_change,
                divisor: metric.divisor,
                clamped: metric.clamped,
                key,
            })
        })
        .collect()
}

/// Renders `rows`.  `label` names the key column in text and table output.
pub fn render(rows: &[ReportRow], label: &str, format: OutputFormat) -> Result<String> {
    let label = capitalize(label);
    Ok(match format {
        OutputFormat::Text => rows
            .iter()
            .map(|row| {
                let note = if row.clamped {
                    " (zero base, divisor clamped to 1)"
                } else {
                    ""
                };
                format!(
                    "{label}: {} / Percent Change: {:.2}%{note}",
                    row.key, row.percent_change
                )
            })
            .collect::<Vec<_>>()
            .join("\n"),
        OutputFormat::Table => {
            let mut builder = Builder::default();
            builder.push_record([
                label.as_str(),
                "Oldest",
                "Oldest value",
                "Newest",
                "Newest value",
                "Change",
            ]);
            for row in rows {
                builder.push_record([
                    row.key.clone(),
                    row.oldest_date.to_string(),
                    row.oldest_value.to_string(),
                    row.newest_date.to_string(),
                    row.newest_value.to_string(),
                    format!("{:.2}%{}", row.percent_change, if row.clamped { "*" } else { "" }),
                ]);
            }
            builder.build().with(Style::rounded()).to_string()
        }
        OutputFormat::Json => serde_json::to_string_pretty(rows)?,
    })
}

fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
