//! Rendering a finished run for the terminal.

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use kairon_core::QualityReport;
use kairon_runtime::{LlmUsage, ResearchOutcome};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Yaml,
}

/// What gets serialized for `--format json|yaml`.
#[derive(Debug, Serialize)]
struct RunSummary<'a> {
    question: &'a str,
    answer: &'a str,
    revised: bool,
    report: &'a QualityReport,
    usage: &'a LlmUsage,
    completed_at: DateTime<Utc>,
}

pub fn render(
    question: &str,
    outcome: &ResearchOutcome,
    format: OutputFormat,
) -> anyhow::Result<String> {
    let summary = RunSummary {
        question,
        answer: &outcome.answer,
        revised: outcome.revised,
        report: &outcome.report,
        usage: &outcome.usage,
        completed_at: outcome.completed_at,
    };

    match format {
        OutputFormat::Text => Ok(render_text(&summary)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&summary)?),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(&summary)?),
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

fn render_text(summary: &RunSummary<'_>) -> String {
    let report = summary.report;
    let mut out = String::new();

    out.push_str(&format!("Question: {}\n\n", summary.question));
    out.push_str("Answer:\n");
    out.push_str(summary.answer.trim());
    out.push_str("\n\nQuality Report:\n");
    out.push_str(&format!("  Fact accuracy:  {:.2}\n", report.fact_accuracy()));
    out.push_str(&format!("  Consistency:    {:.2}\n", report.consistency_score()));
    out.push_str(&format!("  Readability:    {:.2}\n", report.readability_score()));
    out.push_str(&format!("  Bias detected:  {}\n", yes_no(report.bias_detected())));
    out.push_str(&format!("  Revised:        {}\n", yes_no(summary.revised)));

    if !report.issues().is_empty() {
        out.push_str("\nIssues:\n");
        for issue in report.issues() {
            out.push_str(&format!("  - {}\n", issue));
        }
    }
    if !report.suggestions().is_empty() {
        out.push_str("\nSuggestions:\n");
        for suggestion in report.suggestions() {
            out.push_str(&format!("  - {}\n", suggestion));
        }
    }

    out.push_str(&format!(
        "\nUsage: {} calls, {} tokens (~${:.4})",
        summary.usage.llm_calls, summary.usage.total_tokens, summary.usage.estimated_cost
    ));
    out
}
