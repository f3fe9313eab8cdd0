//! Output formatting for CLI commands
//!
//! Text output colours each step by its score band; JSON output is the
//! report exactly as the presentation layer consumes it.

use super::OutputFormat;
use crate::config::WorkwiseConfig;
use crate::service::{AnalysisReport, ChatEnvelope};
use crate::step::{ScoreBand, WorkflowStep};
use colored::{ColoredString, Colorize};
use serde::Serialize;

/// Render an analysis report.
pub fn format_report(report: &AnalysisReport, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => to_json(report),
        OutputFormat::Text => format_report_text(report),
    }
}

fn format_report_text(report: &AnalysisReport) -> String {
    let mut output = String::new();

    if let Some(failure) = &report.error {
        output.push_str(&format!("{}\n", "✗ No workflow steps found".red().bold()));
        output.push_str(&format!("  Reason: {}\n", failure.reason));
        if let Some(stage) = failure.stage {
            output.push_str(&format!("  Stage: {}\n", stage));
        }
        output.push_str(&format!("  Detail: {}\n", failure.message));
        return output;
    }

    if report.steps.is_empty() {
        output.push_str(&format!("{}\n", "No workflow steps found".yellow()));
        return output;
    }

    output.push_str(&format!(
        "{}\n\n",
        format!("✓ {} workflow steps", report.steps.len()).green().bold()
    ));
    for (index, step) in report.steps.iter().enumerate() {
        output.push_str(&format_step(index + 1, step));
        output.push('\n');
    }
    output
}

/// One numbered step: a coloured score badge, the summary and the
/// explanation indented below it.
pub fn format_step(number: usize, step: &WorkflowStep) -> String {
    let badge = paint(step.band(), &format!("[{:>4.1}]", step.efficiency_score));
    let mut out = format!("{:>2}. {} {}\n", number, badge, step.step_summary.bold());
    for line in step.explanation.lines().filter(|l| !l.trim().is_empty()) {
        out.push_str(&format!("       {}\n", line.trim()));
    }
    out
}

fn paint(band: ScoreBand, text: &str) -> ColoredString {
    match band {
        ScoreBand::Red => text.red().bold(),
        ScoreBand::Amber => text.yellow().bold(),
        ScoreBand::Green => text.green().bold(),
    }
}

/// Chat replies always print as the envelope JSON.
pub fn format_chat(envelope: &ChatEnvelope) -> String {
    to_json(envelope)
}

/// Resolved configuration as TOML, api key masked.
pub fn format_config(config: &WorkwiseConfig) -> String {
    match toml::to_string_pretty(&config.redacted()) {
        Ok(s) => s,
        Err(e) => format!("# failed to render configuration: {}", e),
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    match serde_json::to_string_pretty(value) {
        Ok(s) => s,
        Err(e) => format!("{{\"error\": \"{}\"}}", e),
    }
}
