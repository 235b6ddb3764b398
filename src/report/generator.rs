//! Summary report generation.
//!
//! This module renders the aggregated summary table as a console
//! table, a Markdown report, or JSON.

use crate::cli::OutputFormat;
use crate::models::{ReportMetadata, SummaryReport, SummaryRow};
use anyhow::{Context, Result};
use std::path::Path;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &SummaryReport) -> String {
    let mut output = String::new();

    output.push_str("# Average Gas Analysis\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_table_section(&report.rows));
    output.push_str(&generate_inputs_section(&report.metadata));

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!(
        "- **Results Directory:** `{}`\n",
        metadata.results_dir.display()
    ));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Runs Aggregated:** {}\n", metadata.input_files.len()));
    section.push_str(&format!("- **Nested Message Counts:** {}\n", metadata.keys));
    section.push_str(&format!("- **Observations:** {}\n", metadata.observations));
    section.push('\n');

    section
}

/// Generate the summary table section.
fn generate_table_section(rows: &[SummaryRow]) -> String {
    let mut section = String::new();

    section.push_str("## Gas Delta by Nested Messages\n\n");
    section.push_str("| Nested Messages | Runs | Relay Mean | Relay StdDev | Claim Mean | Claim StdDev |\n");
    section.push_str("|---:|---:|---:|---:|---:|---:|\n");

    for row in rows {
        section.push_str(&format!(
            "| {} | {} | {:.2} | {:.2} | {:.2} | {:.2} |\n",
            row.nested_messages,
            row.samples,
            row.relay.mean,
            row.relay.std_dev,
            row.claim.mean,
            row.claim.std_dev
        ));
    }
    section.push('\n');

    section
}

/// List the input files.
fn generate_inputs_section(metadata: &ReportMetadata) -> String {
    if metadata.input_files.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Input Files\n\n");
    for path in &metadata.input_files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        section.push_str(&format!("- `{}`\n", name));
    }
    section.push('\n');

    section
}

/// Generate a JSON report.
pub fn generate_json_report(report: &SummaryReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Render the report in the requested format.
pub fn render_report(report: &SummaryReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => generate_json_report(report),
        OutputFormat::Markdown => Ok(generate_markdown_report(report)),
    }
}

/// Write the report to a file in the requested format.
pub fn write_report(report: &SummaryReport, format: OutputFormat, path: &Path) -> Result<()> {
    let content = render_report(report, format)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    std::fs::write(path, content)
        .with_context(|| format!("Failed to write summary to {}", path.display()))
}

/// Compact fixed-width table for the terminal.
pub fn generate_console_table(rows: &[SummaryRow]) -> String {
    let mut lines = Vec::new();

    lines.push(format!(
        "   {:>6}  {:>4}  {:>20}  {:>20}",
        "nested", "runs", "relay (mean±std)", "claim (mean±std)"
    ));

    for row in rows {
        lines.push(format!(
            "   {:>6}  {:>4}  {:>20}  {:>20}",
            row.nested_messages,
            row.samples,
            row.relay.label(),
            row.claim.label()
        ));
    }

    lines.join("\n")
}
