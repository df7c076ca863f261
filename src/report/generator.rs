//! Markdown and JSON report generation.
//!
//! Charts are drawn as text bars so the report reads well both in a
//! terminal and in a Markdown viewer.

use crate::cli::OutputFormat;
use crate::models::{BillPreview, MonthlyCount, PartyCounts, Report, ReportMetadata, SampleMode};
use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

const API_DOCS_URL: &str = "https://dadosabertos.camara.leg.br/swagger/api.html";
const EXAMPLE_BILL_ID: u64 = 257161;
const SUMMARY_MAX_CHARS: usize = 120;

/// Options that shape the rendered report.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Width in characters of the longest bar.
    pub bar_width: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self { bar_width: 40 }
    }
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report, options: &RenderOptions) -> String {
    let mut output = String::new();

    output.push_str("# Bills Presented to the Chamber of Deputies\n\n");

    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_table_of_contents(report));
    output.push_str(&generate_monthly_section(&report.monthly, options));
    output.push_str(&generate_party_section(&report.parties, options));
    output.push_str(&generate_preview_section(&report.preview));
    output.push_str(&generate_warnings_section(&report.warnings));
    output.push_str(&generate_links_section(&report.metadata.source));
    output.push_str(&generate_footer());

    output
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Source:** {}\n", metadata.source));
    section.push_str(&format!(
        "- **Period:** {} to {}\n",
        metadata.start_year, metadata.end_year
    ));
    section.push_str(&format!("- **Bills Collected:** {}\n", metadata.bills_collected));
    section.push_str(&format!(
        "- **Party Chart Based On:** {} ({} bills)\n",
        metadata.sample_mode, metadata.bills_sampled
    ));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Duration:** {:.1}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

/// Generate the table of contents.
fn generate_table_of_contents(report: &Report) -> String {
    let mut toc = String::new();

    toc.push_str("## Table of Contents\n\n");
    toc.push_str("- [Metadata](#metadata)\n");
    toc.push_str("- [Bills per Month](#bills-per-month)\n");
    toc.push_str("- [Bills by Author Party](#bills-by-author-party)\n");
    toc.push_str("- [Sample of Collected Bills](#sample-of-collected-bills)\n");
    if !report.warnings.is_empty() {
        toc.push_str("- [Warnings](#warnings)\n");
    }
    toc.push_str("- [Official API Links](#official-api-links)\n");
    toc.push('\n');

    toc
}

/// Generate the per-month time series.
fn generate_monthly_section(monthly: &[MonthlyCount], options: &RenderOptions) -> String {
    let mut section = String::new();

    section.push_str("## Bills per Month\n\n");

    if monthly.is_empty() {
        section.push_str("No bill carried a usable presentation date.\n\n");
        return section;
    }

    let max = monthly.iter().map(|m| m.bills).max().unwrap_or(0);

    section.push_str("| Month | Bills | |\n");
    section.push_str("|:---|---:|:---|\n");
    for month in monthly {
        section.push_str(&format!(
            "| {} | {} | {} |\n",
            month.year_month,
            month.bills,
            text_bar(month.bills, max, options.bar_width)
        ));
    }
    section.push('\n');
    section.push_str("*Months are taken from each bill's presentation date.*\n\n");

    section
}

/// Generate the per-party chart, or the guidance shown when it is empty.
fn generate_party_section(parties: &PartyCounts, options: &RenderOptions) -> String {
    let mut section = String::new();

    section.push_str("## Bills by Author Party\n\n");

    if parties.is_empty() {
        section.push_str(
            "> ⚠️ Could not determine any party (authors not found or API limits reached). \
             Try again with `--all` and/or a shorter year range.\n\n",
        );
        return section;
    }

    let max = parties.iter().map(|p| p.authors).max().unwrap_or(0);

    section.push_str("| Party | Authors | |\n");
    section.push_str("|:---|---:|:---|\n");
    for party in parties.iter() {
        section.push_str(&format!(
            "| {} | {} | {} |\n",
            party.party,
            party.authors,
            text_bar(party.authors, max, options.bar_width)
        ));
    }
    section.push('\n');
    section.push_str(&format!(
        "*{} parliamentary author occurrences across {} parties. Each bill's parliamentary \
         authors are looked up in `/deputados/{{id}}` (`ultimoStatus.siglaPartido`).*\n\n",
        parties.total(),
        parties.len()
    ));

    section
}

/// Generate the sample table.
fn generate_preview_section(preview: &[BillPreview]) -> String {
    let mut section = String::new();

    section.push_str("## Sample of Collected Bills\n\n");
    section.push_str("| ID | Type | Number | Year | Summary |\n");
    section.push_str("|---:|:---|---:|---:|:---|\n");

    for row in preview {
        section.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            row.id,
            row.type_code,
            row.number.map(|n| n.to_string()).unwrap_or_default(),
            row.year.map(|y| y.to_string()).unwrap_or_default(),
            table_cell(&row.summary)
        ));
    }
    section.push('\n');

    section
}

/// Generate the warnings section.
fn generate_warnings_section(warnings: &[String]) -> String {
    if warnings.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Warnings\n\n");
    section.push_str("Some requests failed; the figures above may be partial.\n\n");
    for warning in warnings {
        section.push_str(&format!("- {}\n", warning));
    }
    section.push('\n');

    section
}

fn generate_links_section(source: &str) -> String {
    let mut section = String::new();

    section.push_str("## Official API Links\n\n");
    section.push_str(&format!("- Documentation: {}\n", API_DOCS_URL));
    section.push_str(&format!(
        "- Example bill: {}/proposicoes/{}\n",
        source.trim_end_matches('/'),
        EXAMPLE_BILL_ID
    ));
    section.push('\n');

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    "---\n\n*Report generated by plscope*\n".to_string()
}

/// Render the report in `format` and write it to `path`.
pub fn write_report(
    report: &Report,
    format: OutputFormat,
    options: &RenderOptions,
    path: &Path,
) -> Result<()> {
    let content = match format {
        OutputFormat::Json => generate_json_report(report)?,
        OutputFormat::Markdown => generate_markdown_report(report, options),
    };

    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;
    file.write_all(content.as_bytes())?;

    Ok(())
}

/// Bar proportional to `value / max`, at least one block for non-zero values.
pub fn text_bar(value: usize, max: usize, width: usize) -> String {
    if value == 0 || max == 0 || width == 0 {
        return String::new();
    }

    let len = ((value as f64 / max as f64) * width as f64).round() as usize;
    "█".repeat(len.clamp(1, width))
}

/// Make free text safe for a single Markdown table cell.
fn table_cell(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let escaped = flat.replace('|', "\\|");

    if escaped.chars().count() > SUMMARY_MAX_CHARS {
        let cut: String = escaped.chars().take(SUMMARY_MAX_CHARS - 1).collect();
        format!("{}…", cut.trim_end())
    } else {
        escaped
    }
}

/// Mode label used in progress messages.
pub fn describe_sample(mode: SampleMode, sampled: usize, collected: usize) -> String {
    match mode {
        SampleMode::All => format!("all {} bills", collected),
        SampleMode::Sample => format!("the first {} of {} bills", sampled, collected),
    }
}
