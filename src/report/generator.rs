//! Report rendering.
//!
//! This module renders a [`Report`] as the HTML table served to the
//! report page, as a standalone HTML document, as Markdown, or as JSON.

use crate::models::{Classification, ClassifiedRow, Report, ReportMetadata, ReportSummary};
use anyhow::Result;

const TEXT_STYLE: &str = "color: black;";

/// Generate the HTML table fragment for the report page.
///
/// The output ends with `</table>`; nothing follows it.
pub fn generate_html_table(rows: &[ClassifiedRow]) -> String {
    let mut output = String::new();

    output.push_str("<table class=\"wp-list-table widefat fixed striped plugin-report\">");
    output.push_str(
        "<thead><tr><th>Plugin Name</th><th>Last Updated</th><th>Information</th></tr></thead>",
    );
    output.push_str("<tbody>");

    for row in rows {
        output.push_str(&generate_html_row(row));
    }

    output.push_str("</tbody>");
    output.push_str("</table>");

    output
}

/// Generate a single table row.
fn generate_html_row(row: &ClassifiedRow) -> String {
    let status = row.classification.as_str();
    let style = match row_background(row.classification) {
        Some(color) => format!(" style=\"background-color: {}; {}\"", color, TEXT_STYLE),
        None => String::new(),
    };

    format!(
        "<tr class=\"{status}\" data-status=\"{status}\"{style}>\
         <td style=\"{text}\">{name}</td>\
         <td style=\"{text}\">{updated}</td>\
         <td style=\"{text}\">{info}</td></tr>",
        status = status,
        style = style,
        text = TEXT_STYLE,
        name = escape_html(&row.row.name),
        updated = escape_html(&row.row.last_updated.to_string()),
        info = escape_html(&row.information),
    )
}

fn row_background(classification: Classification) -> Option<&'static str> {
    match classification {
        Classification::Stale => Some("red"),
        Classification::Indeterminate => Some("yellow"),
        Classification::Current => None,
    }
}

/// Generate a standalone HTML document around the report table.
pub fn generate_html_document(report: &Report) -> String {
    let mut output = String::new();

    output.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    output.push_str("<meta charset=\"utf-8\">\n");
    output.push_str("<title>Plugin List by Update Date</title>\n");
    output.push_str("</head>\n<body>\n<div class=\"wrap\">\n");
    output.push_str("<h1>Plugin List by Update Date</h1>\n");

    let metadata = &report.metadata;
    output.push_str(&format!(
        "<p>Generated {} from <code>{}</code> against <code>{}</code>.</p>\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
        escape_html(&metadata.plugins_dir),
        escape_html(&metadata.registry_url),
    ));
    output.push_str(&format!(
        "<p>{} plugins: {} stale, {} indeterminate, {} current.</p>\n",
        report.summary.total,
        report.summary.stale,
        report.summary.indeterminate,
        report.summary.current,
    ));

    output.push_str(&generate_html_table(&report.rows));
    output.push_str("\n</div>\n</body>\n</html>\n");

    output
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report) -> String {
    let mut output = String::new();

    output.push_str("# Plugin List by Update Date\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_summary_section(&report.summary));
    output.push_str(&generate_plugins_section(&report.rows));

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Plugins Directory:** `{}`\n", metadata.plugins_dir));
    section.push_str(&format!("- **Registry:** {}\n", metadata.registry_url));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Stale After:** {} days\n",
        metadata.stale_days
    ));
    section.push_str(&format!(
        "- **Plugins Discovered:** {}\n",
        metadata.plugins_discovered
    ));
    if metadata.plugins_skipped > 0 {
        section.push_str(&format!(
            "- **Plugins Skipped:** {}\n",
            metadata.plugins_skipped
        ));
    }
    section.push_str(&format!(
        "- **Duration:** {:.1}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

/// Generate the summary section.
fn generate_summary_section(summary: &ReportSummary) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    section.push_str(&format!(
        "| {} Stale | {} Indeterminate | {} Current | **Total** |\n",
        Classification::Stale.emoji(),
        Classification::Indeterminate.emoji(),
        Classification::Current.emoji(),
    ));
    section.push_str("|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | **{}** |\n\n",
        summary.stale, summary.indeterminate, summary.current, summary.total
    ));

    section
}

/// Generate the plugin table section.
fn generate_plugins_section(rows: &[ClassifiedRow]) -> String {
    let mut section = String::new();

    section.push_str("## Plugins\n\n");

    if rows.is_empty() {
        section.push_str("No plugins could be checked.\n");
        return section;
    }

    section.push_str("| | Plugin Name | Last Updated | Information |\n");
    section.push_str("|:---:|:---|:---|:---|\n");

    for row in rows {
        section.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            row.classification.emoji(),
            escape_markdown_cell(&row.row.name),
            escape_markdown_cell(&row.row.last_updated.to_string()),
            escape_markdown_cell(&row.information),
        ));
    }

    section
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Escape text for HTML element content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());

    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }

    escaped
}

fn escape_markdown_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}
