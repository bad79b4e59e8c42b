//! HTML report generation.
//!
//! This module renders the summary report as a single self-contained
//! HTML page from the aggregated tables.

use super::sections::{GeneralSection, Section};
use crate::experiment::{BETAS, EVAL_BY_PREFIX, EVAL_SHORT, MODEL_FIT};
use crate::models::{ReportMetadata, SummaryReport, SummaryTable};
use crate::table::Table;

const STYLE: &str = "body { font-family: sans-serif; margin: 2em auto; max-width: 1100px; }\n\
table { border-collapse: collapse; margin-bottom: 1.5em; }\n\
th, td { border: 1px solid #ccc; padding: 4px 8px; text-align: right; }\n\
th:first-child, td:first-child { text-align: left; }\n\
caption { font-weight: bold; text-align: left; padding-bottom: 4px; }\n";

/// Generate the complete HTML report.
pub fn generate_html_report(report: &SummaryReport) -> String {
    let mut output = String::new();

    output.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    output.push_str("<meta charset=\"utf-8\">\n");
    output.push_str(&format!(
        "<title>Summary report: {}</title>\n",
        escape_html(&report.metadata.summary_id)
    ));
    output.push_str(&format!("<style>\n{}</style>\n", STYLE));
    output.push_str("</head>\n<body>\n");

    output.push_str(&format!(
        "<h1>Summary report: {}</h1>\n",
        escape_html(&report.metadata.summary_id)
    ));

    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_table_of_contents(&report.sections));

    for section in &report.sections {
        output.push_str(&generate_section(report, section));
    }

    output.push_str(&generate_footer());
    output.push_str("</body>\n</html>\n");

    output
}

fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("<ul class=\"metadata\">\n");
    if !metadata.description.is_empty() {
        section.push_str(&format!(
            "<li><strong>Description:</strong> {}</li>\n",
            escape_html(&metadata.description)
        ));
    }
    section.push_str(&format!(
        "<li><strong>Experiments:</strong> {}</li>\n",
        metadata.experiment_count
    ));
    section.push_str(&format!(
        "<li><strong>Generated:</strong> {}</li>\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str("</ul>\n");

    section
}

fn generate_table_of_contents(sections: &[Section]) -> String {
    let mut toc = String::new();

    toc.push_str("<h2>Contents</h2>\n<ul class=\"toc\">\n");
    for section in sections {
        toc.push_str(&format!(
            "<li><a href=\"#{}\">{}</a></li>\n",
            section.anchor(),
            escape_html(&section.title())
        ));
    }
    toc.push_str("</ul>\n");

    toc
}

fn generate_section(report: &SummaryReport, section: &Section) -> String {
    let mut output = format!(
        "<h2 id=\"{}\">{}</h2>\n",
        section.anchor(),
        escape_html(&section.title())
    );

    let body = match section {
        Section::General(general) => generate_general_section(report, *general),
        Section::Custom { content, .. } => format!("{}\n", content.trim_end()),
    };
    output.push_str(&body);

    output
}

fn generate_general_section(report: &SummaryReport, section: GeneralSection) -> String {
    match section {
        GeneralSection::ExperimentInfo => report
            .table("experiments")
            .map(render_summary_table)
            .unwrap_or_default(),
        GeneralSection::Evaluation => generate_evaluation_section(report),
        GeneralSection::Model => generate_model_section(report),
        GeneralSection::SubgroupEvaluation => generate_subgroup_section(report),
        GeneralSection::IntermediateFilePaths => {
            generate_file_paths_section(&report.intermediate_files)
        }
        GeneralSection::Sysinfo => generate_sysinfo_section(&report.metadata),
    }
}

fn generate_evaluation_section(report: &SummaryReport) -> String {
    let mut section = String::from(
        "<p>Headline evaluation metrics for each experiment, computed on trimmed \
         predictions (scaled where the experiment used scaled predictions).</p>\n",
    );
    if let Some(table) = report.table(EVAL_SHORT) {
        section.push_str(&render_summary_table(table));
    }
    section
}

fn generate_model_section(report: &SummaryReport) -> String {
    let model_fit = report.table(MODEL_FIT);
    let betas = report.table(BETAS);

    if model_fit.is_none() && betas.is_none() {
        return "<p>None of the summarized experiments include model information.</p>\n"
            .to_string();
    }

    let mut section = String::new();
    if let Some(table) = model_fit {
        section.push_str(&render_summary_table(table));
    }
    if let Some(table) = betas {
        section.push_str(&render_summary_table(table));
    }
    section
}

fn generate_subgroup_section(report: &SummaryReport) -> String {
    let mut section = String::new();
    for table in report.tables_with_prefix(EVAL_BY_PREFIX) {
        section.push_str(&render_summary_table(table));
    }
    if section.is_empty() {
        section.push_str("<p>None of the summarized experiments include subgroup evaluations.</p>\n");
    }
    section
}

fn generate_file_paths_section(files: &[String]) -> String {
    let mut section = String::from("<p>Tables written by this summary:</p>\n<ul>\n");
    for file in files {
        section.push_str(&format!("<li><code>{}</code></li>\n", escape_html(file)));
    }
    section.push_str("</ul>\n");
    section
}

fn generate_sysinfo_section(metadata: &ReportMetadata) -> String {
    let mut section = String::from("<ul>\n");
    section.push_str(&format!(
        "<li>rsmsummarize version: {}</li>\n",
        escape_html(&metadata.tool_version)
    ));
    section.push_str(&format!(
        "<li>Platform: {} ({})</li>\n",
        std::env::consts::OS,
        std::env::consts::ARCH
    ));
    section.push_str(&format!(
        "<li>Intermediate file format: {}</li>\n",
        metadata.file_format
    ));
    section.push_str("</ul>\n");
    section
}

fn generate_footer() -> String {
    "<hr>\n<p><em>Report generated by rsmsummarize</em></p>\n".to_string()
}

fn render_summary_table(table: &SummaryTable) -> String {
    if table.table.is_empty() {
        return format!("<p>{}: no rows.</p>\n", escape_html(&table.title));
    }
    render_table(&table.table, &table.title)
}

/// Render a table as HTML, rounding numeric cells.
pub fn render_table(table: &Table, caption: &str) -> String {
    let mut html = String::from("<table>\n");
    html.push_str(&format!("<caption>{}</caption>\n", escape_html(caption)));

    html.push_str("<thead><tr>");
    for header in &table.headers {
        html.push_str(&format!("<th>{}</th>", escape_html(header)));
    }
    html.push_str("</tr></thead>\n<tbody>\n");

    for row in &table.rows {
        html.push_str("<tr>");
        for cell in row {
            html.push_str(&format!("<td>{}</td>", escape_html(&format_cell(cell))));
        }
        html.push_str("</tr>\n");
    }

    html.push_str("</tbody>\n</table>\n");
    html
}

/// Round non-integer numbers to three decimals; leave everything else.
pub fn format_cell(cell: &str) -> String {
    if cell.is_empty() || cell.parse::<i64>().is_ok() {
        return cell.to_string();
    }
    match cell.parse::<f64>() {
        Ok(value) if value.is_finite() => format!("{:.3}", value),
        _ => cell.to_string(),
    }
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
