//! Jupyter notebook generation.
//!
//! The notebook mirrors the HTML report but loads every table from the
//! files in `output/`, so it can be re-run and extended with pandas.

use super::sections::{GeneralSection, Section};
use crate::config::FileFormat;
use crate::error::SummaryResult;
use crate::experiment::{BETAS, EVAL_BY_PREFIX, EVAL_SHORT, MODEL_FIT};
use crate::models::{SummaryReport, SummaryTable};
use serde_json::{json, Value};

/// Generate the notebook as pretty-printed nbformat 4 JSON.
pub fn generate_notebook(report: &SummaryReport) -> SummaryResult<String> {
    let mut cells = vec![
        markdown_cell(&title_markdown(report)),
        code_cell(&setup_code(report.metadata.file_format)),
    ];

    for section in &report.sections {
        cells.push(markdown_cell(&format!("## {}", section.title())));
        match section {
            Section::General(general) => cells.extend(general_cells(report, *general)),
            Section::Custom { content, .. } => cells.push(markdown_cell(content)),
        }
    }

    let notebook = json!({
        "cells": cells,
        "metadata": {
            "kernelspec": {
                "display_name": "Python 3",
                "language": "python",
                "name": "python3"
            },
            "language_info": {
                "name": "python"
            }
        },
        "nbformat": 4,
        "nbformat_minor": 5
    });

    Ok(serde_json::to_string_pretty(&notebook)?)
}

fn title_markdown(report: &SummaryReport) -> String {
    let mut text = format!("# Summary report: {}\n", report.metadata.summary_id);
    if !report.metadata.description.is_empty() {
        text.push_str(&format!("\n{}\n", report.metadata.description));
    }
    text.push_str(&format!(
        "\nGenerated {} from {} experiments.",
        report.metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
        report.metadata.experiment_count
    ));
    text
}

fn setup_code(format: FileFormat) -> String {
    let separator = match format {
        FileFormat::Tsv => "\\t",
        _ => ",",
    };
    format!(
        "from pathlib import Path\n\
         \n\
         import pandas as pd\n\
         from IPython.display import display\n\
         \n\
         output_dir = Path(\"../output\")\n\
         \n\
         def load(name):\n\
         \x20   return pd.read_csv(output_dir / name, sep=\"{}\")",
        separator
    )
}

fn general_cells(report: &SummaryReport, section: GeneralSection) -> Vec<Value> {
    let file_name = |table: &SummaryTable| {
        table.file_name(&report.metadata.summary_id, report.metadata.file_format)
    };

    match section {
        GeneralSection::ExperimentInfo => report
            .table("experiments")
            .map(|t| vec![load_table_cell(&file_name(t))])
            .unwrap_or_default(),
        GeneralSection::Evaluation => report
            .table(EVAL_SHORT)
            .map(|t| vec![load_table_cell(&file_name(t))])
            .unwrap_or_default(),
        GeneralSection::Model => {
            let cells: Vec<Value> = [MODEL_FIT, BETAS]
                .iter()
                .filter_map(|name| report.table(name))
                .map(|t| load_table_cell(&file_name(t)))
                .collect();
            if cells.is_empty() {
                vec![markdown_cell(
                    "None of the summarized experiments include model information.",
                )]
            } else {
                cells
            }
        }
        GeneralSection::SubgroupEvaluation => report
            .tables_with_prefix(EVAL_BY_PREFIX)
            .flat_map(|t| {
                vec![
                    markdown_cell(&format!("### {}", t.title)),
                    load_table_cell(&file_name(t)),
                ]
            })
            .collect(),
        GeneralSection::IntermediateFilePaths => {
            let list: Vec<String> = report
                .intermediate_files
                .iter()
                .map(|f| format!("- `{}`", f))
                .collect();
            vec![markdown_cell(&list.join("\n"))]
        }
        GeneralSection::Sysinfo => vec![code_cell(&format!(
            "import platform\n\
             import sys\n\
             \n\
             print(\"rsmsummarize version: {}\")\n\
             print(\"Python:\", sys.version)\n\
             print(\"Platform:\", platform.platform())\n\
             print(\"pandas:\", pd.__version__)",
            report.metadata.tool_version
        ))],
    }
}

fn load_table_cell(file_name: &str) -> Value {
    code_cell(&format!("display(load({}))", python_string(file_name)))
}

/// Quote text as a Python string literal.
fn python_string(text: &str) -> String {
    Value::from(text).to_string()
}

fn markdown_cell(text: &str) -> Value {
    json!({
        "cell_type": "markdown",
        "metadata": {},
        "source": source_lines(text)
    })
}

fn code_cell(code: &str) -> Value {
    json!({
        "cell_type": "code",
        "execution_count": null,
        "metadata": {},
        "outputs": [],
        "source": source_lines(code)
    })
}

/// Split text into nbformat source lines, keeping line endings.
fn source_lines(text: &str) -> Vec<String> {
    text.split_inclusive('\n').map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReportMetadata;
    use crate::table::Table;
    use chrono::Utc;

    fn create_test_report(format: FileFormat) -> SummaryReport {
        let table = Table::new(vec!["experiment".to_string()]);
        SummaryReport {
            metadata: ReportMetadata {
                summary_id: "sum".to_string(),
                description: String::new(),
                generated_at: Utc::now(),
                tool_version: "1.0.0".to_string(),
                experiment_count: 1,
                file_format: format,
            },
            tables: vec![
                SummaryTable::new("experiments", "Experiments", table.clone()),
                SummaryTable::new(EVAL_SHORT, "Evaluation results", table.clone()),
                SummaryTable::new("eval_by_L1", "Evaluation by L1", table),
            ],
            sections: vec![
                Section::General(GeneralSection::Evaluation),
                Section::General(GeneralSection::SubgroupEvaluation),
                Section::General(GeneralSection::Model),
            ],
            intermediate_files: Vec::new(),
        }
    }

    fn all_sources(notebook: &Value) -> String {
        notebook["cells"]
            .as_array()
            .unwrap()
            .iter()
            .flat_map(|c| c["source"].as_array().unwrap().clone())
            .map(|line| line.as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_notebook_structure() {
        let report = create_test_report(FileFormat::Csv);
        let notebook: Value = serde_json::from_str(&generate_notebook(&report).unwrap()).unwrap();

        assert_eq!(notebook["nbformat"], 4);
        let cells = notebook["cells"].as_array().unwrap();
        assert_eq!(cells[0]["cell_type"], "markdown");
        assert_eq!(cells[1]["cell_type"], "code");

        let sources = all_sources(&notebook);
        assert!(sources.contains("# Summary report: sum"));
        assert!(sources.contains("display(load(\"sum_eval_short.csv\"))"));
        assert!(sources.contains("### Evaluation by L1"));
        assert!(sources.contains("display(load(\"sum_eval_by_L1.csv\"))"));
        assert!(sources.contains("None of the summarized experiments include model information."));
        assert!(sources.contains("sep=\",\""));
    }

    #[test]
    fn test_notebook_tsv_separator() {
        let report = create_test_report(FileFormat::Tsv);
        let notebook: Value = serde_json::from_str(&generate_notebook(&report).unwrap()).unwrap();
        let sources = all_sources(&notebook);

        assert!(sources.contains("sep=\"\\t\""));
        assert!(sources.contains("sum_eval_short.tsv"));
    }

    #[test]
    fn test_file_names_are_quoted() {
        assert_eq!(
            load_table_cell("a\"b\\c_eval_short.csv")["source"][0],
            "display(load(\"a\\\"b\\\\c_eval_short.csv\"))"
        );
    }

    #[test]
    fn test_source_lines_keep_newlines() {
        assert_eq!(source_lines("a\nb"), vec!["a\n", "b"]);
    }
}
