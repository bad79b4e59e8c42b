//! Report rendering.
//!
//! The summary report is written twice: as a static HTML page and as a
//! Jupyter notebook that reloads the same tables from `output/`.

pub mod generator;
pub mod notebook;
pub mod sections;

pub use generator::generate_html_report;
pub use notebook::generate_notebook;
pub use sections::{resolve_sections, Section};

use crate::error::SummaryResult;
use crate::models::SummaryReport;
use std::path::{Path, PathBuf};
use tracing::info;

/// Paths of the rendered report files.
#[derive(Debug, Clone)]
pub struct ReportFiles {
    pub html: PathBuf,
    pub notebook: PathBuf,
}

/// Write both report files into `report_dir`.
pub fn write_report(report: &SummaryReport, report_dir: &Path) -> SummaryResult<ReportFiles> {
    let stem = format!("{}_report", report.metadata.summary_id);

    let html = report_dir.join(format!("{}.html", stem));
    std::fs::write(&html, generate_html_report(report))?;
    info!("Wrote HTML report to {}", html.display());

    let notebook = report_dir.join(format!("{}.ipynb", stem));
    std::fs::write(&notebook, generate_notebook(report)?)?;
    info!("Wrote notebook to {}", notebook.display());

    Ok(ReportFiles { html, notebook })
}
