//! Output directory layout.
//!
//! A summary writes into three sub-directories of the output directory:
//! `report/`, `output/`, and `figure/`. Nothing else in the output
//! directory is touched.

use crate::config::FileFormat;
use crate::error::{SummaryError, SummaryResult};
use crate::models::SummaryTable;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Sub-directories managed by a summary run.
pub const SUBDIRECTORIES: [&str; 3] = ["report", "output", "figure"];

/// A prepared output directory.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Create the output layout under `root`.
    ///
    /// Fails without modifying anything if a managed sub-directory already
    /// has contents and `force` is false, or if it holds any of the
    /// `protected` directories. With `force`, the managed sub-directories
    /// are emptied first.
    pub fn prepare(root: &Path, force: bool, protected: &[PathBuf]) -> SummaryResult<Self> {
        let protected: Vec<PathBuf> = protected
            .iter()
            .map(|p| p.canonicalize().unwrap_or_else(|_| p.clone()))
            .collect();

        for name in SUBDIRECTORIES {
            let dir = root.join(name);
            if let Ok(canonical) = dir.canonicalize() {
                if let Some(inside) = protected.iter().find(|p| p.starts_with(&canonical)) {
                    return Err(SummaryError::OutputOverlapsExperiment(
                        dir,
                        inside.to_path_buf(),
                    ));
                }
            }
            if is_non_empty(&dir)? {
                if !force {
                    return Err(SummaryError::OutputNotEmpty(
                        root.to_path_buf(),
                        name.to_string(),
                    ));
                }
                info!("Overwriting contents of {}", dir.display());
            }
        }

        for name in SUBDIRECTORIES {
            let dir = root.join(name);
            if force && dir.is_dir() {
                fs::remove_dir_all(&dir)?;
            }
            fs::create_dir_all(&dir)?;
            debug!("Prepared {}", dir.display());
        }

        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn report_dir(&self) -> PathBuf {
        self.root.join("report")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join("output")
    }

    pub fn figure_dir(&self) -> PathBuf {
        self.root.join("figure")
    }

    /// Write an aggregated table into `output/`.
    ///
    /// Returns the path relative to the workspace root.
    pub fn write_table(
        &self,
        summary_id: &str,
        table: &SummaryTable,
        format: FileFormat,
    ) -> SummaryResult<String> {
        let file_name = table.file_name(summary_id, format);
        let path = self.output_dir().join(&file_name);
        table.table.write(&path, format)?;

        debug!("Wrote {} ({} rows)", path.display(), table.table.len());
        Ok(format!("output/{}", file_name))
    }
}

fn is_non_empty(dir: &Path) -> SummaryResult<bool> {
    if !dir.is_dir() {
        return Ok(false);
    }
    Ok(fs::read_dir(dir)?.next().is_some())
}
