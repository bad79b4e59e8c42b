//! Experiment discovery and validation.
//!
//! Each directory listed in the summary configuration must hold the
//! `output/` folder of one or more finished rsmtool/rsmeval runs. This
//! module finds their saved configurations, works out the format of
//! their intermediate files, and checks that the mandatory files exist.

use crate::config::{parse_json_with_comments, FileFormat, SummaryConfig};
use crate::error::{SummaryError, SummaryResult};
use crate::models::{ExperimentRecord, Tool};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Suffix of the mandatory evaluation file.
pub const EVAL_SHORT: &str = "eval_short";
/// Suffix of the model-fit statistics file (rsmtool only).
pub const MODEL_FIT: &str = "model_fit";
/// Suffix of the standardized coefficients file (rsmtool only).
pub const BETAS: &str = "betas";
/// Prefix of the per-subgroup evaluation files.
pub const EVAL_BY_PREFIX: &str = "eval_by_";

/// Reads the experiments named by a summary configuration.
pub struct ExperimentReader<'a> {
    config: &'a SummaryConfig,
    show_progress: bool,
}

impl<'a> ExperimentReader<'a> {
    pub fn new(config: &'a SummaryConfig, show_progress: bool) -> Self {
        Self {
            config,
            show_progress,
        }
    }

    /// Locate and validate every experiment, in configuration order.
    pub fn read_all(&self) -> SummaryResult<Vec<ExperimentRecord>> {
        let progress_bar = if self.show_progress {
            let pb = ProgressBar::new(self.config.experiment_dirs.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            Some(pb)
        } else {
            None
        };

        let mut experiments = Vec::new();
        let mut seen_ids = HashSet::new();

        for (index, dir) in self.config.experiment_dirs.iter().enumerate() {
            if let Some(ref pb) = progress_bar {
                pb.set_message(dir.clone());
            }

            let experiment_dir = self.config.resolve_path(dir);
            let name = self.config.experiment_name(index);

            for json_path in find_experiment_configs(&experiment_dir, name.is_some())? {
                let record = load_experiment(&json_path, &experiment_dir, name)?;
                if !seen_ids.insert(record.id.clone()) {
                    return Err(SummaryError::DuplicateExperiment(record.id));
                }
                info!(
                    "Found {} experiment '{}' in {}",
                    record.tool,
                    record.id,
                    experiment_dir.display()
                );
                experiments.push(record);
            }

            if let Some(ref pb) = progress_bar {
                pb.inc(1);
            }
        }

        if let Some(pb) = progress_bar {
            pb.finish_with_message("Experiments loaded");
        }

        Ok(experiments)
    }
}

/// Find the saved experiment configurations in `<dir>/output/`.
///
/// `named` is true when the user gave this directory an explicit name, in
/// which case the directory must hold exactly one experiment.
pub fn find_experiment_configs(dir: &Path, named: bool) -> SummaryResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(SummaryError::ExperimentDirNotFound(dir.to_path_buf()));
    }

    let output_dir = dir.join("output");
    if !output_dir.is_dir() {
        return Err(SummaryError::MissingOutputDir(dir.to_path_buf()));
    }

    let jsons: Vec<PathBuf> = list_files(&output_dir)
        .into_iter()
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("json"))
        })
        .collect();

    if jsons.is_empty() {
        return Err(SummaryError::MissingExperimentConfig(dir.to_path_buf()));
    }
    if named && jsons.len() > 1 {
        return Err(SummaryError::AmbiguousExperimentNames(dir.to_path_buf()));
    }

    debug!("{} experiment config(s) in {}", jsons.len(), output_dir.display());
    Ok(jsons)
}

/// Load one experiment from its saved configuration.
pub fn load_experiment(
    json_path: &Path,
    experiment_dir: &Path,
    name: Option<&str>,
) -> SummaryResult<ExperimentRecord> {
    let config = match parse_json_with_comments(json_path)? {
        Value::Object(map) => map,
        _ => {
            return Err(SummaryError::InvalidField(format!(
                "{} is not a JSON object",
                json_path.display()
            )))
        }
    };

    let id = config
        .get("experiment_id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            SummaryError::MissingField(format!("experiment_id ({})", json_path.display()))
        })?;

    let tool = detect_tool(json_path, &config);
    let output_dir = experiment_dir.join("output");
    let file_format = detect_file_format(&output_dir, &id)?;

    let use_scaled_predictions = match tool {
        Tool::Rsmtool => config
            .get("use_scaled_predictions")
            .map(is_truthy)
            .unwrap_or(false),
        Tool::Rsmeval => config.get("scale_with").is_some_and(|v| !v.is_null()),
    };

    let record = ExperimentRecord {
        name: name.map(str::to_string).unwrap_or_else(|| id.clone()),
        description: config
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        model: config
            .get("model")
            .and_then(Value::as_str)
            .map(str::to_string),
        id,
        tool,
        dir: experiment_dir.to_path_buf(),
        output_dir,
        file_format,
        use_scaled_predictions,
        config,
    };

    let eval_short = record.intermediate_path(EVAL_SHORT);
    if !eval_short.is_file() {
        return Err(SummaryError::MissingIntermediateFile {
            experiment: record.id,
            path: eval_short,
        });
    }

    Ok(record)
}

/// Work out which tool saved this configuration.
fn detect_tool(json_path: &Path, config: &Map<String, Value>) -> Tool {
    let file_name = json_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();

    if file_name.ends_with("_rsmeval.json") {
        Tool::Rsmeval
    } else if file_name.ends_with("_rsmtool.json") || config.contains_key("model") {
        Tool::Rsmtool
    } else {
        Tool::Rsmeval
    }
}

/// Detect the extension shared by an experiment's intermediate files.
pub fn detect_file_format(output_dir: &Path, experiment_id: &str) -> SummaryResult<FileFormat> {
    let prefix = format!("{}_", experiment_id);

    let formats: BTreeSet<&'static str> = list_files(output_dir)
        .iter()
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(&prefix))
        })
        .filter_map(|p| p.extension().and_then(|e| e.to_str()))
        .filter_map(FileFormat::from_extension)
        .map(|f| f.extension())
        .collect();

    match formats.len() {
        0 => Err(SummaryError::MissingIntermediateFile {
            experiment: experiment_id.to_string(),
            path: output_dir.join(format!("{}{}.csv", prefix, EVAL_SHORT)),
        }),
        1 => {
            let format = formats
                .iter()
                .next()
                .and_then(|ext| FileFormat::from_extension(ext))
                .unwrap_or_default();
            if format == FileFormat::Xlsx {
                return Err(SummaryError::UnsupportedFileFormat("xlsx".to_string()));
            }
            Ok(format)
        }
        _ => Err(SummaryError::MixedFileFormats {
            experiment: experiment_id.to_string(),
            formats: formats.into_iter().collect::<Vec<_>>().join(", "),
        }),
    }
}

/// Files directly inside `dir`, sorted by name.
fn list_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect()
}

/// Interpret a JSON value written by the producing tool as a flag.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }
}
