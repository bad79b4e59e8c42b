//! Data models for the summary.
//!
//! This module contains the core data structures shared by the reader,
//! the aggregator, and the report generators.

use crate::config::FileFormat;
use crate::table::Table;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::PathBuf;

/// Tool that produced an experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    /// Model trained and evaluated by rsmtool.
    Rsmtool,
    /// Externally produced predictions evaluated by rsmeval.
    Rsmeval,
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tool::Rsmtool => write!(f, "rsmtool"),
            Tool::Rsmeval => write!(f, "rsmeval"),
        }
    }
}

/// A prior experiment whose outputs are being summarized.
#[derive(Debug, Clone)]
pub struct ExperimentRecord {
    /// The experiment's own `experiment_id`.
    pub id: String,
    /// Name shown in the report.
    pub name: String,
    pub description: String,
    pub tool: Tool,
    /// Model name, for rsmtool experiments.
    pub model: Option<String>,
    /// Experiment directory as resolved from the summary configuration.
    pub dir: PathBuf,
    /// The experiment's `output/` directory.
    pub output_dir: PathBuf,
    /// Format of the experiment's intermediate files.
    pub file_format: FileFormat,
    /// Whether evaluations should use the scaled predictions.
    pub use_scaled_predictions: bool,
    /// The experiment configuration as saved by the producing tool.
    pub config: Map<String, Value>,
}

impl ExperimentRecord {
    /// Path of the intermediate file with the given suffix.
    pub fn intermediate_path(&self, suffix: &str) -> PathBuf {
        self.output_dir.join(format!(
            "{}_{}.{}",
            self.id,
            suffix,
            self.file_format.extension()
        ))
    }

    /// A field of the experiment configuration rendered as text.
    pub fn config_value(&self, key: &str) -> String {
        match self.config.get(key) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }

    /// Label of the `eval_short` row holding this experiment's headline metrics.
    pub fn score_type(&self) -> &'static str {
        if self.use_scaled_predictions {
            "scale_trim"
        } else {
            "raw_trim"
        }
    }
}

/// Metric values keyed by experiment, in experiment order.
///
/// Experiments keep the order in which they were added; metrics keep the
/// order in which they were first seen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComparisonTable {
    experiments: Vec<String>,
    metrics: IndexMap<String, IndexMap<String, String>>,
}

impl ComparisonTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an experiment column, even if it ends up without values.
    pub fn add_experiment(&mut self, experiment: &str) {
        if !self.experiments.iter().any(|e| e == experiment) {
            self.experiments.push(experiment.to_string());
        }
    }

    /// Record a metric value for an experiment.
    pub fn insert(&mut self, metric: &str, experiment: &str, value: &str) {
        self.add_experiment(experiment);
        self.metrics
            .entry(metric.to_string())
            .or_default()
            .insert(experiment.to_string(), value.to_string());
    }

    pub fn value(&self, metric: &str, experiment: &str) -> Option<&str> {
        self.metrics
            .get(metric)
            .and_then(|values| values.get(experiment))
            .map(String::as_str)
    }

    pub fn experiments(&self) -> &[String] {
        &self.experiments
    }

    pub fn metrics(&self) -> impl Iterator<Item = &str> {
        self.metrics.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// One row per experiment, one column per metric.
    pub fn by_experiment(&self, key_label: &str) -> Table {
        let mut headers = vec![key_label.to_string()];
        headers.extend(self.metrics.keys().cloned());

        let mut table = Table::new(headers);
        for experiment in &self.experiments {
            let mut row = vec![experiment.clone()];
            row.extend(self.metrics.keys().map(|metric| {
                self.value(metric, experiment).unwrap_or_default().to_string()
            }));
            table.push_row(row);
        }
        table
    }

    /// One row per metric, one column per experiment.
    pub fn by_metric(&self, key_label: &str) -> Table {
        let mut headers = vec![key_label.to_string()];
        headers.extend(self.experiments.iter().cloned());

        let mut table = Table::new(headers);
        for (metric, values) in &self.metrics {
            let mut row = vec![metric.clone()];
            row.extend(
                self.experiments
                    .iter()
                    .map(|e| values.get(e).cloned().unwrap_or_default()),
            );
            table.push_row(row);
        }
        table
    }
}

/// An aggregated table ready to be written and rendered.
#[derive(Debug, Clone)]
pub struct SummaryTable {
    /// File-name suffix, e.g. `eval_short`.
    pub name: String,
    /// Human-readable caption.
    pub title: String,
    pub table: Table,
}

impl SummaryTable {
    pub fn new(name: impl Into<String>, title: impl Into<String>, table: Table) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            table,
        }
    }

    /// File name of this table inside `output/`.
    pub fn file_name(&self, summary_id: &str, format: FileFormat) -> String {
        format!("{}_{}.{}", summary_id, self.name, format.extension())
    }
}

/// Metadata about the summary report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub summary_id: String,
    pub description: String,
    /// Date and time the report was generated.
    pub generated_at: DateTime<Utc>,
    pub tool_version: String,
    pub experiment_count: usize,
    /// Format of the tables in `output/`.
    pub file_format: FileFormat,
}

/// Everything the report generators need.
#[derive(Debug, Clone)]
pub struct SummaryReport {
    pub metadata: ReportMetadata,
    pub tables: Vec<SummaryTable>,
    pub sections: Vec<crate::report::Section>,
    /// Files written to `output/`, relative to the output directory.
    pub intermediate_files: Vec<String>,
}

impl SummaryReport {
    /// Look up an aggregated table by name.
    pub fn table(&self, name: &str) -> Option<&SummaryTable> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Tables whose name starts with the given prefix, in order.
    pub fn tables_with_prefix<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = &'a SummaryTable> + 'a {
        self.tables.iter().filter(move |t| t.name.starts_with(prefix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comparison_table_keeps_experiment_order() {
        let mut table = ComparisonTable::new();
        table.insert("corr", "exp_b", "0.7");
        table.insert("corr", "exp_a", "0.8");
        table.insert("QWK", "exp_a", "0.75");

        assert_eq!(table.experiments(), &["exp_b", "exp_a"]);
        assert_eq!(table.metrics().collect::<Vec<_>>(), vec!["corr", "QWK"]);
        assert_eq!(table.value("QWK", "exp_b"), None);
        assert_eq!(table.value("corr", "exp_a"), Some("0.8"));
    }

    #[test]
    fn test_comparison_table_layouts() {
        let mut table = ComparisonTable::new();
        table.add_experiment("exp1");
        table.add_experiment("exp2");
        table.insert("feature_a", "exp1", "0.5");
        table.insert("feature_b", "exp2", "-0.1");

        let rows = table.by_experiment("experiment");
        assert_eq!(rows.headers, vec!["experiment", "feature_a", "feature_b"]);
        assert_eq!(rows.rows[0], vec!["exp1", "0.5", ""]);
        assert_eq!(rows.rows[1], vec!["exp2", "", "-0.1"]);

        let columns = table.by_metric("feature");
        assert_eq!(columns.headers, vec!["feature", "exp1", "exp2"]);
        assert_eq!(columns.rows[0], vec!["feature_a", "0.5", ""]);
        assert_eq!(columns.rows[1], vec!["feature_b", "", "-0.1"]);
    }

    #[test]
    fn test_score_type() {
        let mut record = ExperimentRecord {
            id: "exp".to_string(),
            name: "exp".to_string(),
            description: String::new(),
            tool: Tool::Rsmtool,
            model: None,
            dir: PathBuf::from("/exp"),
            output_dir: PathBuf::from("/exp/output"),
            file_format: FileFormat::Tsv,
            use_scaled_predictions: false,
            config: Map::new(),
        };
        assert_eq!(record.score_type(), "raw_trim");
        assert_eq!(
            record.intermediate_path("eval_short"),
            PathBuf::from("/exp/output/exp_eval_short.tsv")
        );

        record.use_scaled_predictions = true;
        assert_eq!(record.score_type(), "scale_trim");

        record.config.insert("trim_min".to_string(), Value::from(1));
        record.config.insert("model".to_string(), Value::from("LinearRegression"));
        assert_eq!(record.config_value("trim_min"), "1");
        assert_eq!(record.config_value("model"), "LinearRegression");
        assert_eq!(record.config_value("trim_max"), "");
    }
}
