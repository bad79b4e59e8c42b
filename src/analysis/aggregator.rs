//! Experiment aggregation.
//!
//! This module merges the intermediate tables of several experiments into
//! comparison tables. Experiments always appear in the order they were
//! listed in the summary configuration.

use crate::error::SummaryResult;
use crate::experiment::{BETAS, EVAL_BY_PREFIX, EVAL_SHORT, MODEL_FIT};
use crate::models::{ComparisonTable, ExperimentRecord, SummaryTable, Tool};
use crate::table::Table;
use indexmap::IndexSet;
use tracing::{debug, info, warn};

/// Build every summary table from the loaded experiments.
pub fn aggregate(
    experiments: &[ExperimentRecord],
    subgroups: &[String],
) -> SummaryResult<Vec<SummaryTable>> {
    let mut tables = vec![SummaryTable::new(
        "experiments",
        "Experiments",
        experiment_info(experiments),
    )];

    let evaluations = compare_evaluations(experiments)?;
    tables.push(SummaryTable::new(
        EVAL_SHORT,
        "Evaluation results",
        evaluations.by_experiment("experiment"),
    ));

    if let Some(model_fit) = compare_model_fit(experiments)? {
        debug!(
            "Model fit available for {} experiments",
            model_fit.experiments().len()
        );
        tables.push(SummaryTable::new(
            MODEL_FIT,
            "Model fit",
            model_fit.by_experiment("experiment"),
        ));
    }

    if let Some(betas) = compare_coefficients(experiments)? {
        debug!(
            "{} features across {} experiments",
            betas.metrics().count(),
            betas.experiments().len()
        );
        tables.push(SummaryTable::new(
            BETAS,
            "Standardized coefficients",
            betas.by_metric("feature"),
        ));
    }

    for subgroup in subgroups {
        if let Some(table) = compare_subgroup(experiments, subgroup)? {
            tables.push(SummaryTable::new(
                format!("{}{}", EVAL_BY_PREFIX, subgroup),
                format!("Evaluation by {}", subgroup),
                table,
            ));
        }
    }

    info!("Aggregated {} summary tables", tables.len());
    Ok(tables)
}

/// One row of descriptive information per experiment.
pub fn experiment_info(experiments: &[ExperimentRecord]) -> Table {
    let headers = [
        "experiment_id",
        "name",
        "tool",
        "model",
        "description",
        "use_scaled_predictions",
        "trim_min",
        "trim_max",
        "directory",
    ];
    let mut table = Table::new(headers.iter().map(|h| h.to_string()).collect());

    for experiment in experiments {
        table.push_row(vec![
            experiment.id.clone(),
            experiment.name.clone(),
            experiment.tool.to_string(),
            experiment.model.clone().unwrap_or_default(),
            experiment.description.clone(),
            experiment.use_scaled_predictions.to_string(),
            experiment.config_value("trim_min"),
            experiment.config_value("trim_max"),
            experiment.dir.display().to_string(),
        ]);
    }

    table
}

/// Compare the headline evaluation metrics of every experiment.
///
/// Each experiment contributes the `eval_short` row for its score type,
/// or the first row when that score type is absent.
pub fn compare_evaluations(experiments: &[ExperimentRecord]) -> SummaryResult<ComparisonTable> {
    let mut comparison = ComparisonTable::new();

    for experiment in experiments {
        comparison.add_experiment(&experiment.id);

        let table = Table::read(
            &experiment.intermediate_path(EVAL_SHORT),
            experiment.file_format,
        )?;
        let row = table
            .row_by_key(experiment.score_type())
            .or_else(|| table.rows.first().map(Vec::as_slice));

        match row {
            Some(row) => {
                debug!(
                    "Using '{}' evaluations for {}",
                    row.first().map(String::as_str).unwrap_or_default(),
                    experiment.id
                );
                insert_row(&mut comparison, &experiment.id, &table.headers, row, 1);
            }
            None => warn!("Evaluation table for {} has no rows", experiment.id),
        }
    }

    Ok(comparison)
}

/// Compare model-fit statistics of the rsmtool experiments.
pub fn compare_model_fit(
    experiments: &[ExperimentRecord],
) -> SummaryResult<Option<ComparisonTable>> {
    let mut comparison = ComparisonTable::new();

    for experiment in trained(experiments) {
        let Some(table) = read_optional(experiment, MODEL_FIT)? else {
            continue;
        };
        comparison.add_experiment(&experiment.id);

        if let Some(row) = table.rows.first() {
            let start = usize::from(table.headers.first().is_some_and(|h| h.is_empty()));
            insert_row(&mut comparison, &experiment.id, &table.headers, row, start);
        }
    }

    Ok(non_empty(comparison))
}

/// Compare standardized feature coefficients across rsmtool experiments.
pub fn compare_coefficients(
    experiments: &[ExperimentRecord],
) -> SummaryResult<Option<ComparisonTable>> {
    let mut comparison = ComparisonTable::new();

    for experiment in trained(experiments) {
        let Some(table) = read_optional(experiment, BETAS)? else {
            continue;
        };
        comparison.add_experiment(&experiment.id);

        let feature_col = table.column_index("feature").unwrap_or(0);
        let value_col = table.column_index("standardized").unwrap_or(feature_col + 1);

        for row in &table.rows {
            if let (Some(feature), Some(value)) = (row.get(feature_col), row.get(value_col)) {
                comparison.insert(feature, &experiment.id, value);
            }
        }
    }

    Ok(non_empty(comparison))
}

/// Stack the per-group evaluations of every experiment for one subgroup.
pub fn compare_subgroup(
    experiments: &[ExperimentRecord],
    subgroup: &str,
) -> SummaryResult<Option<Table>> {
    let suffix = format!("{}{}", EVAL_BY_PREFIX, subgroup);
    let mut loaded = Vec::new();
    let mut metrics: IndexSet<String> = IndexSet::new();

    for experiment in experiments {
        if let Some(table) = read_optional(experiment, &suffix)? {
            metrics.extend(table.headers.iter().skip(1).cloned());
            loaded.push((experiment, table));
        }
    }

    if loaded.is_empty() {
        warn!("No experiment has evaluations by {}", subgroup);
        return Ok(None);
    }

    let mut headers = vec!["experiment".to_string(), subgroup.to_string()];
    headers.extend(metrics.iter().cloned());
    let mut output = Table::new(headers);

    for (experiment, table) in loaded {
        for row in &table.rows {
            let mut cells = vec![
                experiment.id.clone(),
                row.first().cloned().unwrap_or_default(),
            ];
            cells.extend(metrics.iter().map(|metric| {
                table
                    .column_index(metric)
                    .and_then(|i| row.get(i))
                    .cloned()
                    .unwrap_or_default()
            }));
            output.push_row(cells);
        }
    }

    Ok(Some(output))
}

/// Copy `headers[start..]` / `row[start..]` into the comparison.
fn insert_row(
    comparison: &mut ComparisonTable,
    experiment: &str,
    headers: &[String],
    row: &[String],
    start: usize,
) {
    for (metric, value) in headers.iter().zip(row).skip(start) {
        comparison.insert(metric, experiment, value);
    }
}

/// Read an optional intermediate table, warning when it is absent.
fn read_optional(experiment: &ExperimentRecord, suffix: &str) -> SummaryResult<Option<Table>> {
    let path = experiment.intermediate_path(suffix);
    if !path.is_file() {
        warn!(
            "Experiment {} has no {} file; skipping it for this table",
            experiment.id, suffix
        );
        return Ok(None);
    }
    Table::read(&path, experiment.file_format).map(Some)
}

fn trained(experiments: &[ExperimentRecord]) -> impl Iterator<Item = &ExperimentRecord> {
    experiments.iter().filter(|e| e.tool == Tool::Rsmtool)
}

fn non_empty(comparison: ComparisonTable) -> Option<ComparisonTable> {
    if comparison.is_empty() {
        None
    } else {
        Some(comparison)
    }
}
