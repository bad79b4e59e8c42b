//! rsmsummarize - summarize several rsmtool and rsmeval experiments
//!
//! Reads the outputs of prior experiments, writes side-by-side comparison
//! tables, and renders them as an HTML report and a Jupyter notebook.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Any fatal error (configuration, missing experiment files, etc.)

mod analysis;
mod cli;
mod config;
mod error;
mod experiment;
mod models;
mod report;
mod table;
mod workspace;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::Args;
use config::SummaryConfig;
use experiment::ExperimentReader;
use models::{ReportMetadata, SummaryReport};
use report::ReportFiles;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info};
use tracing_subscriber::FmtSubscriber;
use workspace::Workspace;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        handle_init_config();
        return Ok(());
    }

    init_logging(&args);

    info!("rsmsummarize v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(&args) {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Summary failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: print a template configuration.
fn handle_init_config() {
    println!("{}", SummaryConfig::template());
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the summary described by the command line and print the outcome.
fn run(args: &Args) -> Result<()> {
    let start_time = Instant::now();

    let config_file = args
        .config_file
        .as_deref()
        .context("A configuration file is required")?;
    let output_dir = args
        .resolve_output_dir()
        .context("Failed to determine the output directory")?;

    if !args.quiet {
        println!("📋 Reading configuration: {}", config_file.display());
    }

    let outcome = run_summary(config_file, &output_dir, args.force, !args.quiet)?;

    if !args.quiet {
        println!("\n📊 Summary:");
        println!("   Experiments: {}", outcome.experiment_count);
        println!("   Tables: {}", outcome.table_count);
        println!("   Output: {}", outcome.workspace.output_dir().display());
        println!("   Figures: {}", outcome.workspace.figure_dir().display());
        println!("   Duration: {:.1}s", start_time.elapsed().as_secs_f64());
        println!("\n✅ Report saved to: {}", outcome.report.html.display());
        println!("   Notebook: {}", outcome.report.notebook.display());
    }

    Ok(())
}

/// What a successful run produced.
#[derive(Debug)]
struct SummaryOutcome {
    workspace: Workspace,
    report: ReportFiles,
    experiment_count: usize,
    table_count: usize,
}

/// Run the complete summary workflow.
///
/// Every experiment is read and aggregated before the output directory is
/// touched, so a failing run leaves existing output in place.
fn run_summary(
    config_file: &Path,
    output_dir: &Path,
    force: bool,
    show_progress: bool,
) -> Result<SummaryOutcome> {
    let config = SummaryConfig::load(config_file)
        .with_context(|| format!("Invalid configuration file {}", config_file.display()))?;

    let sections = report::resolve_sections(&config)?;

    info!(
        "Reading {} experiment directories",
        config.experiment_dirs.len()
    );
    let experiments = ExperimentReader::new(&config, show_progress).read_all()?;

    let tables = analysis::aggregate(&experiments, &config.subgroups)?;

    let inputs: Vec<PathBuf> = experiments.iter().map(|e| e.output_dir.clone()).collect();
    let workspace = Workspace::prepare(output_dir, force, &inputs)?;
    let saved_config = config.save(workspace.root())?;

    let mut intermediate_files = Vec::with_capacity(tables.len() + 1);
    for table in &tables {
        intermediate_files.push(workspace.write_table(&config.summary_id, table, config.file_format)?);
    }
    intermediate_files.push(relative_to(&saved_config, workspace.root()));

    let report = SummaryReport {
        metadata: ReportMetadata {
            summary_id: config.summary_id.clone(),
            description: config.description.clone(),
            generated_at: Utc::now(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            experiment_count: experiments.len(),
            file_format: config.file_format,
        },
        tables,
        sections,
        intermediate_files,
    };

    let files = report::write_report(&report, &workspace.report_dir())
        .with_context(|| format!("Failed to write report to {}", workspace.report_dir().display()))?;

    Ok(SummaryOutcome {
        workspace,
        report: files,
        experiment_count: report.metadata.experiment_count,
        table_count: report.tables.len(),
    })
}

fn relative_to(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .map(PathBuf::from)
        .unwrap_or_else(|_| path.to_path_buf())
        .to_string_lossy()
        .replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    fn write_rsmtool_experiment(root: &Path, dir: &str, id: &str) {
        let output = root.join(dir).join("output");
        std::fs::create_dir_all(&output).unwrap();
        std::fs::write(
            output.join(format!("{}_rsmtool.json", id)),
            json!({"experiment_id": id, "model": "LinearRegression"}).to_string(),
        )
        .unwrap();
        std::fs::write(
            output.join(format!("{}_eval_short.csv", id)),
            ",N,corr,QWK\nraw_trim,100,0.71,0.65\nscale_trim,100,0.72,0.66\n",
        )
        .unwrap();
        std::fs::write(
            output.join(format!("{}_betas.csv", id)),
            "feature,coefficient,standardized\nGRAMMAR,0.3,0.45\nVOCAB,0.2,0.31\n",
        )
        .unwrap();
        std::fs::write(
            output.join(format!("{}_eval_by_L1.csv", id)),
            "L1,N,corr\nES,40,0.7\nZH,60,0.73\n",
        )
        .unwrap();
    }

    fn write_rsmeval_experiment(root: &Path, dir: &str, id: &str) {
        let output = root.join(dir).join("output");
        std::fs::create_dir_all(&output).unwrap();
        std::fs::write(
            output.join(format!("{}_rsmeval.json", id)),
            json!({"experiment_id": id, "scale_with": null, "trim_min": 1, "trim_max": 6})
                .to_string(),
        )
        .unwrap();
        std::fs::write(
            output.join(format!("{}_eval_short.csv", id)),
            ",N,corr,QWK\nraw_trim,100,0.68,0.61\n",
        )
        .unwrap();
    }

    fn write_config(root: &Path) -> PathBuf {
        let path = root.join("summary.json");
        std::fs::write(
            &path,
            "{\n  // two experiments\n  \"summary_id\": \"comparison\",\n  \
             \"experiment_dirs\": [\"lr\", \"ext\"],\n  \"subgroups\": \"L1\"\n}\n",
        )
        .unwrap();
        path
    }

    #[test]
    fn test_run_summary_end_to_end() {
        let temp_dir = TempDir::new().unwrap();
        write_rsmtool_experiment(temp_dir.path(), "lr", "lr");
        write_rsmeval_experiment(temp_dir.path(), "ext", "ext");
        let config = write_config(temp_dir.path());
        let out = temp_dir.path().join("summary");

        let outcome = run_summary(&config, &out, false, false).unwrap();
        assert_eq!(outcome.experiment_count, 2);

        assert!(out.join("report/comparison_report.html").is_file());
        assert!(out.join("report/comparison_report.ipynb").is_file());
        assert!(out.join("figure").is_dir());
        assert_eq!(std::fs::read_dir(out.join("figure")).unwrap().count(), 0);

        let eval = std::fs::read_to_string(out.join("output/comparison_eval_short.csv")).unwrap();
        let lines: Vec<&str> = eval.lines().collect();
        assert_eq!(lines[0], "experiment,N,corr,QWK");
        assert_eq!(lines[1], "lr,100,0.71,0.65");
        assert_eq!(lines[2], "ext,100,0.68,0.61");

        let betas = std::fs::read_to_string(out.join("output/comparison_betas.csv")).unwrap();
        assert!(betas.starts_with("feature,lr\nGRAMMAR,0.45\n"));
        assert!(out.join("output/comparison_eval_by_L1.csv").is_file());

        let saved: Value = serde_json::from_str(
            &std::fs::read_to_string(out.join("output/comparison_rsmsummarize.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(saved["file_format"], "csv");
        assert_eq!(saved["general_sections"], json!(["all"]));
        assert_eq!(saved["subgroups"], json!(["L1"]));

        let html = std::fs::read_to_string(&outcome.report.html).unwrap();
        assert!(html.contains("Subgroup Evaluation"));
        assert!(html.contains("output/comparison_rsmsummarize.json"));
    }

    #[test]
    fn test_existing_output_requires_force() {
        let temp_dir = TempDir::new().unwrap();
        write_rsmtool_experiment(temp_dir.path(), "lr", "lr");
        write_rsmeval_experiment(temp_dir.path(), "ext", "ext");
        let config = write_config(temp_dir.path());
        let out = temp_dir.path().join("summary");

        run_summary(&config, &out, false, false).unwrap();
        let marker = out.join("output/keep_me.txt");
        std::fs::write(&marker, "old").unwrap();

        assert!(run_summary(&config, &out, false, false).is_err());
        assert!(marker.is_file());

        run_summary(&config, &out, true, false).unwrap();
        assert!(!marker.exists());
        assert!(out.join("report/comparison_report.html").is_file());
    }

    #[test]
    fn test_failed_read_leaves_output_untouched() {
        let temp_dir = TempDir::new().unwrap();
        write_rsmtool_experiment(temp_dir.path(), "lr", "lr");
        let config = write_config(temp_dir.path());
        let out = temp_dir.path().join("summary");
        std::fs::create_dir_all(out.join("report")).unwrap();
        std::fs::write(out.join("report/old.html"), "old").unwrap();

        let err = run_summary(&config, &out, true, false).unwrap_err();
        assert!(format!("{:#}", err).contains("ext"));
        assert!(out.join("report/old.html").is_file());
    }

    #[test]
    fn test_force_keeps_experiment_files_when_writing_into_experiment() {
        let temp_dir = TempDir::new().unwrap();
        write_rsmtool_experiment(temp_dir.path(), "lr", "lr");
        write_rsmeval_experiment(temp_dir.path(), "ext", "ext");
        let experiment_output = temp_dir.path().join("lr/output");
        std::fs::write(experiment_output.join("lr_pred_processed.csv"), "id,pred\n1,3\n").unwrap();
        let config = write_config(temp_dir.path());

        let err = run_summary(&config, &temp_dir.path().join("lr"), true, false).unwrap_err();
        assert!(format!("{:#}", err).contains("Refusing to write"));
        for file in ["lr_rsmtool.json", "lr_eval_short.csv", "lr_pred_processed.csv"] {
            assert!(experiment_output.join(file).is_file(), "{} was removed", file);
        }
        assert!(!experiment_output.join("comparison_rsmsummarize.json").exists());
    }

    #[test]
    fn test_relative_to() {
        assert_eq!(
            relative_to(Path::new("/out/output/a.json"), Path::new("/out")),
            "output/a.json"
        );
    }
}
