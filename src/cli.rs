//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// rsmsummarize - compare several rsmtool and rsmeval experiments
///
/// Reads the outputs of prior experiments, writes comparison tables, and
/// renders them as an HTML report and a Jupyter notebook.
///
/// Examples:
///   rsmsummarize summary.json
///   rsmsummarize summary.json ./summary_output
///   rsmsummarize summary.json ./summary_output --force
///   rsmsummarize --init-config > summary.json
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Summary configuration file (JSON)
    #[arg(value_name = "CONFIG_FILE", required_unless_present = "init_config")]
    pub config_file: Option<PathBuf>,

    /// Directory to write the report, output, and figure directories into
    ///
    /// Defaults to the current directory.
    #[arg(value_name = "OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Overwrite the contents of an existing output directory
    #[arg(short, long)]
    pub force: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Print an example summary configuration and exit
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref output_dir) = self.output_dir {
            if output_dir.exists() && !output_dir.is_dir() {
                return Err(format!(
                    "Output path is not a directory: {}",
                    output_dir.display()
                ));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// The output directory, falling back to the current directory.
    pub fn resolve_output_dir(&self) -> std::io::Result<PathBuf> {
        match self.output_dir {
            Some(ref dir) => Ok(dir.clone()),
            None => std::env::current_dir(),
        }
    }
}
